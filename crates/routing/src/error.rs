use hermod_sessions::SessionKey;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sessions(#[from] hermod_sessions::Error),

    #[error(transparent)]
    Models(#[from] hermod_models::Error),

    /// A turn is already in flight for this session and the supersede
    /// policy is `abort`.
    #[error("session {0} is busy")]
    SessionBusy(SessionKey),

    #[error("agent invocation failed: {0}")]
    Invocation(anyhow::Error),
}
