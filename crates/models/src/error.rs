use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The turn resolved to a model that exists in neither the catalog nor
    /// forward-compat synthesis. Reported to the user, never silently
    /// defaulted.
    #[error("no usable model for {provider}/{model} (not in catalog, no forward-compat match)")]
    UnresolvedModel { provider: String, model: String },

    /// No override and no agent or global default model configured.
    #[error("no model configured (no session override, agent default, or global default)")]
    NoDefaultModel,
}

pub type Result<T> = std::result::Result<T, Error>;
