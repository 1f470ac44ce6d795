//! Session state and persistence.
//!
//! Each agent owns one JSON document at
//! `<data>/agents/<agentId>/sessions.json`, an object keyed by session key
//! with [`SessionEntry`] values. Writes go through a file lock so concurrent
//! sessions on the same agent cannot corrupt the document.

pub mod entry;
pub mod error;
pub mod key;
pub mod store;
pub mod system_events;

pub use {
    entry::{ElevatedLevel, ExecDefaults, GroupActivation, ReasoningLevel, SessionEntry,
            VerboseLevel},
    error::{Error, Result},
    key::SessionKey,
    store::SessionStore,
    system_events::SystemEventQueue,
};
