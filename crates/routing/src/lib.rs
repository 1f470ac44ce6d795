//! Session routing and dispatch.
//!
//! Ties the other crates together: resolves which persisted session an
//! inbound event belongs to, applies in-band directives, picks the effective
//! model, and fans the event out to one or more agents with per-session
//! locking and shared group-history semantics.

pub mod dispatcher;
pub mod error;
pub mod group_history;
pub mod reply_filter;
pub mod resolver;
pub mod stores;

pub use {
    dispatcher::{AgentRunner, Dispatcher, TargetResult},
    error::{Error, Result},
    group_history::{GroupHistoryBuffer, GroupMessage},
    reply_filter::{ReplyFilter, ReplyFilterOpts, ReplyMode},
    resolver::{Resolution, ResolveRequest, resolve},
    stores::StoreManager,
};
