//! In-band control directives (`/model`, `/elevated`, `/reasoning`, `/exec`,
//! `/verbose`, `/status`).
//!
//! Directives mutate durable session overrides and are always stripped from
//! the agent-visible prompt, valid or not. Unknown `/tokens` pass through as
//! ordinary text.

pub mod commands;
pub mod process;
pub mod types;

pub use {
    commands::{DirectiveSpec, command_table, find_directive},
    process::process_directives,
    types::{DirectiveContext, DirectiveOutcome},
};
