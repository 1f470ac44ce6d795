use std::collections::HashMap;

use {
    hermod_models::ModelRegistry,
    hermod_sessions::{ElevatedLevel, ExecDefaults},
};

/// Per-agent context a directive needs to resolve and describe state.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveContext<'a> {
    pub registry: &'a ModelRegistry,
    /// Per-agent model aliases (case-insensitive at resolution).
    pub aliases: &'a HashMap<String, String>,
    pub default_provider: &'a str,
    pub agent_default_model: Option<&'a str>,
    pub global_default_model: Option<&'a str>,
    /// Config-level elevated default shown for queries when the session has
    /// no explicit level.
    pub elevated_default: Option<ElevatedLevel>,
    /// Config-level exec defaults shown for queries.
    pub exec_config_defaults: &'a ExecDefaults,
    /// Whether the sender may issue directives at all.
    pub command_authorized: bool,
}

/// Result of processing one inbound message for directives.
#[derive(Debug, Clone, Default)]
pub struct DirectiveOutcome {
    /// Message text with all directive syntax removed.
    pub stripped_text: String,
    /// Whether the session entry was mutated and needs persisting.
    pub entry_changed: bool,
    /// Human-readable events for the session's system-event queue.
    pub system_events: Vec<String>,
    /// Text to send straight back to the channel, bypassing the agent.
    pub response: Option<String>,
}

impl DirectiveOutcome {
    /// A message that was only a directive produces a response and no
    /// agent-visible text.
    pub fn is_directive_only(&self) -> bool {
        self.stripped_text.is_empty() && self.response.is_some()
    }

    pub(crate) fn passthrough(text: &str) -> Self {
        Self {
            stripped_text: text.to_string(),
            ..Self::default()
        }
    }
}

/// What a single directive invocation did.
#[derive(Debug, Default)]
pub(crate) struct DirectiveEffect {
    pub changed: bool,
    pub events: Vec<String>,
    pub response: Option<String>,
}

impl DirectiveEffect {
    pub(crate) fn query(response: impl Into<String>) -> Self {
        Self {
            changed: false,
            events: vec![],
            response: Some(response.into()),
        }
    }

    pub(crate) fn mutation(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            changed: true,
            events: vec![message.clone()],
            response: Some(message),
        }
    }
}
