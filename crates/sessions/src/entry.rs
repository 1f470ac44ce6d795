use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Elevated-permissions level for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevatedLevel {
    On,
    Off,
    Ask,
    Full,
}

impl ElevatedLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "ask" => Some(Self::Ask),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Ask => "ask",
            Self::Full => "full",
        }
    }
}

/// Reasoning-visibility level for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningLevel {
    On,
    Off,
    Stream,
}

impl ReasoningLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            "stream" => Some(Self::Stream),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Stream => "stream",
        }
    }
}

/// Verbose-output level for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerboseLevel {
    On,
    Full,
    Off,
}

impl VerboseLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Some(Self::On),
            "full" => Some(Self::Full),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Full => "full",
            Self::Off => "off",
        }
    }
}

/// Group reply activation for a group-scoped session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupActivation {
    /// Reply only when @mentioned; other messages accumulate as backlog.
    #[default]
    Mention,
    /// Reply to every message.
    Always,
}

/// Per-session exec overrides set via `/exec`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl ExecDefaults {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted record of one conversation's state and overrides.
///
/// Override fields (`model_override`, `provider_override`, the level fields)
/// are authoritative; the `last_*` fields are display metadata from the most
/// recent turn and never participate in resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionEntry {
    pub session_id: String,
    /// Last update, unix milliseconds.
    pub updated_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_to: Option<String>,
    /// Model used on the last turn (display only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_profile_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevated_level: Option<ElevatedLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_level: Option<ReasoningLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_level: Option<VerboseLevel>,
    #[serde(skip_serializing_if = "ExecDefaults::is_empty")]
    pub exec_defaults: ExecDefaults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_activation: Option<GroupActivation>,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl Default for SessionEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEntry {
    /// Fresh entry with a generated session id.
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            updated_at: now_ms(),
            last_channel: None,
            last_provider: None,
            last_to: None,
            last_model: None,
            model_override: None,
            provider_override: None,
            auth_profile_override: None,
            elevated_level: None,
            reasoning_level: None,
            verbose_level: None,
            exec_defaults: ExecDefaults::default(),
            group_activation: None,
        }
    }

    /// Bump the update timestamp after an override mutation.
    pub fn mark_updated(&mut self) {
        self.updated_at = now_ms();
    }

    /// Refresh the display fields after a routed turn. Override fields are
    /// untouched.
    pub fn touch(&mut self, channel: &str, to: &str, provider: &str, model: &str) {
        self.last_channel = Some(channel.to_string());
        self.last_to = Some(to.to_string());
        self.last_provider = Some(provider.to_string());
        self.last_model = Some(model.to_string());
        self.updated_at = now_ms();
    }
}
