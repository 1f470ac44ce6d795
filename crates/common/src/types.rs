use serde::{Deserialize, Serialize};

/// Whether an inbound message arrived in a direct or group conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    #[default]
    Direct,
    Group,
}

/// Inbound chat event produced by a channel adapter.
///
/// Field names are camelCase on the wire; the legacy PascalCase names used
/// by older adapters are accepted as aliases on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InboundEvent {
    /// Message text.
    #[serde(alias = "Body")]
    pub body: String,
    /// Sender/peer address (e.g. "+1000", a Discord user id).
    #[serde(alias = "From")]
    pub from: String,
    /// Receiving address (the bot's own number/handle on this channel).
    #[serde(alias = "To")]
    pub to: String,
    /// Channel provider name (e.g. "whatsapp", "telegram", "signal").
    #[serde(alias = "Provider")]
    pub provider: String,
    /// Explicit session key, when the adapter already knows it.
    #[serde(alias = "SessionKey", skip_serializing_if = "Option::is_none")]
    pub session_key: Option<String>,
    /// Session id hint for locating an existing session across stores.
    #[serde(alias = "SessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Whether the sender may issue control directives.
    #[serde(alias = "CommandAuthorized")]
    pub command_authorized: bool,
    /// Channel account the message arrived on.
    #[serde(alias = "AccountId", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Channel-native message id.
    #[serde(alias = "MessageSid", skip_serializing_if = "Option::is_none")]
    pub message_sid: Option<String>,
    /// Direct or group conversation.
    pub chat_type: ChatType,
    /// Whether the bot was @mentioned (only meaningful for groups).
    pub mentioned: bool,
    /// Display name of the sender, when the channel provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
}

/// A single outgoing payload for a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplyPayload {
    pub text: String,
    /// Media URL or data-URI attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// Channel message id this payload replies to (reply threading).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    /// Set when the agent explicitly asked for the reply link; the
    /// threading filter keeps these even in `off` mode.
    pub explicit_tag: bool,
}

impl ReplyPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Request handed to the agent runtime for one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentInvocation {
    pub session_key: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_override: Option<String>,
    pub is_heartbeat: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heartbeat_model_override: Option<String>,
}

/// Agent runtime response: plain text, or one or more channel payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub payloads: Vec<ReplyPayload>,
}

impl AgentReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            payloads: vec![],
        }
    }

    /// All payloads for delivery; a bare `text` reply becomes one payload.
    #[must_use]
    pub fn into_payloads(self) -> Vec<ReplyPayload> {
        if self.payloads.is_empty() {
            match self.text {
                Some(t) => vec![ReplyPayload::text(t)],
                None => vec![],
            }
        } else {
            self.payloads
        }
    }
}
