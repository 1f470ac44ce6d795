use serde::{Deserialize, Serialize};

/// Canonical id for one agent+channel+peer conversation:
/// `agent:<agentId>:<scope>` where scope is typically `<channel>:<peer>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Build a key for an agent and a raw scope string.
    pub fn for_agent(agent_id: &str, scope: &str) -> Self {
        Self(format!("agent:{agent_id}:{scope}"))
    }

    /// Build a key for an agent, channel, and peer address.
    pub fn for_peer(agent_id: &str, channel: &str, peer: &str) -> Self {
        Self::for_agent(agent_id, &format!("{channel}:{peer}"))
    }

    /// The agent id embedded in the key, when it follows the
    /// `agent:<id>:<scope>` shape.
    pub fn agent_id(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("agent:")?;
        let (id, _) = rest.split_once(':')?;
        Some(id)
    }

    /// The scope portion after the agent id.
    pub fn scope(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("agent:")?;
        rest.split_once(':').map(|(_, scope)| scope)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
