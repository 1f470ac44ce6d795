//! Config schema types (agents, defaults, broadcast groups, session store).

use std::{collections::HashMap, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HermodConfig {
    /// Configured agents, in priority order. The first entry is the
    /// primary agent used when no broadcast group matches.
    pub agents: Vec<AgentConfig>,
    pub defaults: DefaultsConfig,
    /// Broadcast groups keyed by peer address (e.g. "+1000").
    pub broadcast: HashMap<String, BroadcastGroup>,
    pub session: SessionConfig,
}

/// Configuration for a single agent backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub id: String,
    /// Default model for this agent ("provider/id", catalog id, or alias).
    pub default_model: Option<String>,
    /// Friendly model aliases, matched case-insensitively
    /// (e.g. `opus = "anthropic/claude-opus-4-5"`).
    pub model_aliases: HashMap<String, String>,
    /// Default elevated level when a session has no explicit override
    /// ("on", "off", "ask", "full").
    pub elevated_default: Option<String>,
    pub exec: ExecDefaultsConfig,
}

/// Default exec settings applied when a session has no `/exec` overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecDefaultsConfig {
    /// Where commands run: "sandbox", "gateway", or "node".
    pub host: Option<String>,
    /// Security posture: "deny", "allowlist", or "full".
    pub security: Option<String>,
    /// Approval mode: "off", "on-miss", or "always".
    pub ask: Option<String>,
    /// Target node id when `host = "node"`.
    pub node: Option<String>,
}

/// Global model defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Global default model ("provider/id", catalog id, or alias).
    pub model: Option<String>,
    /// Provider assumed when a model reference carries no provider.
    pub provider: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider: "anthropic".into(),
        }
    }
}

/// Fan-out strategy for a broadcast group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStrategy {
    /// Invoke targets one at a time, in configured order.
    #[default]
    Sequential,
    /// Invoke all targets concurrently.
    Parallel,
}

/// One peer address fanned out to multiple agents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastGroup {
    /// Target agent ids, in delivery order.
    pub agents: Vec<String>,
    pub strategy: BroadcastStrategy,
}

/// What to do with an event that arrives while a run is in flight for the
/// same session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupersedeMode {
    /// Wait for the in-flight run to finish, then proceed.
    #[default]
    Queue,
    /// Report the session as busy without invoking.
    Abort,
}

/// Session store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base data directory. Defaults to `~/.local/share/hermod`.
    pub store_dir: Option<PathBuf>,
    pub supersede: SupersedeMode,
}

impl HermodConfig {
    /// Ordered agent-id list, resolved once at startup.
    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.id.clone()).collect()
    }

    /// The primary agent id (first configured), or "main" when none is.
    pub fn primary_agent(&self) -> String {
        self.agents
            .first()
            .map_or_else(|| "main".to_string(), |a| a.id.clone())
    }

    /// Look up an agent's config by id.
    pub fn agent(&self, id: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Session store file for one agent.
    pub fn store_path(&self, agent_id: &str) -> PathBuf {
        self.store_base_dir()
            .join("agents")
            .join(agent_id)
            .join("sessions.json")
    }

    /// Base data directory for session stores.
    pub fn store_base_dir(&self) -> PathBuf {
        if let Some(dir) = &self.session.store_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "hermod")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_toml() {
        let cfg: HermodConfig = toml::from_str(
            r#"
            [[agents]]
            id = "alfred"
            default_model = "anthropic/claude-opus-4-5"

            [agents.model_aliases]
            opus = "anthropic/claude-opus-4-5"

            [[agents]]
            id = "baerbel"

            [broadcast."+1000"]
            agents = ["alfred", "baerbel"]
            strategy = "parallel"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.agent_ids(), vec!["alfred", "baerbel"]);
        assert_eq!(cfg.primary_agent(), "alfred");
        let group = &cfg.broadcast["+1000"];
        assert_eq!(group.strategy, BroadcastStrategy::Parallel);
        assert_eq!(group.agents, vec!["alfred", "baerbel"]);
    }

    #[test]
    fn defaults_when_empty() {
        let cfg = HermodConfig::default();
        assert_eq!(cfg.primary_agent(), "main");
        assert_eq!(cfg.defaults.provider, "anthropic");
        assert_eq!(cfg.session.supersede, SupersedeMode::Queue);
    }

    #[test]
    fn store_path_is_per_agent() {
        let cfg: HermodConfig = toml::from_str(
            r#"
            [session]
            store_dir = "/tmp/hermod-test"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.store_path("alfred"),
            PathBuf::from("/tmp/hermod-test/agents/alfred/sessions.json")
        );
    }
}
