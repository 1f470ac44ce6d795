use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A (provider, model id) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub id: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            id: id.into(),
        }
    }

    /// Parse `"provider/id"`; a bare id gets the given default provider.
    pub fn parse(input: &str, default_provider: &str) -> Self {
        match input.split_once('/') {
            Some((provider, id)) => Self::new(provider, id),
            None => Self::new(default_provider, input),
        }
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.id)
    }
}

/// Catalog entry for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDef {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    /// USD per million input tokens.
    pub input_cost: f64,
    /// USD per million output tokens.
    pub output_cost: f64,
    pub context_window: u32,
}

/// Known models per provider. Providers iterate in name order; models keep
/// their insertion order (newest first for each family).
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    providers: BTreeMap<String, Vec<ModelDef>>,
}

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default context window assumed for synthesized models.
pub const DEFAULT_CONTEXT_WINDOW: u32 = 200_000;

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shipped with hermod. Config can add to it at startup.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for def in [
            model("claude-opus-4-5", "Claude Opus 4.5", ANTHROPIC_BASE_URL, 5.0, 25.0),
            model("claude-sonnet-4-5", "Claude Sonnet 4.5", ANTHROPIC_BASE_URL, 3.0, 15.0),
            model("claude-haiku-4-5", "Claude Haiku 4.5", ANTHROPIC_BASE_URL, 1.0, 5.0),
        ] {
            registry.add_model("anthropic", def);
        }
        for def in [
            model("gpt-5.1", "GPT-5.1", OPENAI_BASE_URL, 1.25, 10.0),
            model("gpt-5-mini", "GPT-5 mini", OPENAI_BASE_URL, 0.25, 2.0),
            model("gpt-4o", "GPT-4o", OPENAI_BASE_URL, 2.5, 10.0),
        ] {
            registry.add_model("openai", def);
        }
        registry
    }

    pub fn add_model(&mut self, provider: &str, def: ModelDef) {
        self.providers.entry(provider.to_string()).or_default().push(def);
    }

    /// Provider names, sorted.
    pub fn providers(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Models for one provider (case-insensitive), empty when unknown.
    pub fn models(&self, provider: &str) -> &[ModelDef] {
        self.provider_key(provider)
            .and_then(|k| self.providers.get(k))
            .map_or(&[], Vec::as_slice)
    }

    /// Exact model lookup, case-insensitive on both parts.
    pub fn find(&self, provider: &str, id: &str) -> Option<&ModelDef> {
        self.models(provider)
            .iter()
            .find(|m| m.id.eq_ignore_ascii_case(id))
    }

    pub fn has_provider(&self, provider: &str) -> bool {
        self.provider_key(provider).is_some()
    }

    /// All (provider, model) pairs in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelDef)> {
        self.providers
            .iter()
            .flat_map(|(p, models)| models.iter().map(move |m| (p.as_str(), m)))
    }

    fn provider_key(&self, provider: &str) -> Option<&String> {
        self.providers
            .keys()
            .find(|k| k.eq_ignore_ascii_case(provider))
    }
}

fn model(id: &str, name: &str, base_url: &str, input_cost: f64, output_cost: f64) -> ModelDef {
    ModelDef {
        id: id.into(),
        display_name: name.into(),
        base_url: base_url.into(),
        input_cost,
        output_cost,
        context_window: DEFAULT_CONTEXT_WINDOW,
    }
}
