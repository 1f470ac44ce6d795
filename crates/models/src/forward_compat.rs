//! Synthesize a usable model definition for an id the shipped catalog does
//! not know yet, so a freshly released "next version" works before a
//! catalog update lands.

use crate::catalog::{
    ANTHROPIC_BASE_URL, DEFAULT_CONTEXT_WINDOW, ModelDef, ModelRegistry, OPENAI_BASE_URL,
};

/// One known "next version" per model family.
///
/// `id` matches exactly (case-insensitive) or as an `id-` prefix for dated
/// or suffixed variants (`claude-opus-4-6-20260115`). `templates` are the
/// documented predecessor ids to clone, tried in order.
struct ForwardCompatRule {
    provider: &'static str,
    id: &'static str,
    templates: &'static [&'static str],
    fallback_base_url: &'static str,
}

const RULES: &[ForwardCompatRule] = &[
    ForwardCompatRule {
        provider: "anthropic",
        id: "claude-opus-4-6",
        templates: &["claude-opus-4-5"],
        fallback_base_url: ANTHROPIC_BASE_URL,
    },
    ForwardCompatRule {
        provider: "anthropic",
        id: "claude-sonnet-4-6",
        templates: &["claude-sonnet-4-5", "claude-opus-4-5"],
        fallback_base_url: ANTHROPIC_BASE_URL,
    },
    ForwardCompatRule {
        provider: "anthropic",
        id: "claude-haiku-4-6",
        templates: &["claude-haiku-4-5", "claude-sonnet-4-5"],
        fallback_base_url: ANTHROPIC_BASE_URL,
    },
    ForwardCompatRule {
        provider: "openai",
        id: "gpt-5.2",
        templates: &["gpt-5.1", "gpt-5"],
        fallback_base_url: OPENAI_BASE_URL,
    },
];

/// Synthesize a definition for `model_id` under `provider`, or `None` when
/// the id matches no known next-version pattern.
///
/// Deterministic and side-effect free; the registry is never mutated.
pub fn resolve_forward_compat_model(
    provider: &str,
    model_id: &str,
    registry: &ModelRegistry,
) -> Option<ModelDef> {
    let wanted = model_id.to_lowercase();

    let rule = RULES.iter().find(|r| {
        r.provider.eq_ignore_ascii_case(provider)
            && (wanted == r.id || wanted.starts_with(&format!("{}-", r.id)))
    })?;

    // Dedupe template candidates, first occurrence wins.
    let mut candidates: Vec<&str> = Vec::with_capacity(rule.templates.len());
    for t in rule.templates {
        if !candidates.contains(t) {
            candidates.push(t);
        }
    }

    for template_id in candidates {
        if let Some(template) = registry.find(rule.provider, template_id) {
            tracing::debug!(
                provider = rule.provider,
                model = model_id,
                template = template_id,
                "synthesizing forward-compat model from template"
            );
            return Some(ModelDef {
                id: model_id.to_string(),
                display_name: model_id.to_string(),
                ..template.clone()
            });
        }
    }

    // No cataloged predecessor: hand-built default.
    tracing::debug!(
        provider = rule.provider,
        model = model_id,
        "synthesizing forward-compat model without template"
    );
    Some(ModelDef {
        id: model_id.to_string(),
        display_name: model_id.to_string(),
        base_url: rule.fallback_base_url.to_string(),
        input_cost: 0.0,
        output_cost: 0.0,
        context_window: DEFAULT_CONTEXT_WINDOW,
    })
}
