use std::collections::HashMap;

use crate::{
    alias::resolve_model_ref,
    catalog::{ModelRef, ModelRegistry},
    error::{Error, Result},
    forward_compat::resolve_forward_compat_model,
};

/// Effective (provider, model) for one turn. Not persisted; the session
/// override fields that produced it are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub provider: String,
    pub model: String,
}

/// Inputs to per-turn model resolution.
///
/// Overrides come from the session entry; the stale `last_provider` /
/// `last_model` display fields must never be passed here.
#[derive(Debug, Clone, Copy)]
pub struct SelectionArgs<'a> {
    pub model_override: Option<&'a str>,
    pub provider_override: Option<&'a str>,
    pub agent_default: Option<&'a str>,
    pub global_default: Option<&'a str>,
    pub default_provider: &'a str,
    pub aliases: &'a HashMap<String, String>,
}

/// Resolve the effective model for a turn.
///
/// Precedence, highest first:
/// 1. session `model_override` (+ `provider_override`, else the default
///    provider) — verified against the catalog, then forward-compat;
///    an override that resolves nowhere is a hard error, it never falls
///    back to a default;
/// 2. agent-level default model;
/// 3. global default model.
///
/// Defaults go through the same alias/catalog/forward-compat chain.
pub fn resolve_selection(args: SelectionArgs<'_>, registry: &ModelRegistry) -> Result<ModelSelection> {
    if let Some(model) = args.model_override {
        let provider = args.provider_override.unwrap_or(args.default_provider);
        return verify(ModelRef::new(provider, model), registry);
    }

    let default_ref = args
        .agent_default
        .or(args.global_default)
        .ok_or(Error::NoDefaultModel)?;

    let reference = match resolve_model_ref(default_ref, args.aliases, registry, args.default_provider)
    {
        Some((r, _)) => r,
        None => ModelRef::parse(default_ref, args.default_provider),
    };
    verify(reference, registry)
}

fn verify(reference: ModelRef, registry: &ModelRegistry) -> Result<ModelSelection> {
    if let Some(def) = registry.find(&reference.provider, &reference.id) {
        return Ok(ModelSelection {
            provider: reference.provider,
            model: def.id.clone(),
        });
    }
    if let Some(def) = resolve_forward_compat_model(&reference.provider, &reference.id, registry) {
        tracing::debug!(model = %reference, "using forward-compat model definition");
        return Ok(ModelSelection {
            provider: reference.provider,
            model: def.id,
        });
    }
    Err(Error::UnresolvedModel {
        provider: reference.provider,
        model: reference.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_aliases() -> HashMap<String, String> {
        HashMap::new()
    }

    fn args<'a>(aliases: &'a HashMap<String, String>) -> SelectionArgs<'a> {
        SelectionArgs {
            model_override: None,
            provider_override: None,
            agent_default: None,
            global_default: None,
            default_provider: "anthropic",
            aliases,
        }
    }

    #[test]
    fn override_pair_wins() {
        let registry = ModelRegistry::builtin();
        let aliases = no_aliases();
        let selection = resolve_selection(
            SelectionArgs {
                model_override: Some("gpt-5-mini"),
                provider_override: Some("openai"),
                agent_default: Some("anthropic/claude-opus-4-5"),
                global_default: Some("anthropic/claude-haiku-4-5"),
                ..args(&aliases)
            },
            &registry,
        )
        .unwrap();
        assert_eq!(selection.provider, "openai");
        assert_eq!(selection.model, "gpt-5-mini");
    }

    #[test]
    fn override_without_provider_uses_default_provider() {
        let registry = ModelRegistry::builtin();
        let aliases = no_aliases();
        let selection = resolve_selection(
            SelectionArgs {
                model_override: Some("claude-sonnet-4-5"),
                ..args(&aliases)
            },
            &registry,
        )
        .unwrap();
        assert_eq!(selection.provider, "anthropic");
    }

    #[test]
    fn agent_default_beats_global_default() {
        let registry = ModelRegistry::builtin();
        let aliases = no_aliases();
        let selection = resolve_selection(
            SelectionArgs {
                agent_default: Some("openai/gpt-4o"),
                global_default: Some("anthropic/claude-haiku-4-5"),
                ..args(&aliases)
            },
            &registry,
        )
        .unwrap();
        assert_eq!(selection.model, "gpt-4o");
    }

    #[test]
    fn default_resolves_through_aliases() {
        let registry = ModelRegistry::builtin();
        let aliases = HashMap::from([(
            "workhorse".to_string(),
            "anthropic/claude-sonnet-4-5".to_string(),
        )]);
        let selection = resolve_selection(
            SelectionArgs {
                agent_default: Some("workhorse"),
                ..args(&aliases)
            },
            &registry,
        )
        .unwrap();
        assert_eq!(selection.model, "claude-sonnet-4-5");
    }

    #[test]
    fn override_reaches_forward_compat() {
        let registry = ModelRegistry::builtin();
        let aliases = no_aliases();
        let selection = resolve_selection(
            SelectionArgs {
                model_override: Some("claude-opus-4-6"),
                provider_override: Some("anthropic"),
                ..args(&aliases)
            },
            &registry,
        )
        .unwrap();
        assert_eq!(selection.model, "claude-opus-4-6");
    }

    #[test]
    fn unresolvable_override_is_fatal_even_with_defaults() {
        let registry = ModelRegistry::builtin();
        let aliases = no_aliases();
        let err = resolve_selection(
            SelectionArgs {
                model_override: Some("claude-opus-9"),
                provider_override: Some("anthropic"),
                agent_default: Some("anthropic/claude-opus-4-5"),
                ..args(&aliases)
            },
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnresolvedModel { .. }));
    }

    #[test]
    fn nothing_configured_is_an_error() {
        let registry = ModelRegistry::builtin();
        let aliases = no_aliases();
        let err = resolve_selection(args(&aliases), &registry).unwrap_err();
        assert!(matches!(err, Error::NoDefaultModel));
    }
}
