use std::collections::HashMap;

use crate::catalog::{ModelRef, ModelRegistry};

/// How a model reference matched, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    ExactAlias,
    ExactId,
    FuzzySubstring,
}

/// Resolve user input to a model reference.
///
/// Candidates are ranked: exact alias (case-insensitive) beats an exact
/// catalog id, which beats a fuzzy substring hit across `provider/id`
/// strings. Ties within a rank resolve to the first candidate in registry
/// order, so an exact alias always wins over any substring hit.
pub fn resolve_model_ref(
    input: &str,
    aliases: &HashMap<String, String>,
    registry: &ModelRegistry,
    default_provider: &str,
) -> Option<(ModelRef, MatchKind)> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    // Exact alias.
    if let Some(target) = aliases
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(input))
        .map(|(_, target)| target)
    {
        return Some((
            ModelRef::parse(target, default_provider),
            MatchKind::ExactAlias,
        ));
    }

    // Exact catalog id, with or without a provider prefix.
    if let Some((provider, id)) = input.split_once('/') {
        if let Some(def) = registry.find(provider, id) {
            let provider = canonical_provider(registry, provider);
            return Some((ModelRef::new(provider, def.id.clone()), MatchKind::ExactId));
        }
    } else {
        for (provider, def) in registry.iter() {
            if def.id.eq_ignore_ascii_case(input) {
                return Some((ModelRef::new(provider, def.id.clone()), MatchKind::ExactId));
            }
        }
    }

    // Fuzzy substring over "provider/id". First registry hit wins.
    let needle = input.to_lowercase();
    for (provider, def) in registry.iter() {
        let haystack = format!("{provider}/{}", def.id).to_lowercase();
        if haystack.contains(&needle) {
            return Some((
                ModelRef::new(provider, def.id.clone()),
                MatchKind::FuzzySubstring,
            ));
        }
    }

    None
}

fn canonical_provider(registry: &ModelRegistry, provider: &str) -> String {
    registry
        .providers()
        .into_iter()
        .find(|p| p.eq_ignore_ascii_case(provider))
        .map_or_else(|| provider.to_string(), str::to_string)
}
