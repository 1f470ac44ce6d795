//! The directive command table and per-directive handlers.
//!
//! Each directive maps to an entry with its name, a one-line description,
//! the apply handler for leading invocations, and an inline-argument
//! validator, so tests can drive the table directly.

use hermod_models::{ModelRef, SelectionArgs, resolve_forward_compat_model, resolve_model_ref,
                    resolve_selection};
use hermod_sessions::{ElevatedLevel, ReasoningLevel, SessionEntry, VerboseLevel};

use crate::types::{DirectiveContext, DirectiveEffect};

type ApplyFn = fn(&str, &mut SessionEntry, &DirectiveContext) -> DirectiveEffect;
type InlineArgsFn = fn(&[&str], &DirectiveContext) -> usize;

/// One in-band directive.
pub struct DirectiveSpec {
    pub name: &'static str,
    pub describe: &'static str,
    pub(crate) apply: ApplyFn,
    /// How many following words form a well-formed mutating invocation when
    /// the directive appears inline. Zero means "strip the token alone".
    pub(crate) inline_args: InlineArgsFn,
}

static TABLE: [DirectiveSpec; 6] = [
    DirectiveSpec {
        name: "model",
        describe: "show or switch the session model (/model [ref|alias|list|status])",
        apply: model_apply,
        inline_args: model_inline_args,
    },
    DirectiveSpec {
        name: "elevated",
        describe: "elevated permissions (/elevated [on|off|ask|full])",
        apply: elevated_apply,
        inline_args: elevated_inline_args,
    },
    DirectiveSpec {
        name: "reasoning",
        describe: "reasoning visibility (/reasoning [on|off|stream])",
        apply: reasoning_apply,
        inline_args: reasoning_inline_args,
    },
    DirectiveSpec {
        name: "exec",
        describe: "exec defaults (/exec host=.. security=.. ask=.. node=..)",
        apply: exec_apply,
        inline_args: exec_inline_args,
    },
    DirectiveSpec {
        name: "verbose",
        describe: "verbose output (/verbose [on|full|off])",
        apply: verbose_apply,
        inline_args: verbose_inline_args,
    },
    DirectiveSpec {
        name: "status",
        describe: "session status summary (/status)",
        apply: status_apply,
        inline_args: no_inline_args,
    },
];

pub fn command_table() -> &'static [DirectiveSpec] {
    &TABLE
}

/// Look up a directive by name, case-insensitive.
pub fn find_directive(name: &str) -> Option<&'static DirectiveSpec> {
    TABLE.iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

// ── /model ──────────────────────────────────────────────────────────────────

fn model_apply(arg: &str, entry: &mut SessionEntry, ctx: &DirectiveContext) -> DirectiveEffect {
    let arg = arg.trim();

    if arg.is_empty() || arg.eq_ignore_ascii_case("status") {
        return DirectiveEffect::query(current_selection_text(entry, ctx));
    }

    if arg.eq_ignore_ascii_case("list") {
        return DirectiveEffect::query(format!(
            "Providers: {}. Use /model <provider> to list models.",
            ctx.registry.providers().join(", ")
        ));
    }

    if ctx.registry.has_provider(arg) {
        let models: Vec<String> = ctx
            .registry
            .models(arg)
            .iter()
            .map(|m| format!("- {} ({})", m.id, m.display_name))
            .collect();
        return DirectiveEffect::query(format!(
            "Models for {}:\n{}",
            arg.to_lowercase(),
            models.join("\n")
        ));
    }

    match resolve_model_arg(arg, ctx) {
        Some(reference) => {
            entry.provider_override = Some(reference.provider.clone());
            entry.model_override = Some(reference.id.clone());
            entry.mark_updated();
            DirectiveEffect::mutation(format!(
                "Model switched to {arg} ({}/{}).",
                reference.provider, reference.id
            ))
        },
        None => DirectiveEffect::query(format!("No model matching '{arg}'. Try /model list.")),
    }
}

/// Resolve a `/model` argument through the alias/catalog chain, falling back
/// to a literal `provider/id` parse so a forward-compat id newer than the
/// catalog is still accepted.
fn resolve_model_arg(arg: &str, ctx: &DirectiveContext) -> Option<ModelRef> {
    let reference = match resolve_model_ref(arg, ctx.aliases, ctx.registry, ctx.default_provider) {
        Some((r, _)) => r,
        None => ModelRef::parse(arg, ctx.default_provider),
    };
    model_exists(ctx, &reference.provider, &reference.id).then_some(reference)
}

fn model_exists(ctx: &DirectiveContext, provider: &str, id: &str) -> bool {
    ctx.registry.find(provider, id).is_some()
        || resolve_forward_compat_model(provider, id, ctx.registry).is_some()
}

fn current_selection_text(entry: &SessionEntry, ctx: &DirectiveContext) -> String {
    let args = SelectionArgs {
        model_override: entry.model_override.as_deref(),
        provider_override: entry.provider_override.as_deref(),
        agent_default: ctx.agent_default_model,
        global_default: ctx.global_default_model,
        default_provider: ctx.default_provider,
        aliases: ctx.aliases,
    };
    match resolve_selection(args, ctx.registry) {
        Ok(sel) if entry.model_override.is_some() => {
            format!("Current model: {}/{} (session override)", sel.provider, sel.model)
        },
        Ok(sel) => format!("Current model: {}/{}", sel.provider, sel.model),
        Err(_) => "No model configured. Try /model list.".to_string(),
    }
}

fn model_inline_args(words: &[&str], ctx: &DirectiveContext) -> usize {
    let Some(first) = words.first() else { return 0 };
    usize::from(resolve_model_arg(first, ctx).is_some())
}

// ── /elevated ───────────────────────────────────────────────────────────────

fn elevated_apply(arg: &str, entry: &mut SessionEntry, ctx: &DirectiveContext) -> DirectiveEffect {
    let arg = arg.trim();
    if arg.is_empty() {
        let text = match entry.elevated_level {
            Some(level) => format!("Elevated: {}", level.as_str()),
            None => format!(
                "Elevated: {} (default)",
                ctx.elevated_default.map_or("off", ElevatedLevel::as_str)
            ),
        };
        return DirectiveEffect::query(text);
    }
    match ElevatedLevel::parse(arg) {
        Some(level) => {
            // Stored explicitly so "off" beats a config default of "on".
            entry.elevated_level = Some(level);
            entry.mark_updated();
            DirectiveEffect::mutation(format!("Elevated mode set to {}.", level.as_str()))
        },
        None => DirectiveEffect::query("Usage: /elevated on|off|ask|full"),
    }
}

fn elevated_inline_args(words: &[&str], _ctx: &DirectiveContext) -> usize {
    usize::from(words.first().is_some_and(|w| ElevatedLevel::parse(w).is_some()))
}

// ── /reasoning ──────────────────────────────────────────────────────────────

fn reasoning_apply(arg: &str, entry: &mut SessionEntry, _ctx: &DirectiveContext) -> DirectiveEffect {
    let arg = arg.trim();
    if arg.is_empty() {
        let text = match entry.reasoning_level {
            Some(level) => format!("Reasoning: {}", level.as_str()),
            None => "Reasoning: off (default)".to_string(),
        };
        return DirectiveEffect::query(text);
    }
    match ReasoningLevel::parse(arg) {
        Some(level) => {
            entry.reasoning_level = Some(level);
            entry.mark_updated();
            DirectiveEffect::mutation(format!("Reasoning set to {}.", level.as_str()))
        },
        None => DirectiveEffect::query("Usage: /reasoning on|off|stream"),
    }
}

fn reasoning_inline_args(words: &[&str], _ctx: &DirectiveContext) -> usize {
    usize::from(words.first().is_some_and(|w| ReasoningLevel::parse(w).is_some()))
}

// ── /exec ───────────────────────────────────────────────────────────────────

const EXEC_HOSTS: &[&str] = &["sandbox", "gateway", "node"];
const EXEC_SECURITY: &[&str] = &["deny", "allowlist", "full"];
const EXEC_ASK: &[&str] = &["off", "on-miss", "always"];

const EXEC_USAGE: &str =
    "Usage: /exec host=sandbox|gateway|node security=deny|allowlist|full ask=off|on-miss|always node=<id>";

fn exec_apply(arg: &str, entry: &mut SessionEntry, ctx: &DirectiveContext) -> DirectiveEffect {
    let arg = arg.trim();
    if arg.is_empty() {
        return DirectiveEffect::query(exec_status_text(entry, ctx));
    }

    let words: Vec<&str> = arg.split_whitespace().collect();
    let Some(pairs) = parse_exec_pairs(&words) else {
        return DirectiveEffect::query(EXEC_USAGE);
    };
    if pairs.len() != words.len() {
        // Trailing non-pair words make the invocation malformed as a whole.
        return DirectiveEffect::query(EXEC_USAGE);
    }

    let mut applied = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        match key {
            "host" => entry.exec_defaults.host = Some(value.to_string()),
            "security" => entry.exec_defaults.security = Some(value.to_string()),
            "ask" => entry.exec_defaults.ask = Some(value.to_string()),
            "node" => entry.exec_defaults.node = Some(value.to_string()),
            _ => unreachable!("validated by parse_exec_pairs"),
        }
        applied.push(format!("{key}={value}"));
    }
    entry.mark_updated();
    DirectiveEffect::mutation(format!("Exec defaults updated: {}.", applied.join(" ")))
}

/// Parse leading `key=value` words into validated pairs.
///
/// Returns `None` when any pair has an unknown key or an illegal value;
/// well-formedness is all-or-nothing so a typo never half-applies.
fn parse_exec_pairs<'a>(words: &[&'a str]) -> Option<Vec<(&'a str, &'a str)>> {
    let mut pairs = Vec::new();
    for word in words {
        let Some((key, value)) = word.split_once('=') else {
            break;
        };
        let valid = match key {
            "host" => EXEC_HOSTS.contains(&value),
            "security" => EXEC_SECURITY.contains(&value),
            "ask" => EXEC_ASK.contains(&value),
            "node" => !value.is_empty(),
            _ => false,
        };
        if !valid {
            return None;
        }
        pairs.push((key, value));
    }
    if pairs.is_empty() { None } else { Some(pairs) }
}

fn exec_status_text(entry: &SessionEntry, ctx: &DirectiveContext) -> String {
    let show = |session: &Option<String>, config: &Option<String>| -> String {
        session
            .as_deref()
            .or(config.as_deref())
            .unwrap_or("-")
            .to_string()
    };
    let defaults = ctx.exec_config_defaults;
    format!(
        "Exec defaults:\n  host: {} (options: {})\n  security: {} (options: {})\n  ask: {} (options: {})\n  node: {}",
        show(&entry.exec_defaults.host, &defaults.host),
        EXEC_HOSTS.join(", "),
        show(&entry.exec_defaults.security, &defaults.security),
        EXEC_SECURITY.join(", "),
        show(&entry.exec_defaults.ask, &defaults.ask),
        EXEC_ASK.join(", "),
        show(&entry.exec_defaults.node, &defaults.node),
    )
}

fn exec_inline_args(words: &[&str], _ctx: &DirectiveContext) -> usize {
    match parse_exec_pairs(words) {
        Some(pairs) if pairs.len() == words.iter().take_while(|w| w.contains('=')).count() => {
            pairs.len()
        },
        _ => 0,
    }
}

// ── /verbose ────────────────────────────────────────────────────────────────

fn verbose_apply(arg: &str, entry: &mut SessionEntry, _ctx: &DirectiveContext) -> DirectiveEffect {
    let arg = arg.trim();
    if arg.is_empty() {
        let text = match entry.verbose_level {
            Some(level) => format!("Verbose: {}", level.as_str()),
            None => "Verbose: off (default)".to_string(),
        };
        return DirectiveEffect::query(text);
    }
    match VerboseLevel::parse(arg) {
        Some(level) => {
            entry.verbose_level = Some(level);
            entry.mark_updated();
            DirectiveEffect::mutation(format!("Verbose set to {}.", level.as_str()))
        },
        None => DirectiveEffect::query("Usage: /verbose on|full|off"),
    }
}

fn verbose_inline_args(words: &[&str], _ctx: &DirectiveContext) -> usize {
    usize::from(words.first().is_some_and(|w| VerboseLevel::parse(w).is_some()))
}

// ── /status ─────────────────────────────────────────────────────────────────

fn status_apply(_arg: &str, entry: &mut SessionEntry, ctx: &DirectiveContext) -> DirectiveEffect {
    let level = |l: Option<&'static str>| l.unwrap_or("off (default)");
    DirectiveEffect::query(format!(
        "Session status:\n  {}\n  elevated: {}\n  reasoning: {}\n  verbose: {}\n{}",
        current_selection_text(entry, ctx),
        level(entry.elevated_level.map(ElevatedLevel::as_str)),
        level(entry.reasoning_level.map(ReasoningLevel::as_str)),
        level(entry.verbose_level.map(VerboseLevel::as_str)),
        indent(&exec_status_text(entry, ctx)),
    ))
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn no_inline_args(_words: &[&str], _ctx: &DirectiveContext) -> usize {
    0
}
