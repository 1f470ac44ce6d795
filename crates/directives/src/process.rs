//! Directive extraction for one inbound message.
//!
//! A known directive at the start of the message consumes its first line; the
//! rest of the message is scanned for inline `/tokens`. Directive syntax is
//! always stripped from the agent-visible text, but session mutations commit
//! only for recognized, well-formed invocations.

use hermod_sessions::SessionEntry;

use crate::{
    commands::{DirectiveSpec, find_directive},
    types::{DirectiveContext, DirectiveOutcome},
};

/// Extract and apply directives from `raw`.
///
/// Unauthorized senders get the text back untouched, directives included.
/// Only a leading directive produces a channel response; inline mutations
/// surface through the system-event queue instead.
pub fn process_directives(
    raw: &str,
    entry: &mut SessionEntry,
    ctx: &DirectiveContext<'_>,
) -> DirectiveOutcome {
    if !ctx.command_authorized {
        return DirectiveOutcome::passthrough(raw);
    }

    let trimmed = raw.trim();
    let mut outcome = DirectiveOutcome::default();

    let body = match leading_directive(trimmed) {
        Some((spec, arg, remainder)) => {
            tracing::debug!(directive = spec.name, "applying leading directive");
            let effect = (spec.apply)(arg, entry, ctx);
            outcome.entry_changed = effect.changed;
            outcome.system_events = effect.events;
            outcome.response = effect.response;
            remainder
        },
        None => trimmed,
    };

    outcome.stripped_text = strip_inline(body, entry, ctx, &mut outcome);
    outcome
}

/// Split a message that starts with a known directive into (spec, first-line
/// argument, remaining lines). Unknown or malformed `/tokens` return `None`
/// and the whole message passes through.
fn leading_directive(text: &str) -> Option<(&'static DirectiveSpec, &str, &str)> {
    if !text.starts_with('/') {
        return None;
    }
    let (first_line, remainder) = match text.split_once('\n') {
        Some((line, rest)) => (line, rest),
        None => (text, ""),
    };
    let mut parts = first_line.splitn(2, char::is_whitespace);
    let token = parts.next().unwrap_or_default();
    let spec = directive_for_token(token)?;
    let arg = parts.next().unwrap_or_default().trim();
    Some((spec, arg, remainder.trim()))
}

fn directive_for_token(token: &str) -> Option<&'static DirectiveSpec> {
    let name = token.strip_prefix('/')?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    find_directive(name)
}

/// Strip inline directive tokens from `text`, applying well-formed mutations.
///
/// A malformed inline invocation strips the token alone and leaves the
/// following words as ordinary text. Responses from inline invocations are
/// dropped; their events still reach the outcome.
fn strip_inline(
    text: &str,
    entry: &mut SessionEntry,
    ctx: &DirectiveContext<'_>,
    outcome: &mut DirectiveOutcome,
) -> String {
    let mut out_lines = Vec::new();
    for line in text.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        let mut kept: Vec<&str> = Vec::with_capacity(words.len());
        let mut stripped_any = false;
        let mut i = 0;
        while i < words.len() {
            let Some(spec) = directive_for_token(words[i]) else {
                kept.push(words[i]);
                i += 1;
                continue;
            };
            stripped_any = true;
            let following = &words[i + 1..];
            let consumed = (spec.inline_args)(following, ctx);
            if consumed > 0 {
                let arg = following[..consumed].join(" ");
                tracing::debug!(directive = spec.name, "applying inline directive");
                let effect = (spec.apply)(&arg, entry, ctx);
                outcome.entry_changed |= effect.changed;
                outcome.system_events.extend(effect.events);
            }
            i += 1 + consumed;
        }
        if stripped_any {
            out_lines.push(kept.join(" "));
        } else {
            // Untouched lines keep their original spacing.
            out_lines.push(line.to_string());
        }
    }
    out_lines.join("\n").trim().to_string()
}
