//! `${VAR}` expansion in raw config text.
//!
//! Expansion runs on the whole document before parsing, so placeholders work
//! in any string value regardless of format. There is no escape syntax and
//! no `${VAR:-default}` form; an unset variable leaves the placeholder
//! untouched, which keeps literal `${...}` text in prompts round-trippable.

/// Expand `${VAR}` placeholders from the process environment.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str(&rest[start..start + 2 + end + 1]);
                    },
                }
                rest = &after[end + 1..];
            },
            // "${}" or an unterminated opener: keep it literally.
            _ => {
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}
