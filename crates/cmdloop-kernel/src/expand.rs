//! Variable expansion.
//!
//! Recognized references:
//!
//! | Form           | Resolves to                      |
//! |----------------|----------------------------------|
//! | `$name`        | scope variable                   |
//! | `$(name)`      | scope variable                   |
//! | `$(env.NAME)`  | process environment              |
//! | `$*`, `$(*)`   | positional tail                  |
//! | `$#`, `$(#)`   | positional count                 |
//! | `$$`           | a literal `$`                    |
//!
//! Substitution repeats until no reference is left, so a variable whose value
//! is itself a reference resolves fully. Undefined names expand to nothing.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::scope::Scope;

/// Upper bound on substitution passes; stops self-referencing values.
pub const MAX_EXPANSION_PASSES: usize = 32;

/// Stand-in for `$$` while references are substituted.
const DOLLAR_SENTINEL: char = '\u{E000}';

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$(\w+|\(\w+\)|\(env\.\w+\)|[*#]|\([*#]\))").unwrap_or_else(|e| {
            unreachable!("variable reference pattern is valid: {e}")
        })
    })
}

/// Expand every reference in `line` against `scope` and the environment.
pub fn expand(line: &str, scope: &Scope) -> String {
    expand_with(line, |name| scope.get(name))
}

/// Expand with a caller-provided variable lookup.
pub fn expand_with<F>(line: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if !line.contains('$') {
        return line.to_string();
    }

    let re = reference_regex();
    let mut text = line.replace("$$", &DOLLAR_SENTINEL.to_string());

    for _ in 0..MAX_EXPANSION_PASSES {
        let replaced = re.replace_all(&text, |caps: &Captures<'_>| {
            let name = caps[1].trim_start_matches('(').trim_end_matches(')');
            match name.strip_prefix("env.") {
                Some(var) => std::env::var(var).unwrap_or_default(),
                None => lookup(name).unwrap_or_default(),
            }
        });

        match replaced {
            Cow::Borrowed(_) => break,
            Cow::Owned(next) => text = next.replace("$$", &DOLLAR_SENTINEL.to_string()),
        }
    }

    text.replace(DOLLAR_SENTINEL, "$")
}

/// Whether a line should be expanded before dispatch.
///
/// Definitions and loops carry bodies that must see the variables of each
/// invocation or iteration, so they expand their own arguments later.
pub fn can_expand(line: &str) -> bool {
    !["function ", "repeat ", "foreach "]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}
