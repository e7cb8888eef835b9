//! if — Run one of two blocks depending on a predicate.
//!
//! ```text
//! if [!]value body [else body]
//! if [!](op args...) body [else body]
//! ```
//!
//! | op                                 | args | true when                          |
//! |------------------------------------|------|------------------------------------|
//! | `z` / `n`                          | 0..1 | arg is empty / non-empty           |
//! | `t` / `f`                          | 0..1 | arg reads as true / false          |
//! | `eq ne gt gte lt lte`              | 0..2 | byte-wise string comparison        |
//! | `eq# ne# gt# gte# lt# lte#`        | 2    | integer comparison                 |
//! | `startswith endswith contains`     | 1..2 | `args[1]` has `args[0]` there      |
//!
//! The chosen block runs in the enclosing scope, so variables it sets stay
//! visible after the `if`.

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::args::{split_args, split_args_n};
use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::value::{bool_value, parse_int, truthy};

/// If command.
pub struct If;

#[async_trait]
impl CommandHandler for If {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let line = line.trim();
        let (negate, line) = match line.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, line),
        };

        if line.is_empty() {
            return Err(InterpError::usage("missing condition"));
        }

        let parts = split_args_n(line, 2);
        let (predicate, body) = match parts.as_slice() {
            [predicate, body, ..] => (predicate.as_str(), body.as_str()),
            [predicate] => (predicate.as_str(), ""),
            [] => return Err(InterpError::usage("missing condition")),
        };

        // Consume the body before evaluating so a bad predicate never leaves
        // half a block in the source.
        let block = ctx.read_block(body, Some("else")).await?;

        let result = evaluate(predicate)? != negate;
        tracing::trace!(predicate, result, "if");

        let chosen = if result { Some(block.main) } else { block.alternate };
        match chosen {
            Some(lines) => ctx.run_block("", &lines, &[]).await,
            None => Ok(false),
        }
    }
}

/// Evaluate a predicate word.
pub fn evaluate(predicate: &str) -> InterpResult<bool> {
    let Some(inner) = predicate.strip_prefix('(').and_then(|p| p.strip_suffix(')')) else {
        return Ok(truthy(predicate));
    };

    let words = split_args(inner);
    let Some((op, args)) = words.split_first() else {
        return Err(InterpError::usage(format!("invalid condition: {inner:?}")));
    };

    let result = match op.as_str() {
        "z" => match args {
            [] => true,
            [arg] => arg.is_empty(),
            _ => return Err(arity(1, args.len())),
        },
        "n" => match args {
            [] => false,
            [arg] => !arg.is_empty(),
            _ => true,
        },
        "t" => match args {
            [] => false,
            [arg] => bool_value(arg),
            _ => true,
        },
        "f" => match args {
            [] => true,
            [arg] => !bool_value(arg),
            _ => false,
        },
        "eq" => compare(args, false)?.is_eq(),
        "ne" => compare(args, false)?.is_ne(),
        "gt" => compare(args, false)?.is_gt(),
        "gte" => compare(args, false)?.is_ge(),
        "lt" => compare(args, false)?.is_lt(),
        "lte" => compare(args, false)?.is_le(),
        "eq#" => compare(args, true)?.is_eq(),
        "ne#" => compare(args, true)?.is_ne(),
        "gt#" => compare(args, true)?.is_gt(),
        "gte#" => compare(args, true)?.is_ge(),
        "lt#" => compare(args, true)?.is_lt(),
        "lte#" => compare(args, true)?.is_le(),
        "startswith" => affix(args, |needle, hay| hay.starts_with(needle))?,
        "endswith" => affix(args, |needle, hay| hay.ends_with(needle))?,
        "contains" => affix(args, |needle, hay| hay.contains(needle))?,
        _ => return Err(InterpError::usage(format!("invalid condition: {inner:?}"))),
    };
    Ok(result)
}

fn arity(expected: usize, got: usize) -> InterpError {
    InterpError::usage(format!("expected {expected} argument(s), got {got}"))
}

/// Compare up to two words; missing words compare as empty.
fn compare(args: &[String], numeric: bool) -> InterpResult<Ordering> {
    if args.len() > 2 || (numeric && args.len() != 2) {
        return Err(arity(2, args.len()));
    }

    let left = args.first().map(String::as_str).unwrap_or_default();
    let right = args.get(1).map(String::as_str).unwrap_or_default();

    if numeric {
        let number = |s: &str| parse_int(s).ok_or_else(|| InterpError::usage(format!("not an integer: {s:?}")));
        Ok(number(left)?.cmp(&number(right)?))
    } else {
        Ok(left.cmp(right))
    }
}

fn affix(args: &[String], test: impl Fn(&str, &str) -> bool) -> InterpResult<bool> {
    match args {
        [] => Err(arity(2, 0)),
        [_] => Ok(false),
        [needle, hay] => Ok(test(needle, hay)),
        _ => Err(arity(2, args.len())),
    }
}
