//! expr — Evaluate a small expression into `$result`.
//!
//! ```text
//! expr round [up|down] n        expr + a b   (also - * /)
//! expr rand max [base]          expr upper text / expr lower text
//! expr substr start:end text    expr split sep text
//! expr re pattern text
//! ```
//!
//! The result is stored in the local `result` variable and printed unless
//! the `silent` setting is on. `split` and `re` with several groups produce
//! a JSON array of strings.

use async_trait::async_trait;
use rand::Rng;
use regex::Regex;

use crate::args::{split_args, split_args_n};
use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::value::{format_float, format_radix, parse_float, parse_int};

/// Expr command.
pub struct Expr;

#[async_trait]
impl CommandHandler for Expr {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let result = evaluate(line)?;
        if !ctx.setting("silent") {
            ctx.println(&result);
        }
        ctx.set_result(result);
        Ok(false)
    }
}

/// Evaluate `op operands...` to its textual result.
pub fn evaluate(line: &str) -> InterpResult<String> {
    let parts = split_args_n(line, 2);
    let [op, rest] = parts.as_slice() else {
        return Err(InterpError::usage("missing argument(s)"));
    };

    match op.as_str() {
        "round" => round(rest),
        "rand" => random(rest),
        "+" | "-" | "*" | "/" => arithmetic(op, rest),
        "upper" => Ok(rest.to_uppercase()),
        "lower" => Ok(rest.to_lowercase()),
        "substr" => substr(rest),
        "split" => split(rest),
        "re" | "regex" | "regexp" => regex_match(rest),
        _ => Err(InterpError::usage(format!("invalid operator: {op}"))),
    }
}

fn round(text: &str) -> InterpResult<String> {
    let (mode, number) = if let Some(n) = text.strip_prefix("up ") {
        (Some(f64::ceil as fn(f64) -> f64), n.trim())
    } else if let Some(n) = text.strip_prefix("down ") {
        (Some(f64::floor as fn(f64) -> f64), n.trim())
    } else {
        (None, text)
    };

    let n = parse_float(number).ok_or_else(|| InterpError::usage("not a number"))?;
    let rounded = match mode {
        Some(f) => f(n),
        None if n - n.floor() > 0.5 => n.ceil(),
        None => n.floor(),
    };
    Ok(format_float(rounded))
}

fn random(text: &str) -> InterpResult<String> {
    let parts = split_args(text);
    if parts.len() > 2 {
        return Err(InterpError::usage("usage: rand max [base]"));
    }

    let (max, negative) = match parts.first().and_then(|s| parse_int(s)) {
        None | Some(0) => (i64::MAX, false),
        Some(n) if n < 0 => (n.checked_neg().unwrap_or(i64::MAX), true),
        Some(n) => (n, false),
    };

    let base = match parts.get(1) {
        Some(b) => {
            let b = parse_int(b).ok_or_else(|| InterpError::usage("base should be a number"))?;
            if b <= 0 {
                10
            } else {
                b.min(36) as u32
            }
        }
        None => 10,
    };

    let r = rand::rng().random_range(0..max);
    Ok(format_radix(if negative { -r } else { r }, base))
}

fn arithmetic(op: &str, text: &str) -> InterpResult<String> {
    let parts = split_args(text);
    let [a, b] = parts.as_slice() else {
        return Err(InterpError::usage(format!("usage: {op} arg1 arg2")));
    };

    let number = |s: &str| parse_float(s).ok_or_else(|| InterpError::usage(format!("not a number: {s}")));
    let (a, b) = (number(a)?, number(b)?);

    let value = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        _ => a / b,
    };
    Ok(format_float(value))
}

/// Python-style slice of a string, counted in characters.
fn substr(text: &str) -> InterpResult<String> {
    let parts = split_args_n(text, 2);
    let (range, subject) = match parts.as_slice() {
        [] => return Err(InterpError::usage("usage: substr start:end text")),
        [range] => (range.as_str(), ""),
        [range, subject, ..] => (range.as_str(), subject.as_str()),
    };

    let Some((start, end)) = range.split_once(':') else {
        return Err(InterpError::usage(format!("expected start:end, got {range}")));
    };

    let chars: Vec<char> = subject.chars().collect();
    let len = chars.len() as i64;

    let mut start = parse_int(start).unwrap_or(0);
    if start < 0 {
        start += len;
    }
    let start = start.clamp(0, len);

    let mut end = if end.is_empty() { len } else { parse_int(end).unwrap_or(0) };
    if end < 0 {
        end += len;
    }
    let end = end.clamp(start, len);

    Ok(chars[start as usize..end as usize].iter().collect())
}

fn split(text: &str) -> InterpResult<String> {
    let parts = split_args_n(text, 2);
    match parts.as_slice() {
        [] => Err(InterpError::usage("usage: split sep text")),
        [_] => Ok(String::new()),
        [sep, subject, ..] => {
            let pieces: Vec<&str> = subject.split(sep.as_str()).collect();
            to_json(&pieces)
        }
    }
}

fn regex_match(text: &str) -> InterpResult<String> {
    let parts = split_args_n(text, 2);
    let (pattern, subject) = match parts.as_slice() {
        [] => return Err(InterpError::usage("usage: re pattern text")),
        [_] => return Ok(String::new()),
        [pattern, subject, ..] => (pattern, subject),
    };

    let re = Regex::new(pattern).map_err(|e| InterpError::usage(e.to_string()))?;
    let Some(caps) = re.captures(subject) else {
        return Ok(String::new());
    };

    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
    match caps.len() {
        1 => Ok(group(0).to_string()),
        2 => Ok(group(1).to_string()),
        n => {
            let groups: Vec<&str> = (1..n).map(group).collect();
            to_json(&groups)
        }
    }
}

fn to_json(items: &[&str]) -> InterpResult<String> {
    serde_json::to_string(items).map_err(|e| InterpError::usage(e.to_string()))
}
