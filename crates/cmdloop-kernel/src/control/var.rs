//! var, shift — Variable assignment and positional argument shifting.

use async_trait::async_trait;

use crate::args::{get_options, split_args, split_args_n};
use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::scope::Target;

/// `var` (also registered as `set`).
pub struct Var;

#[async_trait]
impl CommandHandler for Var {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let (options, rest) = get_options(line);

        let mut target: Option<Target> = None;
        let mut remove = false;
        for option in &options {
            match option.as_str() {
                "-g" | "--global" => target = Some(Target::Global),
                "-p" | "--parent" | "--return" => target = Some(Target::Parent),
                "-r" | "-rm" | "--remove" | "-u" | "--unset" => remove = true,
                other => return Err(InterpError::usage(format!("invalid option {other}"))),
            }
        }

        let rest = rest.trim();
        if rest.is_empty() {
            if let Some(target) = target {
                return Err(InterpError::usage(format!("invalid use of {target} scope option")));
            }
            for (name, value) in ctx.scope.list_all() {
                ctx.println(format_args!("  {name} = {value}"));
            }
            return Ok(false);
        }

        let (name, value) = parse_assignment(rest)?;

        if value.is_some() && remove {
            return Err(InterpError::usage("invalid use of remove option and value"));
        }

        if value.is_none() && !remove {
            if let Some(target) = target {
                return Err(InterpError::usage(format!("invalid use of {target} scope option")));
            }
            if let Some(value) = ctx.scope.get(&name) {
                ctx.println(format_args!("{name} = {value}"));
            }
            return Ok(false);
        }

        let target = target.unwrap_or_default();
        let old = ctx.scope.get(&name);
        let new = ctx.interp.hooks().on_change(&name, old.as_deref(), value.as_deref());
        match new {
            Some(value) => ctx.scope.set(name, value, target),
            None => {
                ctx.scope.unset(&name, target);
            }
        }
        Ok(false)
    }
}

/// Split `name value` or `name=value`. The value is `None` for a bare name.
fn parse_assignment(text: &str) -> InterpResult<(String, Option<String>)> {
    let parts = split_args_n(text, 2);
    let (name, value) = match parts.as_slice() {
        [name, value, ..] => (name.clone(), Some(unquote(value))),
        _ => match text.split_once('=') {
            Some((name, value)) => (name.trim().to_string(), Some(unquote(value.trim()))),
            None => (text.to_string(), None),
        },
    };

    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(InterpError::usage(format!("invalid variable name {name:?}")));
    }
    Ok((name, value))
}

/// Strip quotes from a value that is one fully quoted word.
fn unquote(value: &str) -> String {
    let quoted = matches!(value.chars().next(), Some('"' | '\'' | '`'))
        && value.chars().next() == value.chars().last()
        && value.len() >= 2;
    if quoted {
        if let [word] = split_args(value).as_slice() {
            return word.clone();
        }
    }
    value.to_string()
}

/// `shift [n]`: drop positional arguments from the local frame.
pub struct Shift;

#[async_trait]
impl CommandHandler for Shift {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let n = match split_args(line).as_slice() {
            [] => 1,
            [count] => count
                .parse::<usize>()
                .map_err(|_| InterpError::usage(format!("invalid count {count:?}")))?,
            _ => return Err(InterpError::usage("too many arguments")),
        };
        ctx.scope.shift_args(n);
        Ok(false)
    }
}
