//! Command dispatch: the single path from a line to a handler.
//!
//! Dispatch is a chain of [`Dispatcher`]s composed once when the interpreter
//! is built. Each link handles what it recognizes and hands the rest to the
//! link it wraps. The innermost link is always the [`RegistryDispatcher`].
//!
//! ```text
//! line ──▶ FunctionDispatcher ──▶ RegistryDispatcher ──┬──▶ builtin handler
//!          (expand, @file,         (!shell, registry)  └──▶ Hooks::default_cmd
//!           user functions)
//! ```

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;

use crate::command::ExecContext;
use crate::error::{InterpError, InterpResult};

/// One link in the dispatch chain.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Run one logical line. Returns `true` to stop the enclosing loop.
    async fn dispatch(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool>;
}

/// Shared handle to a dispatcher chain.
pub type DispatchChain = Arc<dyn Dispatcher>;

/// Split a line into the command name and the trimmed remainder.
pub fn split_command(line: &str) -> (&str, &str) {
    match line.trim().split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line.trim(), ""),
    }
}

/// Looks the command name up in the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryDispatcher;

#[async_trait]
impl Dispatcher for RegistryDispatcher {
    async fn dispatch(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        if let Some(shell_line) = line.strip_prefix('!') {
            if ctx.interp.config().enable_shell {
                return run_shell(ctx, shell_line.trim()).await;
            }
        }

        let (name, rest) = split_command(line);
        match ctx.interp.command(name) {
            Some(command) => {
                tracing::trace!(command = %name, "dispatch builtin");
                command.call(ctx, rest).await
            }
            None => ctx.interp.hooks().default_cmd(ctx.interp, line),
        }
    }
}

/// Run a shell escape through `sh -c`, copying its output to the sink.
#[tracing::instrument(level = "debug", skip(ctx), err)]
async fn run_shell(ctx: &mut ExecContext<'_>, shell_line: &str) -> InterpResult<bool> {
    if shell_line.is_empty() {
        return Err(InterpError::usage("missing shell command"));
    }

    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(shell_line)
        .stdin(Stdio::null())
        .output()
        .await?;

    let out = ctx.interp.output();
    out.write_str(&String::from_utf8_lossy(&output.stdout));
    out.write_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(false)
    } else {
        let code = output.status.code().unwrap_or(1);
        Err(InterpError::usage(format!("{shell_line}: exit status {code}")))
    }
}
