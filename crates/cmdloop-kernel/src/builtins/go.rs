//! go — Asynchronous dispatch with optional bounded fan-out.
//!
//! ```text
//! go --start 2      open a barrier admitting two tasks at a time
//! go fetch a        admitted
//! go fetch b        admitted
//! go fetch c        waits until a or b finishes
//! go --wait         wait for all three, close the barrier
//! ```
//!
//! Without an open barrier `go cmd` is fire-and-forget.

use async_trait::async_trait;

use crate::args::get_options;
use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::value::parse_int;

/// Go command.
pub struct Go;

#[async_trait]
impl CommandHandler for Go {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let (options, rest) = get_options(line);

        match options.as_slice() {
            [] => spawn(ctx, rest).await,
            [opt] if opt == "--start" || opt.starts_with("--start=") => {
                let count = opt.strip_prefix("--start=").unwrap_or(rest);
                start(ctx, count)
            }
            [opt] if opt == "--wait" => {
                if !rest.is_empty() {
                    return Err(InterpError::usage("go --wait takes no arguments"));
                }
                wait(ctx).await
            }
            _ => Err(InterpError::usage(format!("invalid options {options:?}"))),
        }
    }
}

fn start(ctx: &mut ExecContext<'_>, count: &str) -> InterpResult<bool> {
    let capacity = match count.trim() {
        "" => 0,
        n => match parse_int(n) {
            Some(n) if n >= 0 => n as usize,
            _ => return Err(InterpError::usage(format!("invalid count {n:?}"))),
        },
    };

    if let Some(old) = ctx.interp.open_barrier(capacity) {
        tracing::warn!(
            in_flight = old.in_flight(),
            "replacing an open barrier; its tasks are no longer tracked"
        );
    }
    tracing::debug!(capacity, "barrier opened");
    Ok(false)
}

async fn wait(ctx: &mut ExecContext<'_>) -> InterpResult<bool> {
    let Some(barrier) = ctx.interp.take_barrier() else {
        return Err(InterpError::Concurrency("go --wait: no barrier open (use go --start)".into()));
    };
    barrier.drain().await;
    Ok(false)
}

async fn spawn(ctx: &mut ExecContext<'_>, command: &str) -> InterpResult<bool> {
    if command.is_empty() {
        return Err(InterpError::usage("missing command"));
    }

    let task = ctx.interp.clone().run_detached(ctx.scope.fork(), command.to_string());

    match ctx.interp.barrier() {
        Some(barrier) => {
            barrier.spawn(task).await?;
        }
        None => {
            tokio::spawn(task);
        }
    }
    Ok(false)
}
