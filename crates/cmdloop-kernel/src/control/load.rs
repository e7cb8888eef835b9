//! load, stop — Run a script file; end the running block.

use async_trait::async_trait;
use tokio::io::BufReader;

use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::source::ReaderSource;

/// Load command: runs a script in the caller's scope.
pub struct Load;

#[async_trait]
impl CommandHandler for Load {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let path = line.trim();
        if path.is_empty() {
            return Err(InterpError::usage("missing script file"));
        }

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| InterpError::usage(format!("{path}: {e}")))?;
        tracing::debug!(path, "load script");

        // A stop or `exit` in the script ends the caller too. Syntax errors
        // and interrupts end only the script; the caller sees the flag itself.
        let mut source = ReaderSource::new(BufReader::new(file));
        match ctx.interp.run_nested(ctx.scope, "", &mut source, &[]).await {
            Ok(stop) => Ok(stop && !ctx.interrupted()),
            Err(e) => {
                ctx.interp.report_error(&e);
                Ok(false)
            }
        }
    }
}

/// Stop command.
pub struct Stop;

#[async_trait]
impl CommandHandler for Stop {
    async fn call(&self, _ctx: &mut ExecContext<'_>, _line: &str) -> InterpResult<bool> {
        Ok(true)
    }
}
