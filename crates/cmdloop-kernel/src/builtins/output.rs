//! output — Redirect the interpreter's output.

use async_trait::async_trait;

use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::output::Sink;

/// Output command.
///
/// `output` shows the current destination, `output stdout|stderr|path`
/// redirects, and `output -` switches back to the previous destination.
pub struct OutputCmd;

#[async_trait]
impl CommandHandler for OutputCmd {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let out = ctx.interp.output();
        match line.trim() {
            "" => ctx.println(out.describe()),
            "-" => {
                if !out.restore() {
                    return Err(InterpError::usage("no previous output to restore"));
                }
            }
            "stdout" => out.redirect(Sink::Stdout),
            "stderr" => out.redirect(Sink::Stderr),
            path => out.redirect(Sink::file(path)?),
        }
        Ok(false)
    }
}
