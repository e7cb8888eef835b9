//! exit — Stop the current loop.

use async_trait::async_trait;

use crate::command::{CommandHandler, ExecContext};
use crate::error::InterpResult;

/// Exit command: requests that the enclosing loop end.
pub struct Exit;

#[async_trait]
impl CommandHandler for Exit {
    async fn call(&self, _ctx: &mut ExecContext<'_>, _line: &str) -> InterpResult<bool> {
        Ok(true)
    }
}
