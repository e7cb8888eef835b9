//! function — Define, show, list, or delete user functions.

use async_trait::async_trait;

use crate::args::split_args_n;
use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};

/// Function command.
pub struct Function;

#[async_trait]
impl CommandHandler for Function {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let parts = split_args_n(line, 2);

        match parts.as_slice() {
            [] => {
                let names = ctx.interp.function_names();
                if names.is_empty() {
                    ctx.println("no functions");
                } else {
                    ctx.println("functions:");
                    for name in names {
                        ctx.println(format_args!("  {name}"));
                    }
                }
            }
            [name] => {
                let body = ctx
                    .interp
                    .function(name)
                    .ok_or_else(|| InterpError::usage(format!("no function {name}")))?;
                ctx.println(format_args!("function {name} {{"));
                for line in body.iter() {
                    ctx.println(format_args!("  {line}"));
                }
                ctx.println("}");
            }
            [name, rest, ..] if rest == "--delete" => {
                if !ctx.interp.delete_function(name) {
                    return Err(InterpError::usage(format!("no function {name}")));
                }
                ctx.println(format_args!("function {name} deleted"));
            }
            [name, rest, ..] => {
                let block = ctx.read_block(rest, None).await?;
                tracing::debug!(function = %name, lines = block.main.len(), "define function");
                ctx.interp.define_function(name, block.main);
            }
        }
        Ok(false)
    }
}
