//! help — List commands or describe one.

use async_trait::async_trait;

use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};

/// Help command: `help` lists everything, `help name` describes one command.
pub struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let topic = line.trim();
        if topic.is_empty() {
            ctx.interp.output().write_str(&render_index(ctx));
            return Ok(false);
        }

        match ctx.interp.command(topic) {
            Some(command) => {
                ctx.println(command.describe());
                Ok(false)
            }
            None => Err(InterpError::UnknownCommand(topic.to_string())),
        }
    }
}

fn render_index(ctx: &ExecContext<'_>) -> String {
    let commands = ctx.interp.commands();
    let width = commands.iter().map(|c| c.name.len()).max().unwrap_or(0);

    let mut out = String::from("Available commands:\n");
    out.push_str(&"=".repeat(64));
    out.push('\n');
    for command in commands {
        out.push_str(&format!("{:<width$}  {}\n", command.name, command.help));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use crate::source::LineBuffer;
    use crate::Interpreter;

    #[tokio::test]
    async fn test_help_lists_commands() {
        let (output, buf) = Output::buffered();
        let interp = Interpreter::builder().output(output).without_control_flow().build();
        let mut scope = interp.new_scope();
        let mut source = LineBuffer::default();
        let mut ctx = ExecContext::new(&interp, &mut scope, &mut source);

        Help.call(&mut ctx, "").await.unwrap();
        let text = buf.contents();
        assert!(text.starts_with("Available commands:\n"));
        for name in ["echo", "exit", "go", "help", "output", "time"] {
            assert!(text.contains(&format!("\n{name} ")), "missing {name} in {text}");
        }
    }

    #[tokio::test]
    async fn test_help_one_command() {
        let (output, buf) = Output::buffered();
        let interp = Interpreter::builder().output(output).build();
        let mut scope = interp.new_scope();
        let mut source = LineBuffer::default();
        let mut ctx = ExecContext::new(&interp, &mut scope, &mut source);

        Help.call(&mut ctx, "echo").await.unwrap();
        assert_eq!(buf.contents(), "echo: echo [-n] text\n");

        let err = Help.call(&mut ctx, "nosuch").await.unwrap_err();
        assert!(matches!(err, InterpError::UnknownCommand(_)));
    }
}
