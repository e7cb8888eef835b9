//! echo — Print text to the output sink.

use async_trait::async_trait;

use crate::command::{CommandHandler, ExecContext};
use crate::error::InterpResult;

/// Echo command: prints its (already expanded) arguments.
pub struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        // -n suppresses the trailing newline
        match strip_no_newline(line) {
            Some(text) => ctx.interp.output().write_str(text),
            None => ctx.println(line),
        }
        Ok(false)
    }
}

fn strip_no_newline(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("-n")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use crate::source::LineBuffer;
    use crate::Interpreter;

    async fn echo(line: &str) -> String {
        let (output, buf) = Output::buffered();
        let interp = Interpreter::builder().output(output).build();
        let mut scope = interp.new_scope();
        let mut source = LineBuffer::default();
        let mut ctx = ExecContext::new(&interp, &mut scope, &mut source);
        Echo.call(&mut ctx, line).await.unwrap();
        buf.contents()
    }

    #[tokio::test]
    async fn test_echo_simple() {
        assert_eq!(echo("hello").await, "hello\n");
    }

    #[tokio::test]
    async fn test_echo_keeps_spacing() {
        assert_eq!(echo("a   b").await, "a   b\n");
    }

    #[tokio::test]
    async fn test_echo_empty() {
        assert_eq!(echo("").await, "\n");
    }

    #[tokio::test]
    async fn test_echo_n_no_newline() {
        assert_eq!(echo("-n hello").await, "hello");
        assert_eq!(echo("-n").await, "");
    }

    #[tokio::test]
    async fn test_echo_dash_words_are_text() {
        assert_eq!(echo("-nope").await, "-nope\n");
        assert_eq!(echo("-5 degrees").await, "-5 degrees\n");
    }
}
