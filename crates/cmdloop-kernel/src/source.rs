//! Line sources: where the dispatch loop gets its next line.
//!
//! The loop never cares whether a line comes from a terminal, a captured
//! block, or a script file. All three implement [`LineSource`]:
//!
//! - [`LineBuffer`] replays an in-memory list (blocks, function bodies, tests)
//! - [`ReaderSource`] reads any tokio `AsyncBufRead` (script files, piped stdin)
//! - the interactive editor lives in the REPL crate

use std::collections::VecDeque;
use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// A producer of raw input lines.
#[async_trait]
pub trait LineSource: Send {
    /// Fetch the next raw line, showing `prompt` if the source is interactive.
    ///
    /// `Ok(None)` means end of input.
    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    /// Record a line in the source's history, if it keeps one.
    fn add_history(&mut self, _line: &str) {}

    /// Whether lines come from a human at a terminal.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// Replays a fixed list of lines.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    lines: VecDeque<String>,
}

impl LineBuffer {
    /// Create a buffer over the given lines.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a script into lines.
    pub fn from_script(script: &str) -> Self {
        Self::new(script.lines())
    }

    /// Lines not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl LineSource for LineBuffer {
    async fn next_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Reads lines from an async reader.
pub struct ReaderSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> ReaderSource<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for ReaderSource<R> {
    async fn next_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }
}

/// Whether `line` ends with a continuation backslash that is not itself escaped.
fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|&c| c == '\\').count();
    trailing % 2 == 1
}

/// Read one logical line: physical lines ending in `\` are joined with a
/// single space. The result is trimmed.
///
/// End of input in the middle of a continuation returns what was gathered.
pub async fn read_logical_line(
    source: &mut dyn LineSource,
    prompt: &str,
    continuation_prompt: &str,
) -> io::Result<Option<String>> {
    let Some(first) = source.next_line(prompt).await? else {
        return Ok(None);
    };

    let mut line = first.trim().to_string();
    while ends_with_continuation(&line) {
        line.pop();
        let head_len = line.trim_end().len();
        line.truncate(head_len);

        match source.next_line(continuation_prompt).await? {
            Some(next) => {
                let next = next.trim();
                if !line.is_empty() && !next.is_empty() {
                    line.push(' ');
                }
                line.push_str(next);
            }
            None => break,
        }
    }

    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffer_replays_in_order() {
        let mut src = LineBuffer::new(["one", "two"]);
        assert_eq!(src.next_line("> ").await.unwrap().as_deref(), Some("one"));
        assert_eq!(src.remaining(), 1);
        assert_eq!(src.next_line("> ").await.unwrap().as_deref(), Some("two"));
        assert_eq!(src.next_line("> ").await.unwrap(), None);
        assert!(!src.is_interactive());
    }

    #[tokio::test]
    async fn reader_source_reads_lines() {
        let data: &[u8] = b"echo a\necho b\n";
        let mut src = ReaderSource::new(data);
        assert_eq!(src.next_line("").await.unwrap().as_deref(), Some("echo a"));
        assert_eq!(src.next_line("").await.unwrap().as_deref(), Some("echo b"));
        assert_eq!(src.next_line("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn continuation_lines_join_with_space() {
        let mut src = LineBuffer::new(["echo one \\", "  two\\", "three", "next"]);
        let line = read_logical_line(&mut src, "> ", ". ").await.unwrap();
        assert_eq!(line.as_deref(), Some("echo one two three"));
        let line = read_logical_line(&mut src, "> ", ". ").await.unwrap();
        assert_eq!(line.as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn escaped_backslash_does_not_continue() {
        let mut src = LineBuffer::new([r"echo a\\", "echo b"]);
        let line = read_logical_line(&mut src, "", "").await.unwrap();
        assert_eq!(line.as_deref(), Some(r"echo a\\"));
    }

    #[tokio::test]
    async fn eof_during_continuation_returns_partial() {
        let mut src = LineBuffer::new(["echo partial \\"]);
        let line = read_logical_line(&mut src, "", "").await.unwrap();
        assert_eq!(line.as_deref(), Some("echo partial"));
        assert_eq!(read_logical_line(&mut src, "", "").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lines_are_trimmed() {
        let mut src = LineBuffer::new(["   var x 1   "]);
        let line = read_logical_line(&mut src, "", "").await.unwrap();
        assert_eq!(line.as_deref(), Some("var x 1"));
    }
}
