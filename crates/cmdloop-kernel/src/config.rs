//! Interpreter configuration.
//!
//! Static settings chosen at construction time. Settings a script may toggle
//! at runtime (`echo`, `silent`, `timing`) are plain variables instead, read
//! when they are needed.

use std::path::PathBuf;

/// Default top-level prompt.
pub const DEFAULT_PROMPT: &str = "> ";

/// Default prompt for continuation lines and block bodies.
pub const DEFAULT_CONTINUATION_PROMPT: &str = ": ";

/// Configuration for an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Name shown in help output and logs.
    pub name: String,

    /// Initial top-level prompt.
    pub prompt: String,

    /// Prompt used while reading continuation lines and block bodies.
    pub continuation_prompt: String,

    /// Longest prompt `set_prompt` will accept; longer prompts are truncated
    /// and end in `...`. Zero disables the limit.
    pub max_prompt_len: usize,

    /// Where the line editor keeps history. Relative paths are resolved by
    /// the REPL (current directory first, then `$HOME`).
    pub history_file: Option<PathBuf>,

    /// Whether `!cmd` lines are passed to `sh -c`.
    pub enable_shell: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            name: "cmdloop".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            continuation_prompt: DEFAULT_CONTINUATION_PROMPT.to_string(),
            max_prompt_len: 0,
            history_file: None,
            enable_shell: false,
        }
    }
}

impl InterpreterConfig {
    /// Config with the given name and defaults for everything else.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Set the initial prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the continuation prompt.
    pub fn with_continuation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.continuation_prompt = prompt.into();
        self
    }

    /// Limit prompt length.
    pub fn with_max_prompt_len(mut self, len: usize) -> Self {
        self.max_prompt_len = len;
        self
    }

    /// Set the history file.
    pub fn with_history_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.history_file = Some(path.into());
        self
    }

    /// Enable or disable `!cmd` shell escapes.
    pub fn with_shell(mut self, enabled: bool) -> Self {
        self.enable_shell = enabled;
        self
    }
}

/// Truncate a prompt to `max_len` characters, marking the cut with `...`.
pub(crate) fn truncate_prompt(prompt: &str, max_len: usize) -> String {
    if max_len == 0 || prompt.chars().count() <= max_len {
        return prompt.to_string();
    }
    if max_len <= 3 {
        return prompt.chars().take(max_len).collect();
    }
    let mut cut: String = prompt.chars().take(max_len - 3).collect();
    cut.push_str("...");
    cut
}
