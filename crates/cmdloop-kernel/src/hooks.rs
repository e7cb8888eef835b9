//! Lifecycle hooks for the dispatch loop.
//!
//! Every method has a default, so an embedder implements only what it needs:
//!
//! ```text
//! pre_loop
//! ┌─▶ read line ── blank? ──▶ empty_line
//! │      │
//! │   pre_cmd ─▶ dispatch ─▶ post_cmd ── stop? ──▶ post_loop
//! └──────────────────────────────┘
//! ```

use crate::error::{InterpError, InterpResult};
use crate::interpreter::Interpreter;

/// Callbacks around the dispatch loop.
pub trait Hooks: Send + Sync {
    /// Before the top-level loop starts.
    fn pre_loop(&self, _interp: &Interpreter) {}

    /// After the top-level loop ends.
    fn post_loop(&self, _interp: &Interpreter) {}

    /// Before each command is dispatched.
    fn pre_cmd(&self, _interp: &Interpreter, _line: &str) {}

    /// After each command; may override the stop decision.
    fn post_cmd(&self, _interp: &Interpreter, _line: &str, stop: bool) -> bool {
        stop
    }

    /// A blank or comment line was read.
    fn empty_line(&self, _interp: &Interpreter) {}

    /// No command or function has this name.
    fn default_cmd(&self, _interp: &Interpreter, line: &str) -> InterpResult<bool> {
        let name = line.split_whitespace().next().unwrap_or(line);
        Err(InterpError::UnknownCommand(name.to_string()))
    }

    /// A script is about to change variable `name` from `old` to `new`
    /// (`None` meaning unset). Return the value to store, or `None` to leave
    /// the variable unset.
    fn on_change(&self, _name: &str, _old: Option<&str>, new: Option<&str>) -> Option<String> {
        new.map(str::to_string)
    }
}

/// Hooks that do nothing beyond the defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_through() {
        let interp = Interpreter::new();
        let hooks = DefaultHooks;
        assert!(hooks.post_cmd(&interp, "x", true));
        assert!(!hooks.post_cmd(&interp, "x", false));
        assert_eq!(hooks.on_change("x", None, Some("1")).as_deref(), Some("1"));
        assert_eq!(hooks.on_change("x", Some("1"), None), None);
    }

    #[test]
    fn unknown_command_names_the_command() {
        let interp = Interpreter::new();
        let err = DefaultHooks.default_cmd(&interp, "frob --now").unwrap_err();
        assert_eq!(err.to_string(), "invalid command: frob");
    }
}
