//! Variable scope stack.
//!
//! Scopes provide string variable bindings with:
//! - A permanent global frame (index 0), shared by every task of one interpreter
//! - Nested frames pushed around function calls and loop bodies
//! - Positional bindings (`$0..$N`, `$*`, `$#`) injected when a function starts
//!
//! The global frame lives behind a lock so asynchronous `go` tasks can see
//! and update it; every other frame is owned by exactly one [`Scope`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::value;

/// One level of name → value bindings.
pub type Frame = HashMap<String, String>;

/// Shared handle to the global frame.
pub type GlobalFrame = Arc<RwLock<Frame>>;

/// Which frame a mutation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// The innermost frame.
    #[default]
    Local,
    /// The frame below the innermost one (falls back to local).
    Parent,
    /// Frame 0.
    Global,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Local => write!(f, "local"),
            Target::Parent => write!(f, "parent"),
            Target::Global => write!(f, "global"),
        }
    }
}

/// Where a target resolved to.
enum Slot {
    Global,
    Frame(usize),
}

/// Variable scope stack with a shared global frame.
///
/// Variables are looked up from innermost to outermost frame.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Frame 0.
    global: GlobalFrame,
    /// Frames 1..; the last element is the innermost scope.
    frames: Vec<Frame>,
}

impl Scope {
    /// Create a stack holding only a fresh global frame.
    pub fn new() -> Self {
        Self::with_global(Arc::new(RwLock::new(Frame::new())))
    }

    /// Create a stack on top of an existing global frame.
    pub fn with_global(global: GlobalFrame) -> Self {
        Self {
            global,
            frames: Vec::new(),
        }
    }

    /// Stack for an asynchronous task: same live global frame, a snapshot of
    /// every other frame.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Number of frames, the global one included. Always ≥ 1.
    pub fn depth(&self) -> usize {
        self.frames.len() + 1
    }

    /// Push a new frame seeded with `vars` and, if `args` is non-empty,
    /// positional bindings: `args[0]` → `$0`, the rest → `$1..`, `$*`, `$#`.
    pub fn push(&mut self, vars: &[(&str, &str)], args: &[String]) {
        let mut frame: Frame = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        if !args.is_empty() {
            bind_positional(&mut frame, &args[0], &args[1..]);
        }

        self.frames.push(frame);
        tracing::trace!(depth = self.depth(), "scope push");
    }

    /// Pop the innermost frame.
    ///
    /// Panics if attempting to pop the global frame: push/pop are out of
    /// balance and continuing would corrupt nesting.
    pub fn pop(&mut self) {
        if self.frames.pop().is_none() {
            panic!("cannot pop the global scope frame");
        }
        tracing::trace!(depth = self.depth(), "scope pop");
    }

    /// Get a variable, searching from innermost to outermost frame.
    pub fn get(&self, name: &str) -> Option<String> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value.clone());
            }
        }
        self.read_global().get(name).cloned()
    }

    /// Boolean reading of a variable (missing is false).
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| value::bool_value(&v))
    }

    /// Check if a variable exists in any frame.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a variable in the addressed frame.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>, target: Target) {
        let (name, value) = (name.into(), value.into());
        match self.slot(target) {
            Slot::Global => {
                self.write_global().insert(name, value);
            }
            Slot::Frame(i) => {
                self.frames[i].insert(name, value);
            }
        }
    }

    /// Remove a variable from the addressed frame only.
    ///
    /// Returns the removed value if it was bound there.
    pub fn unset(&mut self, name: &str, target: Target) -> Option<String> {
        match self.slot(target) {
            Slot::Global => self.write_global().remove(name),
            Slot::Frame(i) => self.frames[i].remove(name),
        }
    }

    /// All visible variables, inner frames shadowing outer ones, sorted by name.
    pub fn list_all(&self) -> Vec<(String, String)> {
        let mut merged: BTreeMap<String, String> = self
            .read_global()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for frame in &self.frames {
            for (name, value) in frame {
                merged.insert(name.clone(), value.clone());
            }
        }
        merged.into_iter().collect()
    }

    /// All visible variable names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.list_all().into_iter().map(|(name, _)| name).collect()
    }

    /// Drop the first `n` positional arguments of the local frame.
    ///
    /// `$1..` are renumbered and `$*`/`$#` recomputed. Does nothing when the
    /// local frame has no positional bindings or `n` exceeds their count.
    pub fn shift_args(&mut self, n: usize) {
        let shift = |frame: &mut Frame| {
            let Some(count) = frame.get("#").and_then(|c| value::parse_int(c)) else {
                return;
            };
            let count = count.max(0) as usize;
            if n > count {
                return;
            }

            let args: Vec<String> = (1..=count)
                .map(|i| frame.remove(&i.to_string()).unwrap_or_default())
                .collect();
            let name = frame.get("0").cloned().unwrap_or_default();
            bind_positional(frame, &name, &args[n..]);
        };

        match self.slot(Target::Local) {
            Slot::Global => shift(&mut self.write_global()),
            Slot::Frame(i) => shift(&mut self.frames[i]),
        }
    }

    /// Shared handle to the global frame.
    pub fn global(&self) -> &GlobalFrame {
        &self.global
    }

    fn slot(&self, target: Target) -> Slot {
        let len = self.frames.len();
        match target {
            Target::Global => Slot::Global,
            Target::Local if len == 0 => Slot::Global,
            Target::Local => Slot::Frame(len - 1),
            Target::Parent if len <= 1 => Slot::Global,
            Target::Parent => Slot::Frame(len - 2),
        }
    }

    fn read_global(&self) -> std::sync::RwLockReadGuard<'_, Frame> {
        self.global.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_global(&self) -> std::sync::RwLockWriteGuard<'_, Frame> {
        self.global.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `$0`, `$1..$N`, `$*` and `$#` into a frame.
fn bind_positional(frame: &mut Frame, name: &str, args: &[String]) {
    frame.insert("0".to_string(), name.to_string());
    for (i, arg) in args.iter().enumerate() {
        frame.insert((i + 1).to_string(), arg.clone());
    }
    frame.insert("*".to_string(), args.join(" "));
    frame.insert("#".to_string(), args.len().to_string());
}
