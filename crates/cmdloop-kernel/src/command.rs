//! Commands and the context they run in.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::block::{read_block, Block};
use crate::error::InterpResult;
use crate::interpreter::Interpreter;
use crate::scope::{Scope, Target};
use crate::source::LineSource;

/// Everything a command may touch while it runs.
///
/// `source` is the line source the command was read from, so block-taking
/// commands can read their body from it.
pub struct ExecContext<'a> {
    /// The interpreter (command table, functions, output, flags).
    pub interp: &'a Interpreter,
    /// Variable scope of the running block.
    pub scope: &'a mut Scope,
    /// Where the current line came from.
    pub source: &'a mut dyn LineSource,
}

impl<'a> ExecContext<'a> {
    /// Bundle the pieces of an execution.
    pub fn new(interp: &'a Interpreter, scope: &'a mut Scope, source: &'a mut dyn LineSource) -> Self {
        Self { interp, scope, source }
    }

    /// Print a line to the interpreter's output.
    pub fn println(&self, text: impl fmt::Display) {
        self.interp.output().println(text);
    }

    /// Store a command's result in the local `result` variable.
    pub fn set_result(&mut self, value: impl Into<String>) {
        self.scope.set("result", value, Target::Local);
    }

    /// Whether the runtime setting variable `name` is truthy.
    pub fn setting(&self, name: &str) -> bool {
        self.scope.get_bool(name)
    }

    /// Read a block body that starts with `header` from the current source.
    pub async fn read_block(&mut self, header: &str, else_keyword: Option<&str>) -> InterpResult<Block> {
        let cont = self.interp.config().continuation_prompt.clone();
        read_block(&mut *self.source, header, else_keyword, &cont).await
    }

    /// Run lines as a nested block in this context's scope.
    ///
    /// See [`Interpreter::run_block`] for how `name` and `args` are used.
    pub async fn run_block(&mut self, name: &str, lines: &[String], args: &[String]) -> InterpResult<bool> {
        self.interp.run_block(self.scope, name, lines, args).await
    }

    /// Whether the interrupt flag is raised.
    pub fn interrupted(&self) -> bool {
        self.interp.interrupted()
    }
}

/// The behavior behind a command name.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run with everything after the command name. Returns `true` to stop the
    /// enclosing loop.
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool>;

    /// Render help for this command.
    fn describe(&self, name: &str, help: &str) -> String {
        format!("{name}: {help}")
    }
}

type SyncFn = dyn Fn(&mut ExecContext<'_>, &str) -> InterpResult<bool> + Send + Sync;

/// Adapter for handlers that never await.
struct SyncHandler(Box<SyncFn>);

#[async_trait]
impl CommandHandler for SyncHandler {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        (self.0)(ctx, line)
    }
}

/// A named, registered command.
#[derive(Clone)]
pub struct Command {
    /// Name used to invoke the command.
    pub name: String,
    /// One-line usage text.
    pub help: String,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    /// Create a command from a handler.
    pub fn new(name: impl Into<String>, help: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            handler: Arc::new(handler),
        }
    }

    /// Create a command from a closure that does not await.
    pub fn sync<F>(name: impl Into<String>, help: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut ExecContext<'_>, &str) -> InterpResult<bool> + Send + Sync + 'static,
    {
        Self::new(name, help, SyncHandler(Box::new(f)))
    }

    /// Register the same handler under another name.
    pub fn alias(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: self.help.clone(),
            handler: self.handler.clone(),
        }
    }

    /// Run the handler.
    pub async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        self.handler.call(ctx, line).await
    }

    /// Rendered help.
    pub fn describe(&self) -> String {
        self.handler.describe(&self.name, &self.help)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}
