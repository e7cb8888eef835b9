//! The interpreter: command table, function table, and the dispatch loop.
//!
//! # Architecture
//!
//! One [`Interpreter`] value owns everything that outlives a single line:
//!
//! - **Commands**: name → [`Command`], mutated through `add_command`
//! - **Functions**: name → immutable line list, snapshotted at definition
//! - **Global frame**: shared by every [`Scope`] the interpreter hands out
//! - **Output**, **interrupt flag**, and the optional **admission barrier**
//!
//! The dispatch loop ([`Interpreter::execute`]) is re-entrant: running a
//! function, loop body, or conditional branch calls back into it with a
//! different [`LineSource`]. Cloning an `Interpreter` is cheap and shares all
//! state, which is how `go` tasks get their own handle.
//!
//! # Example
//!
//! ```
//! use cmdloop_kernel::{Interpreter, LineBuffer, Mode, Output};
//!
//! # tokio_test_block(async {
//! let (output, captured) = Output::buffered();
//! let interp = Interpreter::builder().output(output).build();
//!
//! let mut source = LineBuffer::from_script("var x 5\necho x is $x");
//! let mut scope = interp.new_scope();
//! interp.execute(&mut source, &mut scope, Mode::TopLevel).await;
//!
//! assert_eq!(captured.contents(), "x is 5\n");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::admission::AdmissionBarrier;
use crate::builtins;
use crate::command::{Command, ExecContext};
use crate::config::{truncate_prompt, InterpreterConfig};
use crate::control::ControlFlow;
use crate::dispatch::{DispatchChain, RegistryDispatcher};
use crate::error::{InterpError, InterpResult};
use crate::hooks::{DefaultHooks, Hooks};
use crate::interrupt::{self, InterruptFlag, InterruptPolicy, Terminate};
use crate::output::Output;
use crate::scope::{GlobalFrame, Scope, Target};
use crate::source::{read_logical_line, LineBuffer, LineSource};
use crate::terminal::TerminalMode;

/// Boxed future returned by the recursive entry points.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a run of the dispatch loop behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The authoritative loop: clears the interrupt flag every cycle, records
    /// history, and survives syntax errors.
    TopLevel,
    /// A block, function body, or script: stops on syntax errors and when
    /// the interrupt flag is raised.
    Nested,
}

struct Inner {
    config: InterpreterConfig,
    prompt: RwLock<String>,
    commands: RwLock<BTreeMap<String, Command>>,
    functions: RwLock<BTreeMap<String, Arc<[String]>>>,
    global: GlobalFrame,
    output: Output,
    interrupt: InterruptFlag,
    barrier: Mutex<Option<Arc<AdmissionBarrier>>>,
    hooks: Arc<dyn Hooks>,
    dispatcher: DispatchChain,
    policy: Arc<dyn InterruptPolicy>,
    initial_mode: Mutex<TerminalMode>,
}

/// An embeddable command interpreter.
#[derive(Clone)]
pub struct Interpreter {
    inner: Arc<Inner>,
}

impl Interpreter {
    /// Interpreter with the default builtins and control flow.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring an interpreter.
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    /// Static configuration.
    pub fn config(&self) -> &InterpreterConfig {
        &self.inner.config
    }

    /// Name from the configuration.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// The output sink.
    pub fn output(&self) -> &Output {
        &self.inner.output
    }

    /// Lifecycle hooks.
    pub fn hooks(&self) -> &dyn Hooks {
        self.inner.hooks.as_ref()
    }

    // ── Prompt ──────────────────────────────────────────────────────────

    /// Current top-level prompt.
    pub fn prompt(&self) -> String {
        self.inner
            .prompt
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the prompt, truncated to the configured maximum length.
    pub fn set_prompt(&self, prompt: &str) {
        let prompt = truncate_prompt(prompt, self.inner.config.max_prompt_len);
        *self.inner.prompt.write().unwrap_or_else(PoisonError::into_inner) = prompt;
    }

    /// Prompt for continuation lines and block bodies.
    pub fn continuation_prompt(&self) -> &str {
        &self.inner.config.continuation_prompt
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Register a command, replacing any command with the same name.
    pub fn add_command(&self, command: Command) {
        self.inner
            .commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command.name.clone(), command);
    }

    /// Remove a command. Returns it if it was registered.
    pub fn remove_command(&self, name: &str) -> Option<Command> {
        self.inner
            .commands
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Look a command up by name.
    pub fn command(&self, name: &str) -> Option<Command> {
        self.inner
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// All registered commands, sorted by name.
    pub fn commands(&self) -> Vec<Command> {
        self.inner
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> Vec<String> {
        self.inner
            .commands
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    // ── Functions ───────────────────────────────────────────────────────

    /// Define (or redefine) a user function.
    pub fn define_function(&self, name: &str, lines: Vec<String>) {
        tracing::debug!(function = %name, lines = lines.len(), "define function");
        self.inner
            .functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), lines.into());
    }

    /// Delete a user function. Returns whether it existed.
    pub fn delete_function(&self, name: &str) -> bool {
        self.inner
            .functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Body of a user function.
    pub fn function(&self, name: &str) -> Option<Arc<[String]>> {
        self.inner
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// User function names, sorted.
    pub fn function_names(&self) -> Vec<String> {
        self.inner
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    // ── Variables ───────────────────────────────────────────────────────

    /// A fresh scope stack on top of the shared global frame.
    pub fn new_scope(&self) -> Scope {
        Scope::with_global(self.inner.global.clone())
    }

    /// Read a global variable.
    pub fn get_var(&self, name: &str) -> Option<String> {
        self.new_scope().get(name)
    }

    /// Set a global variable.
    pub fn set_var(&self, name: &str, value: impl Into<String>) {
        self.new_scope().set(name, value, Target::Global);
    }

    // ── Interrupts and async admission ──────────────────────────────────

    /// The process-wide interrupt flag.
    pub fn interrupt_flag(&self) -> &InterruptFlag {
        &self.inner.interrupt
    }

    /// Whether the interrupt flag is raised.
    pub fn interrupted(&self) -> bool {
        self.inner.interrupt.is_set()
    }

    /// Start listening for OS signals on a background task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_signal_listener(&self) -> JoinHandle<()> {
        let mode = self
            .inner
            .initial_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        interrupt::spawn_signal_listener(self.inner.interrupt.clone(), self.inner.policy.clone(), mode)
    }

    /// Ask the interrupt policy chain what a signal would do.
    pub fn interrupt_policy(&self) -> &dyn InterruptPolicy {
        self.inner.policy.as_ref()
    }

    /// Open an admission barrier, returning the one it replaces.
    pub fn open_barrier(&self, capacity: usize) -> Option<Arc<AdmissionBarrier>> {
        self.inner
            .barrier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::new(AdmissionBarrier::new(capacity)))
    }

    /// The open admission barrier, if any.
    pub fn barrier(&self) -> Option<Arc<AdmissionBarrier>> {
        self.inner
            .barrier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Detach the open barrier so it can be drained.
    pub fn take_barrier(&self) -> Option<Arc<AdmissionBarrier>> {
        self.inner
            .barrier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    /// Print an error and record it in the global `error` variable.
    pub fn report_error(&self, err: &InterpError) {
        tracing::debug!(error = %err, "command failed");
        self.inner.output.println(err);
        self.set_var("error", err.to_string());
    }

    /// Run one line through the dispatcher chain.
    pub async fn dispatch(&self, scope: &mut Scope, source: &mut dyn LineSource, line: &str) -> InterpResult<bool> {
        let chain = self.inner.dispatcher.clone();
        let mut ctx = ExecContext::new(self, scope, source);
        chain.dispatch(&mut ctx, line).await
    }

    /// Run lines from `source` until it ends or a command asks to stop.
    ///
    /// Errors are reported and never escape. Returns whether the loop ended
    /// because of a stop request.
    pub fn execute<'a>(
        &'a self,
        source: &'a mut dyn LineSource,
        scope: &'a mut Scope,
        mode: Mode,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            match self.run_source(source, scope, mode).await {
                Ok(stop) => stop,
                Err(e) => {
                    self.report_error(&e);
                    true
                }
            }
        })
    }

    /// The loop itself. In nested mode a syntax error ends the loop and is
    /// returned unreported so the construct that owns the block can decide
    /// where it surfaces.
    fn run_source<'a>(
        &'a self,
        source: &'a mut dyn LineSource,
        scope: &'a mut Scope,
        mode: Mode,
    ) -> BoxFuture<'a, InterpResult<bool>> {
        Box::pin(async move {
            let top_level = mode == Mode::TopLevel;
            let hooks = self.inner.hooks.clone();
            let cont = self.inner.config.continuation_prompt.clone();

            loop {
                if top_level {
                    self.inner.interrupt.clear();
                }

                let prompt = if top_level { self.prompt() } else { cont.clone() };
                let line = match read_logical_line(&mut *source, &prompt, &cont).await {
                    Ok(Some(line)) => line,
                    Ok(None) => return Ok(false),
                    Err(e) => return Err(e.into()),
                };

                if line.is_empty() || line.starts_with('#') {
                    hooks.empty_line(self);
                    continue;
                }

                if top_level {
                    source.add_history(&line);
                }

                let saved_mode = (top_level && source.is_interactive()).then(TerminalMode::capture);
                let started = Instant::now();

                hooks.pre_cmd(self, &line);
                let mut stop = match self.dispatch(scope, &mut *source, &line).await {
                    Ok(stop) => stop,
                    Err(e) if e.is_syntax() && !top_level => {
                        if let Some(mode) = &saved_mode {
                            mode.restore();
                        }
                        return Err(e);
                    }
                    Err(e) => {
                        self.report_error(&e);
                        false
                    }
                };
                stop = hooks.post_cmd(self, &line, stop);

                if !top_level && self.interrupted() {
                    tracing::debug!("interrupt observed, leaving block");
                    stop = true;
                }

                if top_level && scope.get_bool("timing") {
                    self.inner
                        .output
                        .println(format_args!("Elapsed: {:?}", started.elapsed()));
                }

                if let Some(mode) = &saved_mode {
                    mode.restore();
                }

                if stop {
                    return Ok(true);
                }
            }
        })
    }

    /// Run a captured block in nested mode.
    ///
    /// A frame is pushed only when `args` is non-empty (`args[0]` becomes
    /// `$0`). A named block is a function call: its stop request and any
    /// syntax error end there. An unnamed block propagates both to the
    /// caller.
    pub async fn run_block(&self, scope: &mut Scope, name: &str, lines: &[String], args: &[String]) -> InterpResult<bool> {
        let mut source = LineBuffer::new(lines.iter().cloned());
        self.run_nested(scope, name, &mut source, args).await
    }

    /// Like [`run_block`](Self::run_block), reading from any source.
    pub async fn run_nested(
        &self,
        scope: &mut Scope,
        name: &str,
        source: &mut dyn LineSource,
        args: &[String],
    ) -> InterpResult<bool> {
        let pushed = !args.is_empty();
        if pushed {
            scope.push(&[], args);
        }

        let result = self.run_source(source, scope, Mode::Nested).await;

        if pushed {
            scope.pop();
        }

        if name.is_empty() {
            return result;
        }
        match result {
            Ok(_) => Ok(false),
            Err(e) => {
                self.report_error(&e);
                Ok(false)
            }
        }
    }

    /// Run a top-level loop over `source` with hooks around it.
    pub async fn cmd_loop(&self, source: &mut dyn LineSource) {
        let mut scope = self.new_scope();
        self.inner.hooks.pre_loop(self);
        self.execute(source, &mut scope, Mode::TopLevel).await;
        self.inner.hooks.post_loop(self);
    }

    /// Dispatch one line with top-level semantics. Returns whether it asked
    /// to stop.
    pub async fn one_cmd(&self, line: &str) -> bool {
        let mut source = LineBuffer::new([line]);
        let mut scope = self.new_scope();
        self.execute(&mut source, &mut scope, Mode::TopLevel).await
    }

    /// Dispatch a line on a background task with its own scope stack.
    ///
    /// Errors are reported through the normal channel.
    pub async fn run_detached(self, mut scope: Scope, line: String) {
        let mut source = LineBuffer::default();
        if let Err(e) = self.dispatch(&mut scope, &mut source, &line).await {
            self.report_error(&e);
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("name", &self.inner.config.name)
            .field("commands", &self.command_names())
            .field("functions", &self.function_names())
            .finish_non_exhaustive()
    }
}

/// Something that extends an interpreter while it is being built.
pub trait Plugin {
    /// Register commands and wrap dispatch links.
    fn install(self: Box<Self>, builder: &mut InterpreterBuilder);
}

/// Assembles an [`Interpreter`].
///
/// Builtins are registered up front; plugins install when [`build`] runs,
/// in the order they were added, each wrapping whatever the previous ones
/// left in place.
///
/// [`build`]: InterpreterBuilder::build
pub struct InterpreterBuilder {
    config: InterpreterConfig,
    hooks: Arc<dyn Hooks>,
    output: Output,
    commands: BTreeMap<String, Command>,
    dispatcher: DispatchChain,
    policy: Arc<dyn InterruptPolicy>,
    plugins: Vec<Box<dyn Plugin>>,
    control_flow: bool,
}

impl InterpreterBuilder {
    /// Builder with the always-present builtins registered.
    pub fn new() -> Self {
        let mut builder = Self {
            config: InterpreterConfig::default(),
            hooks: Arc::new(DefaultHooks),
            output: Output::default(),
            commands: BTreeMap::new(),
            dispatcher: Arc::new(RegistryDispatcher),
            policy: Arc::new(Terminate),
            plugins: Vec::new(),
            control_flow: true,
        };
        builtins::register(&mut builder);
        builder
    }

    /// Use this configuration.
    pub fn config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    /// Use these lifecycle hooks.
    pub fn hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Send output here instead of stdout.
    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    /// Base interrupt policy (plugins may wrap it).
    pub fn interrupt_policy(mut self, policy: impl InterruptPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Add a plugin.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Leave out function/if/loop/expr support.
    pub fn without_control_flow(mut self) -> Self {
        self.control_flow = false;
        self
    }

    /// Register a command.
    pub fn add_command(&mut self, command: Command) {
        self.commands.insert(command.name.clone(), command);
    }

    /// A command registered so far.
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Wrap the dispatcher chain with another link.
    pub fn wrap_dispatcher(&mut self, wrap: impl FnOnce(DispatchChain) -> DispatchChain) {
        let next = self.dispatcher.clone();
        self.dispatcher = wrap(next);
    }

    /// Wrap the interrupt policy chain with another link.
    pub fn wrap_interrupt_policy(
        &mut self,
        wrap: impl FnOnce(Arc<dyn InterruptPolicy>) -> Arc<dyn InterruptPolicy>,
    ) {
        let next = self.policy.clone();
        self.policy = wrap(next);
    }

    /// Install plugins and produce the interpreter.
    pub fn build(mut self) -> Interpreter {
        let mut plugins = std::mem::take(&mut self.plugins);
        if self.control_flow {
            plugins.insert(0, Box::new(ControlFlow::default()));
        }
        for plugin in plugins {
            plugin.install(&mut self);
        }

        let prompt = truncate_prompt(&self.config.prompt, self.config.max_prompt_len);
        tracing::debug!(name = %self.config.name, commands = self.commands.len(), "interpreter built");

        Interpreter {
            inner: Arc::new(Inner {
                prompt: RwLock::new(prompt),
                config: self.config,
                commands: RwLock::new(self.commands),
                functions: RwLock::new(BTreeMap::new()),
                global: GlobalFrame::default(),
                output: self.output,
                interrupt: InterruptFlag::new(),
                barrier: Mutex::new(None),
                hooks: self.hooks,
                dispatcher: self.dispatcher,
                policy: self.policy,
                initial_mode: Mutex::new(TerminalMode::capture()),
            }),
        }
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::SharedBuffer;

    fn buffered() -> (Interpreter, SharedBuffer) {
        let (output, buf) = Output::buffered();
        (Interpreter::builder().output(output).build(), buf)
    }

    async fn run(interp: &Interpreter, script: &str) -> bool {
        let mut source = LineBuffer::from_script(script);
        let mut scope = interp.new_scope();
        interp.execute(&mut source, &mut scope, Mode::TopLevel).await
    }

    #[tokio::test]
    async fn runs_lines_in_order() {
        let (interp, out) = buffered();
        run(&interp, "echo one\n\n# comment\necho two").await;
        assert_eq!(out.contents(), "one\ntwo\n");
    }

    #[tokio::test]
    async fn exit_stops_the_loop() {
        let (interp, out) = buffered();
        let stopped = run(&interp, "echo a\nexit\necho b").await;
        assert!(stopped);
        assert_eq!(out.contents(), "a\n");
    }

    #[tokio::test]
    async fn errors_are_reported_and_stored() {
        let (interp, out) = buffered();
        let stopped = run(&interp, "frobnicate now\necho after").await;
        assert!(!stopped);
        assert_eq!(out.contents(), "invalid command: frobnicate\nafter\n");
        assert_eq!(interp.get_var("error").as_deref(), Some("invalid command: frobnicate"));
    }

    #[tokio::test]
    async fn top_level_survives_syntax_errors() {
        let (interp, out) = buffered();
        let stopped = run(&interp, "function f echo {\necho still here").await;
        assert!(!stopped);
        assert!(out.contents().ends_with("still here\n"));
        assert!(interp.get_var("error").unwrap().starts_with("syntax error"));
    }

    #[tokio::test]
    async fn unnamed_block_propagates_stop() {
        let (interp, _) = buffered();
        let mut scope = interp.new_scope();
        let lines = vec!["exit".to_string(), "echo never".to_string()];
        assert!(interp.run_block(&mut scope, "", &lines, &[]).await.unwrap());
        assert!(!interp.run_block(&mut scope, "f", &lines, &["f".to_string()]).await.unwrap());
        assert_eq!(scope.depth(), 1);
    }

    #[tokio::test]
    async fn nested_stops_on_interrupt() {
        let (interp, out) = buffered();
        interp.interrupt_flag().set();
        let mut scope = interp.new_scope();
        let lines = vec!["echo one".to_string(), "echo two".to_string()];
        let stop = interp.run_block(&mut scope, "", &lines, &[]).await.unwrap();
        assert!(stop);
        assert_eq!(out.contents(), "one\n");
    }

    #[tokio::test]
    async fn top_level_clears_interrupt() {
        let (interp, out) = buffered();
        interp.interrupt_flag().set();
        run(&interp, "echo one\necho two").await;
        assert_eq!(out.contents(), "one\ntwo\n");
        assert!(!interp.interrupted());
    }

    #[tokio::test]
    async fn one_cmd_reports_stop() {
        let (interp, out) = buffered();
        assert!(!interp.one_cmd("echo hi").await);
        assert!(interp.one_cmd("exit").await);
        assert_eq!(out.contents(), "hi\n");
    }

    #[tokio::test]
    async fn timing_prints_elapsed() {
        let (interp, out) = buffered();
        run(&interp, "var -g timing true\necho x").await;
        let text = out.contents();
        assert!(text.contains("x\nElapsed: "), "{text}");
    }

    #[test]
    fn prompt_is_truncated() {
        let interp = Interpreter::builder()
            .config(InterpreterConfig::default().with_max_prompt_len(8))
            .build();
        interp.set_prompt("a-long-prompt> ");
        assert_eq!(interp.prompt(), "a-lon...");
    }

    #[test]
    fn commands_can_be_replaced() {
        let interp = Interpreter::new();
        assert!(interp.command("echo").is_some());
        interp.add_command(Command::sync("echo", "silenced", |_, _| Ok(false)));
        assert_eq!(interp.command("echo").map(|c| c.help), Some("silenced".to_string()));
        assert!(interp.remove_command("echo").is_some());
        assert!(interp.command("echo").is_none());
    }

    #[test]
    fn functions_table() {
        let interp = Interpreter::new();
        interp.define_function("f", vec!["echo hi".into()]);
        assert_eq!(interp.function_names(), vec!["f"]);
        assert_eq!(interp.function("f").unwrap().as_ref(), ["echo hi".to_string()]);
        assert!(interp.delete_function("f"));
        assert!(!interp.delete_function("f"));
    }
}
