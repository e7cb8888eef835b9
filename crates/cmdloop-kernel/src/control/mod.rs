//! Control flow: functions, variables, conditionals, loops, expressions.
//!
//! Installed as a [`Plugin`] so the core dispatch loop stays usable without
//! it. Installation wraps three chains that already exist on the builder:
//!
//! - dispatch: [`FunctionDispatcher`] expands variables, rewrites `@file`
//!   into `load file`, and runs user functions before the registry sees the
//!   line
//! - help: [`FunctionHelp`] appends user functions to the command listing
//! - interrupts: [`LoopAwarePolicy`] keeps the process alive when ctrl-c
//!   arrives inside a loop, so only the loop ends

mod cond;
mod expr;
mod function;
mod load;
mod loops;
mod sleep;
mod var;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

pub use sleep::{parse_duration, sleep_interruptible};

use crate::args::split_args;
use crate::command::{Command, CommandHandler, ExecContext};
use crate::dispatch::{split_command, DispatchChain, Dispatcher};
use crate::error::InterpResult;
use crate::expand::{can_expand, expand};
use crate::interpreter::{InterpreterBuilder, Plugin};
use crate::interrupt::{InterruptPolicy, Signal};

/// The control-flow plugin.
#[derive(Debug, Default)]
pub struct ControlFlow {
    loops: Arc<AtomicUsize>,
}

impl Plugin for ControlFlow {
    fn install(self: Box<Self>, builder: &mut InterpreterBuilder) {
        let loops = self.loops;

        builder.add_command(Command::new("function", "function [name [--delete|body]]", function::Function));
        let var = Command::new(
            "var",
            "var [-g|--global|-p|--parent|--return] [-r|--remove|-u|--unset] name[=value] | name value",
            var::Var,
        );
        builder.add_command(var.alias("set"));
        builder.add_command(var);
        builder.add_command(Command::new("shift", "shift [n]", var::Shift));
        builder.add_command(Command::new("if", "if [!](condition) command [else command]", cond::If));
        builder.add_command(Command::new("expr", "expr operator operands...", expr::Expr));
        builder.add_command(Command::new(
            "repeat",
            "repeat [--count=n] [--wait=duration] command",
            loops::Repeat::new(loops.clone()),
        ));
        builder.add_command(Command::new(
            "foreach",
            "foreach [--wait=duration] (items...) command",
            loops::Foreach::new(loops.clone()),
        ));
        builder.add_command(Command::new("load", "load script-file", load::Load));
        builder.add_command(Command::new("sleep", "sleep duration", sleep::Sleep));
        builder.add_command(Command::new("stop", "stop function or block", load::Stop));

        let help = builder.command("help").cloned();
        let usage = help.as_ref().map(|h| h.help.clone()).unwrap_or_else(|| "help [command]".into());
        builder.add_command(Command::new("help", usage, FunctionHelp { next: help }));

        builder.wrap_dispatcher(|next| Arc::new(FunctionDispatcher { next }));
        builder.wrap_interrupt_policy(|next| Arc::new(LoopAwarePolicy { next, loops }));
    }
}

/// Dispatch link for user functions.
pub struct FunctionDispatcher {
    next: DispatchChain,
}

impl FunctionDispatcher {
    /// Wrap the rest of the chain.
    pub fn new(next: DispatchChain) -> Self {
        Self { next }
    }
}

#[async_trait]
impl Dispatcher for FunctionDispatcher {
    async fn dispatch(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let line = if can_expand(line) {
            expand(line, ctx.scope)
        } else {
            line.to_string()
        };

        if let Some(path) = line.strip_prefix('@') {
            return self.next.dispatch(ctx, &format!("load {}", path.trim())).await;
        }

        let (name, rest) = split_command(&line);
        if let Some(body) = ctx.interp.function(name) {
            if ctx.setting("echo") {
                ctx.println(format_args!("{}{}", ctx.interp.prompt(), line));
            }

            let mut args = vec![name.to_string()];
            args.extend(split_args(rest));
            tracing::debug!(function = %name, args = args.len() - 1, "call function");
            return ctx.run_block(name, &body, &args).await;
        }

        self.next.dispatch(ctx, &line).await
    }
}

/// `help` that also knows about user functions.
pub struct FunctionHelp {
    next: Option<Command>,
}

#[async_trait]
impl CommandHandler for FunctionHelp {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let topic = line.trim();
        if !topic.is_empty() && ctx.interp.function(topic).is_some() {
            ctx.println(format_args!("{topic} is a function"));
            return Ok(false);
        }

        let stop = match &self.next {
            Some(help) => help.call(ctx, line).await?,
            None => false,
        };

        let names = ctx.interp.function_names();
        if topic.is_empty() && !names.is_empty() {
            ctx.println("");
            ctx.println("Available functions:");
            ctx.println("=".repeat(64));
            ctx.println(names.join("  "));
        }
        Ok(stop)
    }
}

/// Interrupt policy link: an interrupt inside a loop never terminates.
pub struct LoopAwarePolicy {
    next: Arc<dyn InterruptPolicy>,
    loops: Arc<AtomicUsize>,
}

impl InterruptPolicy for LoopAwarePolicy {
    fn on_signal(&self, signal: Signal) -> bool {
        if signal == Signal::Interrupt && self.loops.load(Ordering::SeqCst) > 0 {
            return false;
        }
        self.next.on_signal(signal)
    }
}

/// Counts a running loop for as long as it lives.
struct LoopGuard(Arc<AtomicUsize>);

impl LoopGuard {
    fn enter(loops: &Arc<AtomicUsize>) -> Self {
        loops.fetch_add(1, Ordering::SeqCst);
        Self(loops.clone())
    }
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
