//! cmdloop-kernel: an embeddable, line-oriented command interpreter.
//!
//! This crate provides:
//!
//! - **Scope**: a stack of variable frames over a shared global frame
//! - **Line sources**: in-memory scripts, async readers, interactive editors
//! - **Block reader**: brace-delimited bodies with an optional `else` block
//! - **Expansion**: `$name`, `$(name)`, `$(env.NAME)`, `$*`, `$#`, `$$`
//! - **Interpreter**: the re-entrant dispatch loop, command and function tables
//! - **Control flow**: `function`, `var`, `if`, `repeat`, `foreach`, `expr`, `load`
//! - **Concurrency**: `go` tasks behind an admission barrier, signal-driven interrupts

pub mod admission;
pub mod args;
pub mod block;
pub mod builtins;
pub mod command;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod expand;
pub mod hooks;
pub mod interpreter;
pub mod interrupt;
pub mod output;
pub mod scope;
pub mod source;
pub mod terminal;
pub mod value;

pub use admission::AdmissionBarrier;
pub use block::{read_block, Block};
pub use command::{Command, CommandHandler, ExecContext};
pub use config::InterpreterConfig;
pub use control::ControlFlow;
pub use dispatch::{DispatchChain, Dispatcher};
pub use error::{InterpError, InterpResult};
pub use expand::{can_expand, expand};
pub use hooks::{DefaultHooks, Hooks};
pub use interpreter::{Interpreter, InterpreterBuilder, Mode, Plugin};
pub use interrupt::{InterruptFlag, InterruptPolicy, Resume, Signal, Terminate};
pub use output::{Output, SharedBuffer, Sink};
pub use scope::{Scope, Target};
pub use source::{read_logical_line, LineBuffer, LineSource, ReaderSource};
pub use terminal::TerminalMode;
