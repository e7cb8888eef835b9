//! Built-in commands.
//!
//! These are always available, with or without the control-flow plugin.

mod echo;
mod exit;
mod go;
mod help;
mod output;
mod time;

pub use help::Help;

use crate::command::Command;
use crate::interpreter::InterpreterBuilder;

/// Register all built-in commands with the builder.
pub fn register(builder: &mut InterpreterBuilder) {
    builder.add_command(Command::new("echo", "echo [-n] text", echo::Echo));
    builder.add_command(Command::new("exit", "exit", exit::Exit));
    builder.add_command(Command::new("go", "go [--start [n]|--wait] command", go::Go));
    builder.add_command(Command::new("help", "help [command]", help::Help));
    builder.add_command(Command::new("output", "output [path|stdout|stderr|-]", output::OutputCmd));
    builder.add_command(Command::new("time", "time [start-time]", time::Time));
}
