//! cmdloop CLI entry point.
//!
//! Usage:
//!   cmdloop                    # Interactive REPL
//!   cmdloop <command...>       # Run a command, then the REPL unless it stops
//!   cmdloop < script.cmd       # Run commands from stdin

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cmdloop_kernel::{Interpreter, InterpreterConfig};

const HISTORY_FILE: &str = ".cmdloop_history";

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut config = InterpreterConfig::named("cmdloop").with_history_file(HISTORY_FILE);

    while let Some(first) = args.first() {
        match first.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-V" => {
                println!(
                    "cmdloop {} ({} {})",
                    env!("CARGO_PKG_VERSION"),
                    env!("CMDLOOP_GIT_HASH"),
                    env!("CMDLOOP_BUILD_DATE")
                );
                return Ok(ExitCode::SUCCESS);
            }
            "--shell" => config = config.with_shell(true),
            "--no-history" => config.history_file = None,
            "--" => {
                args.remove(0);
                break;
            }
            _ => break,
        }
        args.remove(0);
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    rt.block_on(async {
        let interp = Interpreter::builder().config(config).build();
        cmdloop_repl::run(interp, &args).await
    })?;

    Ok(ExitCode::SUCCESS)
}

fn print_help() {
    println!(
        r#"cmdloop v{}

Usage:
  cmdloop [OPTIONS] [COMMAND...]

Arguments are joined into one command line and run before the prompt
appears. If that command stops (for example `exit`), cmdloop exits.

Options:
  --shell                      Allow `!cmd` shell escapes
  --no-history                 Do not read or write the history file
  -h, --help                   Show this help
  -V, --version                Show version

Examples:
  cmdloop                      # Start interactive REPL
  cmdloop load setup.cmd       # Run a script, then the REPL
  echo 'echo hi' | cmdloop     # Read commands from stdin
"#,
        env!("CARGO_PKG_VERSION")
    );
}
