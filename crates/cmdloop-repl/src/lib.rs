//! cmdloop REPL: an interactive front end for the cmdloop interpreter.
//!
//! This crate handles:
//! - Line editing and history via rustyline
//! - Tab completion of commands, functions and variables
//! - Dispatching command-line arguments before the interactive loop

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use tokio::io::BufReader;
use tokio::sync::oneshot;

use cmdloop_kernel::{Interpreter, LineSource, ReaderSource};

/// Commands whose arguments are variable names.
const VAR_COMMANDS: &[&str] = &["var", "set"];

// ============================================================================
// Completion
// ============================================================================

/// Completion candidates for the text before the cursor.
///
/// Returns the byte offset where the completed word starts and the
/// replacements, sorted and without duplicates.
pub fn complete_line(interp: &Interpreter, line: &str) -> (usize, Vec<String>) {
    let start = line.rfind(char::is_whitespace).map_or(0, |i| i + 1);
    let word = &line[start..];

    let mut candidates: Vec<String> = if let Some(prefix) = word.strip_prefix('$') {
        variable_names(interp)
            .into_iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| format!("${name}"))
            .collect()
    } else if line[..start].trim().is_empty() {
        interp
            .command_names()
            .into_iter()
            .chain(interp.function_names())
            .filter(|name| name.starts_with(word))
            .collect()
    } else {
        let first = line.split_whitespace().next().unwrap_or_default();
        if VAR_COMMANDS.contains(&first) && !word.starts_with('-') {
            variable_names(interp)
                .into_iter()
                .filter(|name| name.starts_with(word))
                .collect()
        } else {
            Vec::new()
        }
    };

    candidates.sort();
    candidates.dedup();
    (start, candidates)
}

/// Names of variables worth offering: positional and status names are skipped.
fn variable_names(interp: &Interpreter) -> Vec<String> {
    interp
        .new_scope()
        .names()
        .into_iter()
        .filter(|name| name.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_'))
        .collect()
}

/// rustyline helper: completion only, no hints or highlighting.
#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CmdHelper {
    interp: Interpreter,
    files: FilenameCompleter,
}

impl CmdHelper {
    pub fn new(interp: Interpreter) -> Self {
        Self {
            interp,
            files: FilenameCompleter::new(),
        }
    }
}

impl Completer for CmdHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let before = &line[..pos];
        let first = before.split_whitespace().next().unwrap_or_default();

        // Script paths for `load` and `@file`.
        if (first == "load" && before.len() > first.len()) || (before.starts_with('@') && !before.contains(' ')) {
            let (start, pairs) = self.files.complete(line, pos, ctx)?;
            let start = if before.starts_with('@') { start.max(1) } else { start };
            return Ok((start, pairs));
        }

        let (start, words) = complete_line(&self.interp, before);
        let pairs = words
            .into_iter()
            .map(|word| Pair {
                display: word.clone(),
                replacement: word,
            })
            .collect();
        Ok((start, pairs))
    }
}

// ============================================================================
// History file
// ============================================================================

/// Where the history file lives.
///
/// Absolute paths are used as given. A relative path is used from `cwd` if
/// such a file already exists there, otherwise it goes under `home`.
pub fn resolve_history_path(path: &Path, cwd: &Path, home: Option<&Path>) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let local = cwd.join(path);
    if local.exists() {
        return local;
    }
    match home {
        Some(home) => home.join(path),
        None => local,
    }
}

/// History location for `interp`, or `None` when history is disabled.
fn history_path(interp: &Interpreter) -> Option<PathBuf> {
    let configured = interp.config().history_file.as_deref()?;
    let cwd = std::env::current_dir().unwrap_or_default();
    let dirs = directories::BaseDirs::new();
    Some(resolve_history_path(
        configured,
        &cwd,
        dirs.as_ref().map(|d| d.home_dir()),
    ))
}

/// Load history from disk, creating an empty file on first run.
fn load_history(rl: &mut Editor<CmdHelper, DefaultHistory>, path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create history directory: {}", e);
        }
    }
    if !path.exists() {
        if let Err(e) = std::fs::File::create(path) {
            tracing::warn!("Failed to create history file: {}", e);
        }
        return;
    }
    if let Err(e) = rl.load_history(path) {
        tracing::warn!("Failed to load history: {}", e);
    }
}

/// Save REPL history to disk.
fn save_history(rl: &mut Editor<CmdHelper, DefaultHistory>, path: &Option<PathBuf>) {
    if let Some(path) = path {
        if let Err(e) = rl.save_history(path) {
            tracing::warn!("Failed to save history: {}", e);
        } else {
            tracing::debug!(path = %path.display(), "history saved");
        }
    }
}

// ============================================================================
// Editor line source
// ============================================================================

enum Reply {
    Line(String),
    Interrupted,
    Eof,
    Failed(io::Error),
}

enum Request {
    ReadLine {
        prompt: String,
        reply: oneshot::Sender<Reply>,
    },
    AddHistory(String),
}

/// Interactive line source backed by rustyline.
///
/// The editor blocks while it waits for keys, so it lives on its own thread
/// and the dispatch loop talks to it over a channel. History is written
/// when the source is dropped.
pub struct EditorSource {
    requests: Option<mpsc::Sender<Request>>,
    thread: Option<JoinHandle<()>>,
}

impl EditorSource {
    pub fn new(interp: Interpreter) -> Result<Self> {
        let history = history_path(&interp);
        let (requests, inbox) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread = std::thread::Builder::new()
            .name("cmdloop-editor".to_string())
            .spawn(move || {
                let mut rl: Editor<CmdHelper, DefaultHistory> = match Editor::new() {
                    Ok(rl) => rl,
                    Err(e) => {
                        let _ = ready_tx.send(Err(anyhow::anyhow!("Failed to create editor: {e}")));
                        return;
                    }
                };
                rl.set_helper(Some(CmdHelper::new(interp)));
                if let Some(path) = &history {
                    load_history(&mut rl, path);
                }
                let _ = ready_tx.send(Ok(()));

                editor_thread(&mut rl, inbox);
                save_history(&mut rl, &history);
            })
            .context("Failed to start editor thread")?;

        ready_rx.recv().context("Editor thread exited during startup")??;

        Ok(Self {
            requests: Some(requests),
            thread: Some(thread),
        })
    }

    fn send(&self, request: Request) -> io::Result<()> {
        self.requests
            .as_ref()
            .and_then(|tx| tx.send(request).ok())
            .ok_or_else(|| io::Error::other("line editor has shut down"))
    }
}

fn editor_thread(rl: &mut Editor<CmdHelper, DefaultHistory>, inbox: mpsc::Receiver<Request>) {
    while let Ok(request) = inbox.recv() {
        match request {
            Request::ReadLine { prompt, reply } => {
                let result = match rl.readline(&prompt) {
                    Ok(line) => Reply::Line(line),
                    Err(ReadlineError::Interrupted) => Reply::Interrupted,
                    Err(ReadlineError::Eof) => Reply::Eof,
                    Err(ReadlineError::Io(e)) => Reply::Failed(e),
                    Err(e) => Reply::Failed(io::Error::other(e.to_string())),
                };
                let _ = reply.send(result);
            }
            Request::AddHistory(line) => {
                if let Err(e) = rl.add_history_entry(line.as_str()) {
                    tracing::warn!("Failed to add history entry: {}", e);
                }
            }
        }
    }
}

#[async_trait]
impl LineSource for EditorSource {
    async fn next_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let (reply, response) = oneshot::channel();
        self.send(Request::ReadLine {
            prompt: prompt.to_string(),
            reply,
        })?;

        match response.await {
            Ok(Reply::Line(line)) => Ok(Some(line)),
            Ok(Reply::Interrupted) => {
                println!("^C");
                Ok(Some(String::new()))
            }
            Ok(Reply::Eof) => {
                println!("^D");
                Ok(None)
            }
            Ok(Reply::Failed(e)) => Err(e),
            Err(_) => Err(io::Error::other("line editor has shut down")),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.send(Request::AddHistory(line.to_string())) {
            tracing::debug!("history entry dropped: {e}");
        }
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

impl Drop for EditorSource {
    fn drop(&mut self) {
        // Closing the channel lets the thread save history and exit.
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("editor thread panicked");
            }
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Dispatch the joined command-line arguments once. Returns whether the
/// command asked to stop.
pub async fn run_args(interp: &Interpreter, args: &[String]) -> bool {
    if args.is_empty() {
        return false;
    }
    let line = args.join(" ");
    tracing::debug!(%line, "running command-line arguments");
    interp.one_cmd(&line).await
}

/// Run the REPL: command-line arguments first, then the interactive loop.
///
/// Reads from the line editor when stdin is a terminal and from plain stdin
/// otherwise, so scripts can be piped in.
pub async fn run(interp: Interpreter, args: &[String]) -> Result<()> {
    if run_args(&interp, args).await {
        return Ok(());
    }

    let _signals = interp.spawn_signal_listener();

    if io::stdin().is_terminal() {
        let mut source = EditorSource::new(interp.clone())?;
        interp.cmd_loop(&mut source).await;
    } else {
        let mut source = ReaderSource::new(BufReader::new(tokio::io::stdin()));
        interp.cmd_loop(&mut source).await;
    }

    Ok(())
}
