//! Cooperative interruption.
//!
//! Signals never preempt anything. A background task turns SIGINT/SIGTERM
//! into a flag that the dispatch loop, loops, and sleeps poll at their check
//! points. What else happens on a signal (exit, or keep going) is decided by
//! an [`InterruptPolicy`] chain so tests can set the flag directly and
//! embedders can swap the behavior.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use crate::terminal::TerminalMode;

/// Process-wide "please stop" flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<Mutex<bool>>);

impl InterruptFlag {
    /// Create a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn set(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    /// Lower the flag.
    pub fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Whether the flag is raised.
    pub fn is_set(&self) -> bool {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Signals the listener reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT / ctrl-c.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl Signal {
    /// Conventional signal number.
    pub fn number(self) -> i32 {
        match self {
            Signal::Interrupt => 2,
            Signal::Terminate => 15,
        }
    }

    /// Shell-style exit status for dying from this signal.
    pub fn exit_code(self) -> i32 {
        128 + self.number()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "interrupt"),
            Signal::Terminate => write!(f, "terminate"),
        }
    }
}

/// Decides whether a received signal ends the process.
///
/// Policies compose as a chain: a wrapper handles the cases it cares about
/// and defers the rest to the policy it holds.
pub trait InterruptPolicy: Send + Sync {
    /// Return true to terminate the process, false to keep running with the
    /// flag set.
    fn on_signal(&self, signal: Signal) -> bool;
}

/// Always terminate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminate;

impl InterruptPolicy for Terminate {
    fn on_signal(&self, _signal: Signal) -> bool {
        true
    }
}

/// Never terminate; scripts observe the flag and unwind on their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resume;

impl InterruptPolicy for Resume {
    fn on_signal(&self, _signal: Signal) -> bool {
        false
    }
}

/// Start the background task that feeds OS signals into `flag`.
///
/// On each signal the flag is raised, `mode` is put back on the terminal,
/// and `policy` decides between exiting with `128 + signo` and listening on.
pub fn spawn_signal_listener(
    flag: InterruptFlag,
    policy: Arc<dyn InterruptPolicy>,
    mode: TerminalMode,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut signals = match SignalStream::new() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("cannot install signal handlers: {e}");
                return;
            }
        };

        while let Some(signal) = signals.recv().await {
            tracing::debug!(%signal, "signal received");
            flag.set();
            mode.restore();

            if policy.on_signal(signal) {
                tracing::info!(%signal, "terminating");
                std::process::exit(signal.exit_code());
            }
        }
    })
}

#[cfg(unix)]
struct SignalStream {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalStream {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> Option<Signal> {
        tokio::select! {
            s = self.interrupt.recv() => s.map(|_| Signal::Interrupt),
            s = self.terminate.recv() => s.map(|_| Signal::Terminate),
        }
    }
}

#[cfg(not(unix))]
struct SignalStream;

#[cfg(not(unix))]
impl SignalStream {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<Signal> {
        tokio::signal::ctrl_c().await.ok().map(|_| Signal::Interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_set_and_clear() {
        let flag = InterruptFlag::new();
        assert!(!flag.is_set());
        let shared = flag.clone();
        shared.set();
        assert!(flag.is_set());
        flag.clear();
        assert!(!shared.is_set());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Signal::Interrupt.exit_code(), 130);
        assert_eq!(Signal::Terminate.exit_code(), 143);
    }

    #[test]
    fn basic_policies() {
        assert!(Terminate.on_signal(Signal::Interrupt));
        assert!(!Resume.on_signal(Signal::Terminate));
    }
}
