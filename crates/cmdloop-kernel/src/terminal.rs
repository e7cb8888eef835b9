//! Terminal mode snapshots.
//!
//! A command that crashes out of raw mode (or a signal arriving while the
//! line editor owns the terminal) must not leave the user's terminal broken.
//! The dispatch loop captures the mode before each interactive command and
//! puts it back afterwards; the signal listener restores the mode captured
//! at startup.

/// A saved terminal mode for standard input.
///
/// Empty when stdin is not a terminal or the platform has no termios.
#[derive(Clone, Default)]
pub struct TerminalMode {
    #[cfg(unix)]
    termios: Option<nix::sys::termios::Termios>,
}

impl TerminalMode {
    /// Snapshot the current mode of stdin.
    #[cfg(unix)]
    pub fn capture() -> Self {
        let termios = match nix::sys::termios::tcgetattr(std::io::stdin()) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::trace!("no terminal mode to capture: {e}");
                None
            }
        };
        Self { termios }
    }

    #[cfg(not(unix))]
    pub fn capture() -> Self {
        Self::default()
    }

    /// Whether anything was captured.
    pub fn is_captured(&self) -> bool {
        #[cfg(unix)]
        {
            self.termios.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Apply the snapshot to stdin again.
    pub fn restore(&self) {
        #[cfg(unix)]
        if let Some(termios) = &self.termios {
            use nix::sys::termios::{tcsetattr, SetArg};
            if let Err(e) = tcsetattr(std::io::stdin(), SetArg::TCSANOW, termios) {
                tracing::debug!("failed to restore terminal mode: {e}");
            }
        }
    }
}

impl std::fmt::Debug for TerminalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalMode")
            .field("captured", &self.is_captured())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_without_capture_is_harmless() {
        let mode = TerminalMode::default();
        assert!(!mode.is_captured());
        mode.restore();
    }

    #[test]
    fn capture_and_restore_never_fail() {
        // Under a test harness stdin is usually not a tty; either way this must not fail.
        let mode = TerminalMode::capture();
        mode.restore();
    }
}
