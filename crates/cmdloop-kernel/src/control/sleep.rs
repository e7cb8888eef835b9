//! sleep — Pause, waking early on interrupt.

use std::time::Duration;

use async_trait::async_trait;

use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::interpreter::Interpreter;

const SLICE: Duration = Duration::from_millis(100);

/// Sleep command.
pub struct Sleep;

#[async_trait]
impl CommandHandler for Sleep {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let arg = line.trim();
        if arg.is_empty() {
            return Err(InterpError::usage("missing duration"));
        }
        let duration = parse_duration(arg)?;
        sleep_interruptible(ctx.interp, duration).await;
        Ok(false)
    }
}

/// Parse a duration: a plain number is seconds, otherwise a number with one
/// of the suffixes `ms`, `s`, `m`, `h`, `d`.
pub fn parse_duration(s: &str) -> InterpResult<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(InterpError::usage("missing duration"));
    }

    let (num, multiplier) = if let Some(rest) = s.strip_suffix("ms") {
        (rest, 0.001)
    } else if let Some(rest) = s.strip_suffix('s') {
        (rest, 1.0)
    } else if let Some(rest) = s.strip_suffix('m') {
        (rest, 60.0)
    } else if let Some(rest) = s.strip_suffix('h') {
        (rest, 3600.0)
    } else if let Some(rest) = s.strip_suffix('d') {
        (rest, 86400.0)
    } else {
        (s, 1.0)
    };

    let seconds = num
        .parse::<f64>()
        .map(|n| n * multiplier)
        .map_err(|_| InterpError::usage(format!("invalid duration {s:?}")))?;

    Duration::try_from_secs_f64(seconds).map_err(|_| InterpError::usage(format!("invalid duration {s:?}")))
}

/// Sleep in short slices, returning early once the interrupt flag is set.
///
/// Returns `false` if the sleep was cut short.
pub async fn sleep_interruptible(interp: &Interpreter, duration: Duration) -> bool {
    let mut left = duration;
    while !left.is_zero() {
        if interp.interrupted() {
            return false;
        }
        let step = left.min(SLICE);
        tokio::time::sleep(step).await;
        left -= step;
    }
    !interp.interrupted()
}
