//! time — Timestamps and elapsed time.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::scope::Target;

/// Time command.
///
/// `time` prints the current time (RFC 3339) and stores it in `time`.
/// `time <timestamp>` prints the time elapsed since then and stores it in
/// `elapsed`.
pub struct Time;

#[async_trait]
impl CommandHandler for Time {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let now = Utc::now();
        let start = line.trim();

        if start.is_empty() {
            let stamp = now.to_rfc3339_opts(SecondsFormat::Nanos, true);
            ctx.println(&stamp);
            ctx.scope.set("time", stamp, Target::Local);
            return Ok(false);
        }

        let since = DateTime::parse_from_rfc3339(start)
            .map_err(|e| InterpError::usage(format!("invalid time {start:?}: {e}")))?;
        let elapsed = format_elapsed(now.signed_duration_since(since));
        ctx.println(&elapsed);
        ctx.scope.set("elapsed", elapsed, Target::Local);
        Ok(false)
    }
}

/// Render a duration the way `Duration`'s debug output does (`1.5s`, `250ms`).
/// Timestamps in the future count as zero.
fn format_elapsed(delta: chrono::TimeDelta) -> String {
    format!("{:?}", delta.to_std().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use crate::Interpreter;

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(chrono::TimeDelta::milliseconds(1500)), "1.5s");
        assert_eq!(format_elapsed(chrono::TimeDelta::milliseconds(-5)), "0ns");
    }

    #[tokio::test]
    async fn stores_time_and_elapsed() {
        let (output, buf) = Output::buffered();
        let interp = Interpreter::builder().output(output).build();

        interp.one_cmd("time").await;
        let stamp = buf.take();
        let stamp = stamp.trim();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok(), "{stamp}");

        interp.one_cmd(&format!("time {stamp}")).await;
        assert!(buf.contents().trim().ends_with('s'));
    }

    #[tokio::test]
    async fn bad_timestamp_is_usage_error() {
        let (output, buf) = Output::buffered();
        let interp = Interpreter::builder().output(output).build();
        interp.one_cmd("time yesterday").await;
        assert!(buf.contents().starts_with("invalid time \"yesterday\""));
    }
}
