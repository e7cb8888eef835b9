//! repeat, foreach — Loops with an optional wait between iterations.
//!
//! Both push one frame for the whole loop and set `count` there. Each
//! iteration sets `index` (and `item` for `foreach`) in that frame before
//! running the body as an unnamed block. A `stop` from the body or an
//! interrupt ends the loop without ending the caller.

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::sleep::{parse_duration, sleep_interruptible};
use super::LoopGuard;
use crate::args::{split_args, split_args_n};
use crate::command::{CommandHandler, ExecContext};
use crate::error::{InterpError, InterpResult};
use crate::expand::expand;
use crate::scope::Target;
use crate::value::parse_int;

/// Options accepted before a loop body.
#[derive(Debug, Default, PartialEq)]
struct LoopOptions {
    count: Option<i64>,
    wait: Duration,
}

/// Parse leading `--count=N`, `--wait=D` and `--`. Option values are
/// expanded here because loop lines reach the handler unexpanded.
fn parse_options<'a>(
    ctx: &ExecContext<'_>,
    mut line: &'a str,
    allow_count: bool,
) -> InterpResult<(LoopOptions, &'a str)> {
    let mut options = LoopOptions::default();

    while line.starts_with('-') {
        let Some((arg, rest)) = line.split_once(char::is_whitespace) else {
            return Err(InterpError::usage("missing command"));
        };
        line = rest.trim_start();

        if arg == "--" {
            break;
        }

        let arg = expand(arg, ctx.scope);
        if let Some(value) = arg.strip_prefix("--count=").filter(|_| allow_count) {
            let count = parse_int(value).ok_or_else(|| InterpError::usage(format!("invalid count {value:?}")))?;
            options.count = Some(count);
        } else if let Some(value) = arg.strip_prefix("--wait=") {
            options.wait = parse_wait(value)?;
        } else {
            return Err(InterpError::usage(format!("invalid option {arg}")));
        }
    }

    Ok((options, line))
}

/// A bare integer is seconds; anything else is a duration like `250ms`.
fn parse_wait(value: &str) -> InterpResult<Duration> {
    match value.trim().parse::<u64>() {
        Ok(seconds) => Ok(Duration::from_secs(seconds)),
        Err(_) => parse_duration(value),
    }
}

/// Iteration indexes for `repeat --count=n`: `1..=n`, or `|n|` down to 1
/// when `n` is negative.
fn repeat_indexes(count: i64) -> Box<dyn Iterator<Item = i64> + Send> {
    if count >= 0 {
        Box::new(1..=count)
    } else {
        Box::new((1..=count.unsigned_abs().min(i64::MAX as u64) as i64).rev())
    }
}

/// Items for `foreach`: a JSON array, `[a b c]`, `(a b c)` or bare words.
fn parse_list(text: &str) -> Vec<String> {
    let words = if let Some(inner) = text.strip_prefix('[') {
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(text) {
            return items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
        }
        inner.strip_suffix(']').unwrap_or(inner)
    } else if let Some(inner) = text.strip_prefix('(') {
        inner.strip_suffix(')').unwrap_or(inner)
    } else {
        text
    };
    split_args(words)
}

/// Shared loop driver. Returns `Ok(false)` whatever ended the loop, except a
/// syntax error in the body which is passed up.
async fn run_loop<I>(
    ctx: &mut ExecContext<'_>,
    loops: &Arc<AtomicUsize>,
    count: String,
    wait: Duration,
    body: &[String],
    iterations: I,
) -> InterpResult<bool>
where
    I: Iterator<Item = Vec<(&'static str, String)>> + Send,
{
    let _guard = LoopGuard::enter(loops);
    ctx.scope.push(&[("count", count.as_str())], &[]);

    let mut result = Ok(false);
    for (i, vars) in iterations.enumerate() {
        if i > 0 && !wait.is_zero() && !sleep_interruptible(ctx.interp, wait).await {
            break;
        }

        for (name, value) in vars {
            ctx.scope.set(name, value, Target::Local);
        }

        match ctx.run_block("", body, &[]).await {
            Ok(stop) => {
                if stop || ctx.interrupted() {
                    tracing::debug!(iteration = i, stop, "loop ended early");
                    break;
                }
            }
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }

    ctx.scope.pop();
    result
}

/// Repeat command.
pub struct Repeat {
    loops: Arc<AtomicUsize>,
}

impl Repeat {
    pub fn new(loops: Arc<AtomicUsize>) -> Self {
        Self { loops }
    }
}

#[async_trait]
impl CommandHandler for Repeat {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let (options, rest) = parse_options(ctx, line.trim(), true)?;
        if rest.is_empty() {
            return Err(InterpError::usage("nothing to repeat"));
        }

        let block = ctx.read_block(rest, None).await?;
        let count = options.count.unwrap_or(i64::MAX);
        let iterations = repeat_indexes(count).map(|index| vec![("index", index.to_string())]);

        run_loop(ctx, &self.loops, count.to_string(), options.wait, &block.main, iterations).await
    }
}

/// Foreach command.
pub struct Foreach {
    loops: Arc<AtomicUsize>,
}

impl Foreach {
    pub fn new(loops: Arc<AtomicUsize>) -> Self {
        Self { loops }
    }
}

#[async_trait]
impl CommandHandler for Foreach {
    async fn call(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        let (options, rest) = parse_options(ctx, line.trim(), false)?;

        let parts = split_args_n(rest, 2);
        let [list, body] = parts.as_slice() else {
            return Err(InterpError::usage("missing argument(s)"));
        };

        let items = parse_list(&expand(list, ctx.scope));
        let block = ctx.read_block(body, None).await?;
        let count = items.len().to_string();
        let iterations = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| vec![("index", index.to_string()), ("item", item)]);

        run_loop(ctx, &self.loops, count, options.wait, &block.main, iterations).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::output::{Output, SharedBuffer};
    use crate::source::LineBuffer;
    use crate::{Interpreter, Mode};
    use rstest::rstest;
    use std::time::Instant;

    fn interp() -> (Interpreter, SharedBuffer) {
        let (output, buf) = Output::buffered();
        (Interpreter::builder().output(output).build(), buf)
    }

    async fn run(interp: &Interpreter, script: &str) -> bool {
        let mut source = LineBuffer::from_script(script);
        let mut scope = interp.new_scope();
        let stop = interp.execute(&mut source, &mut scope, Mode::TopLevel).await;
        assert_eq!(scope.depth(), 1, "loop frames must be popped");
        stop
    }

    #[rstest]
    #[case(3, vec![1, 2, 3])]
    #[case(0, vec![])]
    #[case(-3, vec![3, 2, 1])]
    fn indexes(#[case] count: i64, #[case] expected: Vec<i64>) {
        assert_eq!(repeat_indexes(count).collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case("(a b c)", &["a", "b", "c"])]
    #[case("a b", &["a", "b"])]
    #[case(r#"["x y", 1, true]"#, &["x y", "1", "true"])]
    #[case("[a b]", &["a", "b"])]
    #[case(r#"("a b" c)"#, &["a b", "c"])]
    #[case("()", &[])]
    fn lists(#[case] text: &str, #[case] expected: &[&str]) {
        assert_eq!(parse_list(text), expected);
    }

    #[rstest]
    #[case("2", 2_000)]
    #[case("250ms", 250)]
    #[case("1.5s", 1_500)]
    fn waits(#[case] text: &str, #[case] millis: u128) {
        assert_eq!(parse_wait(text).unwrap().as_millis(), millis);
    }

    #[tokio::test]
    async fn repeat_counts() {
        let (interp, buf) = interp();
        run(&interp, "repeat --count=3 echo $index of $count").await;
        assert_eq!(buf.contents(), "1 of 3\n2 of 3\n3 of 3\n");
    }

    #[tokio::test]
    async fn repeat_count_from_variable() {
        let (interp, buf) = interp();
        run(&interp, "var n 2\nrepeat --count=$n {\n  echo tick $index\n}\n").await;
        assert_eq!(buf.contents(), "tick 1\ntick 2\n");
    }

    #[tokio::test]
    async fn repeat_stop_ends_loop_only() {
        let (interp, buf) = interp();
        let stopped = run(&interp, "repeat {\n  echo $index\n  if (eq# $index 2) stop\n}\necho done\n").await;
        assert!(!stopped);
        assert_eq!(buf.contents(), "1\n2\ndone\n");
    }

    #[tokio::test]
    async fn repeat_option_errors() {
        let (interp, buf) = interp();
        run(&interp, "repeat --count=x echo\nrepeat --bogus echo\nrepeat --count=1\n").await;
        assert_eq!(
            buf.contents(),
            "invalid count \"x\"\ninvalid option --bogus\nmissing command\n"
        );
    }

    #[tokio::test]
    async fn repeat_waits_between_iterations() {
        let (interp, _buf) = interp();
        let start = Instant::now();
        run(&interp, "repeat --count=3 --wait=50ms var -p last $index").await;
        assert!(start.elapsed() >= Duration::from_millis(90));
    }

    #[tokio::test]
    async fn foreach_items() {
        let (interp, buf) = interp();
        run(&interp, "foreach (a \"b c\" d) echo $index=$item/$count").await;
        assert_eq!(buf.contents(), "0=a/3\n1=b c/3\n2=d/3\n");
    }

    #[tokio::test]
    async fn foreach_json_list_from_variable() {
        let (interp, buf) = interp();
        let script = "\
var -g silent 1
expr split , x,y
foreach $result {
  echo item $item
}
";
        run(&interp, script).await;
        assert_eq!(buf.contents(), "item x\nitem y\n");
    }

    #[tokio::test]
    async fn foreach_missing_body() {
        let (interp, buf) = interp();
        interp.one_cmd("foreach (a b)").await;
        assert_eq!(buf.contents(), "missing argument(s)\n");
    }

    #[tokio::test]
    async fn syntax_error_in_body_ends_loop_and_pops() {
        let (interp, buf) = interp();
        run(&interp, "repeat --count=3 {\n  echo $index\n  if 1 echo a else\n}\necho after\n").await;
        assert_eq!(
            buf.contents(),
            "1\nsyntax error: missing body around \"else\"\nafter\n"
        );
    }

    #[tokio::test]
    async fn interrupt_ends_loop() {
        let (output, buf) = Output::buffered();
        let interp = Interpreter::builder().output(output).build();
        interp.add_command(Command::sync("trip", "trip", |ctx, _| {
            ctx.interp.interrupt_flag().set();
            Ok(false)
        }));

        run(&interp, "repeat {\n  echo $index\n  if (eq# $index 2) trip\n}\n").await;
        assert_eq!(buf.contents(), "1\n2\n");
    }
}
