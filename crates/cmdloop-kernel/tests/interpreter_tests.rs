//! End-to-end tests for the dispatch loop and the control-flow commands.
//!
//! Every test drives a real interpreter through scripts and checks what it
//! printed, the way a user at the prompt would see it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cmdloop_kernel::{
    read_block, Command, DispatchChain, Dispatcher, ExecContext, Hooks, InterpResult, Interpreter,
    InterpreterBuilder, LineBuffer, Mode, Output, Plugin, Scope, SharedBuffer, Target,
};

fn buffered() -> (Interpreter, SharedBuffer) {
    let (output, buf) = Output::buffered();
    (Interpreter::builder().output(output).build(), buf)
}

async fn run_script(interp: &Interpreter, script: &str) -> (bool, Scope) {
    let mut source = LineBuffer::from_script(script);
    let mut scope = interp.new_scope();
    let stopped = interp.execute(&mut source, &mut scope, Mode::TopLevel).await;
    (stopped, scope)
}

// ============================================================================
// Scope stack
// ============================================================================

#[test]
fn push_pop_balance_and_lookup_order() {
    let mut scope = Scope::new();
    scope.set("x", "global", Target::Global);

    for depth in 1..=5 {
        scope.push(&[("x", "inner")], &[]);
        assert_eq!(scope.depth(), depth + 1);
        assert_eq!(scope.get("x").as_deref(), Some("inner"));
    }
    for _ in 0..5 {
        scope.pop();
    }

    assert_eq!(scope.depth(), 1);
    assert_eq!(scope.get("x").as_deref(), Some("global"));
}

#[test]
#[should_panic(expected = "cannot pop the global scope frame")]
fn popping_global_frame_aborts() {
    Scope::new().pop();
}

#[tokio::test]
async fn scope_is_balanced_after_nested_constructs() {
    let (interp, _buf) = buffered();
    let script = "\
function f {
  repeat --count=2 {
    foreach (a b) {
      if (eq $item b) stop
    }
  }
}
f x y
repeat --count=2 f
";
    let (_, scope) = run_script(&interp, script).await;
    assert_eq!(scope.depth(), 1);
}

// ============================================================================
// Variables and expansion
// ============================================================================

#[tokio::test]
async fn var_set_read_and_remove() {
    let (interp, buf) = buffered();
    run_script(&interp, "var x 5\necho $x\nvar -r x\nvar x\necho [$x]\n").await;
    assert_eq!(buf.contents(), "5\n[]\n");
}

#[tokio::test]
async fn expansion_is_transitive_and_dollar_escapes() {
    let (interp, buf) = buffered();
    run_script(&interp, "var a 1\nvar b $a\necho $b\necho $$a\necho $(b)x\n").await;
    assert_eq!(buf.contents(), "1\n$a\n1x\n");
}

#[tokio::test]
async fn environment_expansion() {
    let (interp, buf) = buffered();
    std::env::set_var("CMDLOOP_TEST_ENV", "from-env");
    run_script(&interp, "echo $(env.CMDLOOP_TEST_ENV)\n").await;
    assert_eq!(buf.contents(), "from-env\n");
}

#[tokio::test]
async fn errors_land_in_error_variable() {
    let (interp, buf) = buffered();
    run_script(&interp, "frobnicate now\necho last error: $error\n").await;
    assert_eq!(
        buf.contents(),
        "invalid command: frobnicate\nlast error: invalid command: frobnicate\n"
    );
}

// ============================================================================
// Block reader
// ============================================================================

#[tokio::test]
async fn read_block_single_and_else() {
    let mut source = LineBuffer::from_script(" echo 1\n}\n");
    let block = read_block(&mut source, "{", Some("else"), ": ").await.unwrap();
    assert_eq!(block.main, vec!["echo 1"]);
    assert!(block.alternate.is_none());

    let mut source = LineBuffer::from_script(" echo 1\n} else {\n echo 2\n}\n");
    let block = read_block(&mut source, "{", Some("else"), ": ").await.unwrap();
    assert_eq!(block.main, vec!["echo 1"]);
    assert_eq!(block.alternate, Some(vec!["echo 2".to_string()]));
}

#[tokio::test]
async fn read_block_unterminated_is_syntax_error() {
    let mut source = LineBuffer::from_script(" echo 1\n");
    let err = read_block(&mut source, "{", None, ": ").await.unwrap_err();
    assert!(err.is_syntax());
}

#[tokio::test]
async fn continuation_lines_join() {
    let (interp, buf) = buffered();
    run_script(&interp, "echo one \\\ntwo\n").await;
    assert_eq!(buf.contents(), "one two\n");
}

// ============================================================================
// Conditionals
// ============================================================================

#[tokio::test]
async fn conditional_examples() {
    let (interp, buf) = buffered();
    run_script(
        &interp,
        "if (eq foo foo) echo yes\nif (eq# 10 9) echo yes else echo no\nif !(z \"\") echo yes\n",
    )
    .await;
    assert_eq!(buf.contents(), "yes\nno\n");
}

#[tokio::test]
async fn conditional_runs_in_enclosing_scope() {
    let (interp, buf) = buffered();
    let script = "\
function f {
  if 1 {
    var inside set
  }
  echo [$inside]
}
f
echo [$inside]
";
    run_script(&interp, script).await;
    assert_eq!(buf.contents(), "[set]\n[]\n");
}

// ============================================================================
// Loops
// ============================================================================

#[tokio::test]
async fn repeat_prints_in_order() {
    let (interp, buf) = buffered();
    run_script(&interp, "repeat --count=3 echo $index\n").await;
    assert_eq!(buf.contents(), "1\n2\n3\n");
}

#[tokio::test]
async fn interrupt_stops_loop_early() {
    let (interp, buf) = buffered();
    interp.add_command(Command::sync("interrupt", "raise the interrupt flag", |ctx, _| {
        ctx.interp.interrupt_flag().set();
        Ok(false)
    }));

    let script = "\
repeat --count=10 {
  echo $index
  if (eq# $index 3) interrupt
}
echo next
";
    let (stopped, _) = run_script(&interp, script).await;
    assert!(!stopped);
    assert_eq!(buf.contents(), "1\n2\n3\nnext\n");
    assert!(!interp.interrupted(), "top level clears the flag");
}

#[tokio::test]
async fn nested_loops_see_their_own_index() {
    let (interp, buf) = buffered();
    let script = "\
foreach (a b) {
  var -p outer $index
  repeat --count=2 echo $item$index
}
";
    run_script(&interp, script).await;
    assert_eq!(buf.contents(), "a1\na2\nb1\nb2\n");
}

// ============================================================================
// Functions
// ============================================================================

#[tokio::test]
async fn function_positional_arguments() {
    let (interp, buf) = buffered();
    let script = "\
function f {
  echo $1
  echo $# [$*]
}
f hello
f a \"b c\" d
";
    run_script(&interp, script).await;
    assert_eq!(buf.contents(), "hello\n1 [hello]\na\n3 [a b c d]\n");
}

#[tokio::test]
async fn function_body_is_captured_unexpanded() {
    let (interp, buf) = buffered();
    let script = "\
var greeting hi
function f echo $greeting $1
var greeting hello
f world
";
    run_script(&interp, script).await;
    assert_eq!(buf.contents(), "hello world\n");
}

#[tokio::test]
async fn syntax_error_in_function_stays_in_function() {
    let (interp, buf) = buffered();
    let script = "\
function f {
  echo start
  if 1 echo a else
  echo unreachable
}
f
echo after
";
    let (stopped, _) = run_script(&interp, script).await;
    assert!(!stopped);
    assert_eq!(
        buf.contents(),
        "start\nsyntax error: missing body around \"else\"\nafter\n"
    );
}

#[tokio::test]
async fn exit_stops_top_level() {
    let (interp, buf) = buffered();
    let (stopped, _) = run_script(&interp, "echo a\nexit\necho b\n").await;
    assert!(stopped);
    assert_eq!(buf.contents(), "a\n");
}

// ============================================================================
// Hooks and plugins
// ============================================================================

#[derive(Default)]
struct Counts {
    pre: AtomicUsize,
    post: AtomicUsize,
    empty: AtomicUsize,
}

#[derive(Clone, Default)]
struct Counting(Arc<Counts>);

impl Hooks for Counting {
    fn pre_cmd(&self, _interp: &Interpreter, _line: &str) {
        self.0.pre.fetch_add(1, Ordering::SeqCst);
    }

    fn post_cmd(&self, _interp: &Interpreter, line: &str, stop: bool) -> bool {
        self.0.post.fetch_add(1, Ordering::SeqCst);
        stop || line == "quit"
    }

    fn empty_line(&self, _interp: &Interpreter) {
        self.0.empty.fetch_add(1, Ordering::SeqCst);
    }

    fn default_cmd(&self, interp: &Interpreter, line: &str) -> InterpResult<bool> {
        interp.output().println(format_args!("unknown: {line}"));
        Ok(false)
    }
}

#[tokio::test]
async fn hooks_wrap_every_command() {
    let counting = Counting::default();
    let (output, buf) = Output::buffered();
    let interp = Interpreter::builder().output(output).hooks(counting.clone()).build();

    let (stopped, _) = run_script(&interp, "echo a\n\n# comment\nmystery cmd\nquit\necho never\n").await;

    assert!(stopped);
    assert_eq!(buf.contents(), "a\nunknown: mystery cmd\nunknown: quit\n");
    assert_eq!(counting.0.pre.load(Ordering::SeqCst), 3);
    assert_eq!(counting.0.post.load(Ordering::SeqCst), 3);
    assert_eq!(counting.0.empty.load(Ordering::SeqCst), 2);
}

struct Shout;

struct ShoutDispatcher {
    next: DispatchChain,
}

#[async_trait::async_trait]
impl Dispatcher for ShoutDispatcher {
    async fn dispatch(&self, ctx: &mut ExecContext<'_>, line: &str) -> InterpResult<bool> {
        match line.strip_prefix("shout ") {
            Some(text) => {
                ctx.println(text.to_uppercase());
                Ok(false)
            }
            None => self.next.dispatch(ctx, line).await,
        }
    }
}

impl Plugin for Shout {
    fn install(self: Box<Self>, builder: &mut InterpreterBuilder) {
        builder.wrap_dispatcher(|next| Arc::new(ShoutDispatcher { next }));
    }
}

#[tokio::test]
async fn plugin_dispatcher_sees_lines_first() {
    let (output, buf) = Output::buffered();
    let interp = Interpreter::builder().output(output).plugin(Shout).build();

    run_script(&interp, "var who world\nshout hello $who\necho quiet\n").await;
    assert_eq!(buf.contents(), "HELLO $WHO\nquiet\n");
}

#[tokio::test]
async fn without_control_flow_has_only_builtins() {
    let (output, buf) = Output::buffered();
    let interp = Interpreter::builder().output(output).without_control_flow().build();

    run_script(&interp, "echo $x\nvar x 1\n").await;
    assert_eq!(buf.contents(), "$x\ninvalid command: var\n");
    assert!(interp.command("if").is_none());
    assert!(interp.command("go").is_some());
}
