//! Block reader: captures brace-delimited bodies from a line source.
//!
//! ```text
//! if (eq $a 1) {        header "{"   → reads until the matching "}"
//!     echo one
//! } else {              closing line may open the alternate block
//!     echo other
//! }
//!
//! if (eq $a 1) echo one else echo other     one-line form
//! ```
//!
//! Nesting is tracked by counting: a line that starts with `}` closes one
//! level and a line that ends with `{` opens one. Blank lines and `#`
//! comments inside a block are dropped.

use crate::args::split_on_word;
use crate::error::{InterpError, InterpResult};
use crate::source::{read_logical_line, LineSource};

/// One or two captured bodies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    /// The first (or only) body.
    pub main: Vec<String>,
    /// The body after the else keyword, if one was given.
    pub alternate: Option<Vec<String>>,
}

impl Block {
    fn single(line: &str) -> Self {
        Self {
            main: vec![line.to_string()],
            alternate: None,
        }
    }
}

fn is_blank_or_comment(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

/// Read a block given the text after a construct's own arguments.
///
/// If `header` does not end with `{`, it is a one-line body (with `\$`
/// un-escaped to `$`); when `else_keyword` is given, a top-level occurrence
/// of that word splits it into the main and alternate bodies. Otherwise
/// `header` must be exactly `{` and lines are read from `source` until the
/// matching close.
pub async fn read_block(
    source: &mut dyn LineSource,
    header: &str,
    else_keyword: Option<&str>,
    continuation_prompt: &str,
) -> InterpResult<Block> {
    let header = header.trim();

    if header.is_empty() {
        return Err(InterpError::syntax("missing body"));
    }

    if !header.ends_with('{') {
        let body = header.replace("\\$", "$");
        if let Some(keyword) = else_keyword {
            if let Some((main, alternate)) = split_on_word(&body, keyword) {
                if main.is_empty() || alternate.is_empty() {
                    return Err(InterpError::syntax(format!("missing body around {keyword:?}")));
                }
                return Ok(Block {
                    main: vec![main.to_string()],
                    alternate: Some(vec![alternate.to_string()]),
                });
            }
        }
        return Ok(Block::single(&body));
    }

    if header != "{" {
        return Err(InterpError::syntax("unexpected body and block"));
    }

    let (main, closing) = read_braced(source, continuation_prompt).await?;
    let rest = closing.trim_start_matches('}').trim();

    if is_blank_or_comment(rest) {
        return Ok(Block { main, alternate: None });
    }

    let Some(keyword) = else_keyword else {
        return Err(InterpError::syntax(format!("unexpected {rest:?} after block")));
    };
    let Some(after) = rest.strip_prefix(keyword) else {
        return Err(InterpError::syntax(format!("expected {keyword:?}, got {rest:?}")));
    };
    if after.trim() != "{" {
        return Err(InterpError::syntax(format!("expected {{ after {keyword:?}, got {:?}", after.trim())));
    }

    let (alternate, closing) = read_braced(source, continuation_prompt).await?;
    let rest = closing.trim_start_matches('}').trim();
    if !is_blank_or_comment(rest) {
        return Err(InterpError::syntax(format!("unexpected {rest:?} after block")));
    }

    Ok(Block {
        main,
        alternate: Some(alternate),
    })
}

/// Collect lines until brace depth returns to zero.
///
/// Returns the body and the closing line.
async fn read_braced(
    source: &mut dyn LineSource,
    continuation_prompt: &str,
) -> InterpResult<(Vec<String>, String)> {
    let mut depth = 1usize;
    let mut body = Vec::new();

    loop {
        let Some(line) = read_logical_line(source, continuation_prompt, continuation_prompt).await? else {
            return Err(InterpError::syntax("unterminated block"));
        };

        if is_blank_or_comment(&line) {
            continue;
        }

        if line.starts_with('}') {
            depth -= 1;
            if depth == 0 {
                return Ok((body, line));
            }
        }
        if line.ends_with('{') {
            depth += 1;
        }

        body.push(line);
    }
}
