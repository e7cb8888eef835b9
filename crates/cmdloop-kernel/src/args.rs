//! Argument splitting for command remainders.
//!
//! Words are separated by whitespace. Quotes (`"`, `'`, `` ` ``) group a word
//! and are removed; bracket groups (`(...)`, `[...]`, `{...}`) are kept
//! verbatim as one word so that `if (eq a b) body` sees `(eq a b)` whole.

/// One word plus its byte span in the source line.
#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    start: usize,
    end: usize,
}

/// Scan the next word starting at byte offset `from`.
fn next_word(line: &str, from: usize) -> Option<Word> {
    let rest = &line[from..];
    let skip = rest.len() - rest.trim_start().len();
    let start = from + skip;
    if start >= line.len() {
        return None;
    }

    let mut text = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut end = line.len();

    for (i, c) in line[start..].char_indices() {
        let pos = start + i;

        if let Some(q) = quote {
            if escaped {
                text.push(c);
                escaped = false;
            } else if c == '\\' && q == '"' {
                if depth > 0 {
                    text.push(c);
                }
                escaped = true;
            } else if c == q {
                quote = None;
                if depth > 0 {
                    text.push(c);
                }
            } else {
                text.push(c);
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                quote = Some(c);
                if depth > 0 {
                    text.push(c);
                }
            }
            '(' | '[' | '{' => {
                depth += 1;
                text.push(c);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                text.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                end = pos;
                break;
            }
            _ => text.push(c),
        }
    }

    Some(Word { text, start, end })
}

/// Split a line into words.
pub fn split_args(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut pos = 0;
    while let Some(word) = next_word(line, pos) {
        pos = word.end;
        words.push(word.text);
    }
    words
}

/// Split into at most `n` words; the last one is the raw, trimmed remainder.
pub fn split_args_n(line: &str, n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }

    let mut words = Vec::new();
    let mut pos = 0;
    while words.len() + 1 < n {
        match next_word(line, pos) {
            Some(word) => {
                pos = word.end;
                words.push(word.text);
            }
            None => return words,
        }
    }

    let rest = line[pos..].trim();
    if !rest.is_empty() {
        words.push(rest.to_string());
    }
    words
}

/// Strip leading `-x`/`--xyz` options. `--` ends the options and is dropped.
pub fn get_options(line: &str) -> (Vec<String>, &str) {
    let mut options = Vec::new();
    let mut rest = line.trim_start();

    loop {
        let (word, tail) = match rest.split_once(char::is_whitespace) {
            Some((w, t)) => (w, t.trim_start()),
            None => (rest, ""),
        };

        if word == "--" {
            return (options, tail);
        }
        if word.len() < 2 || !word.starts_with('-') {
            return (options, rest);
        }

        options.push(word.to_string());
        rest = tail;
    }
}

/// Split `line` around the first top-level occurrence of the word `keyword`.
///
/// Words inside quotes or brackets never match.
pub fn split_on_word<'a>(line: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let mut pos = 0;
    while let Some(word) = next_word(line, pos) {
        if &line[word.start..word.end] == keyword {
            return Some((line[..word.start].trim(), line[word.end..].trim()));
        }
        pos = word.end;
    }
    None
}
