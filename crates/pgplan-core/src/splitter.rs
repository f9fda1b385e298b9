//! SQL statement splitter.
//!
//! Splits a raw multi-statement SQL blob into individual statements with
//! an explicit enumerated-state scan over a character cursor. A `;` only
//! terminates a statement in the default context; string literals, quoted
//! identifiers, comments and dollar-quoted blocks are tracked per
//! character so their contents never split a statement. Comments are
//! stripped from the emitted statements.
//!
//! The scan never fails: unterminated quotes or comments simply extend to
//! the end of the input, and a trailing partial statement is still emitted
//! when non-empty.

/// Lexical context of the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    /// Outside any literal or comment.
    Default,
    /// Inside a single-quoted string literal.
    SingleQuote,
    /// Inside a double-quoted identifier.
    DoubleQuote,
    /// Inside a `--` comment, until end of line.
    LineComment,
    /// Inside a `/* */` comment.
    BlockComment,
    /// Inside a dollar-quoted block; the tag is the text between the two
    /// `$` delimiters (empty for `$$`).
    DollarQuote(String),
}

/// Splits raw SQL text into trimmed, non-empty statements without their
/// closing semicolons.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<String> {
    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Default;

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match state {
            State::Default => match c {
                ';' => {
                    push_statement(&mut statements, &mut current);
                    i += 1;
                }
                '\'' => {
                    current.push(c);
                    state = State::SingleQuote;
                    i += 1;
                }
                '"' => {
                    current.push(c);
                    state = State::DoubleQuote;
                    i += 1;
                }
                '-' if chars.get(i + 1) == Some(&'-') => {
                    // Comment text is dropped; a space keeps tokens apart.
                    current.push(' ');
                    state = State::LineComment;
                    i += 2;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    current.push(' ');
                    state = State::BlockComment;
                    i += 2;
                }
                '$' => {
                    if let Some(tag_len) = dollar_tag_len(&chars, i) {
                        for offset in 0..tag_len {
                            current.push(chars[i + offset]);
                        }
                        let tag: String = chars[i + 1..i + tag_len - 1].iter().collect();
                        state = State::DollarQuote(tag);
                        i += tag_len;
                    } else {
                        current.push(c);
                        i += 1;
                    }
                }
                _ => {
                    current.push(c);
                    i += 1;
                }
            },
            State::SingleQuote => {
                current.push(c);
                if c == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        // Doubled quote is an escape, not a terminator.
                        current.push('\'');
                        i += 2;
                    } else {
                        state = State::Default;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
            State::DoubleQuote => {
                current.push(c);
                if c == '"' {
                    if chars.get(i + 1) == Some(&'"') {
                        current.push('"');
                        i += 2;
                    } else {
                        state = State::Default;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = State::Default;
                }
                i += 1;
            }
            State::BlockComment => {
                if c == '*' && chars.get(i + 1) == Some(&'/') {
                    state = State::Default;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            State::DollarQuote(ref tag) => {
                if c == '$' && closes_dollar_quote(&chars, i, tag) {
                    let closer_len = tag.chars().count() + 2;
                    for offset in 0..closer_len {
                        current.push(chars[i + offset]);
                    }
                    state = State::Default;
                    i += closer_len;
                } else {
                    current.push(c);
                    i += 1;
                }
            }
        }
    }

    push_statement(&mut statements, &mut current);
    statements
}

/// Trims and stores the accumulated statement if non-empty.
fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let stmt = current.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
    current.clear();
}

/// If position `i` starts a dollar-quote opener (`$`, an optional
/// identifier tag, `$`), returns the opener's length in characters.
fn dollar_tag_len(chars: &[char], i: usize) -> Option<usize> {
    debug_assert_eq!(chars.get(i), Some(&'$'));
    let mut j = i + 1;
    while let Some(&c) = chars.get(j) {
        if c == '$' {
            return Some(j - i + 1);
        }
        if !(c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        j += 1;
    }
    None
}

/// Returns `true` when the text at position `i` is the closing `$tag$`.
fn closes_dollar_quote(chars: &[char], i: usize, tag: &str) -> bool {
    let mut j = i + 1;
    for expected in tag.chars() {
        if chars.get(j) != Some(&expected) {
            return false;
        }
        j += 1;
    }
    chars.get(j) == Some(&'$')
}
