//! Identifier, type and default-expression normalization.
//!
//! Everything that compares as equal in the engine is first pushed through
//! one of these functions, so `public."Users"` and `users`, or `NOW()` and
//! `now( )`, never show up as spurious diffs.

/// Normalizes a table or column identifier.
///
/// Strips schema qualifiers (`public.users` → `users`), removes
/// double-quote delimiters (unescaping doubled quotes), and lowercases.
/// Identity is therefore case-insensitive and schema-qualifier-insensitive.
#[must_use]
pub fn ident(raw: &str) -> String {
    let raw = raw.trim();

    // Split on '.' outside double quotes and keep the last segment.
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                // Escaped quote inside a quoted identifier.
                chars.next();
                current.push('"');
            }
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);

    let last = segments.pop().unwrap_or_default();
    last.to_lowercase()
}

/// Normalizes a SQL type name for comparison.
///
/// Lowercases, collapses whitespace runs, and removes spacing around
/// parentheses and commas so `NUMERIC( 10 , 2 )` and `numeric(10,2)`
/// compare equal.
#[must_use]
pub fn type_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");

    let chars: Vec<char> = collapsed.chars().collect();
    let mut out = String::with_capacity(collapsed.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = if i == 0 { None } else { chars.get(i - 1).copied() };
            let next = chars.get(i + 1).copied();
            if matches!(prev, Some('(' | ',')) || matches!(next, Some('(' | ')' | ',')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Function calls canonicalized by [`default_expr`]. Deliberately narrow:
/// only this fixed allow-list is rewritten, arbitrary equivalent SQL
/// expressions still compare as different.
const CANONICAL_CALLS: &[&str] = &["now", "gen_random_uuid"];

/// Normalizes a default-value SQL expression.
///
/// Three passes, each applied only outside single-quoted literals:
/// collapse whitespace runs, tighten spacing around parentheses and after
/// commas, then canonicalize the allow-listed zero-argument function calls
/// to their lowercase no-space form (`NOW( )` → `now()`).
#[must_use]
pub fn default_expr(raw: &str) -> String {
    let collapsed = map_outside_quotes(raw.trim(), |text| {
        let mut out = String::with_capacity(text.len());
        let mut last_space = false;
        for c in text.chars() {
            if c.is_whitespace() {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }
        out
    });

    let tightened = map_outside_quotes(&collapsed, |text| {
        let mut out = String::with_capacity(text.len());
        let chars: Vec<char> = text.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            if c == ' ' {
                let prev = out.chars().last();
                let next = chars.get(i + 1).copied();
                let after_delim = matches!(prev, Some('(' | ','));
                let before_delim = matches!(next, Some('(' | ')' | ','));
                if after_delim || before_delim {
                    continue;
                }
            }
            out.push(c);
        }
        out
    });

    let mut canonical = tightened;
    for call in CANONICAL_CALLS {
        canonical = canonicalize_call(&canonical, call);
    }
    canonical.trim().to_string()
}

/// Applies `f` to every region of `text` that lies outside single-quoted
/// literals, leaving quoted regions (including their `''` escapes) intact.
fn map_outside_quotes(text: &str, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut plain = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            out.push(c);
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    out.push('\'');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
        } else if c == '\'' {
            out.push_str(&f(&plain));
            plain.clear();
            out.push(c);
            in_quotes = true;
        } else {
            plain.push(c);
        }
    }
    out.push_str(&f(&plain));
    out
}

/// Rewrites case-insensitive occurrences of `name()` (outside quotes) to
/// the canonical lowercase form.
fn canonicalize_call(text: &str, name: &str) -> String {
    let needle = format!("{name}()");
    map_outside_quotes(text, |region| {
        let bytes = region.as_bytes();
        let mut out = String::with_capacity(region.len());
        let mut i = 0;
        while i < region.len() {
            let at_boundary =
                i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');
            let found = region
                .get(i..i + needle.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(&needle));
            if at_boundary && found {
                out.push_str(&needle);
                i += needle.len();
            } else {
                let c = region[i..].chars().next().unwrap_or(' ');
                out.push(c);
                i += c.len_utf8();
            }
        }
        out
    })
}
