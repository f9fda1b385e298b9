//! Best-effort DDL statement parser.
//!
//! Classifies one normalized statement (comments already stripped by the
//! splitter) into at most one [`SqlOp`]. Dispatch is a fixed ordered list
//! of per-statement-kind recognizers; the first one whose shape matches
//! wins. A statement matching none of them produces a warning and no
//! operation, so a single unrecognized statement never aborts an entire
//! migration file.

use crate::error::ParseWarning;
use crate::normalize;
use crate::schema::{Column, ColumnType};
use crate::splitter::split_statements;

/// Kind of a table-level constraint the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// PRIMARY KEY constraint.
    PrimaryKey,
    /// UNIQUE constraint.
    Unique,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrimaryKey => f.write_str("PRIMARY KEY"),
            Self::Unique => f.write_str("UNIQUE"),
        }
    }
}

/// A table-level constraint extracted from `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConstraint {
    /// Constraint kind.
    pub kind: ConstraintKind,
    /// Constraint name, when the DDL named it.
    pub name: Option<String>,
    /// Constrained columns (possibly more than one; the replayer decides
    /// what it can represent).
    pub columns: Vec<String>,
}

/// A raw-DDL-level structural delta.
///
/// This is a distinct vocabulary from [`crate::ops::Operation`]: it models
/// raw SQL intent (possibly unnamed, possibly multi-column) rather than
/// validated schema deltas. Produced by this parser, consumed by the
/// replayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlOp {
    /// `CREATE TABLE` with column definitions and table constraints.
    CreateTable {
        /// Table name.
        table: String,
        /// Parsed column definitions, in declaration order.
        columns: Vec<Column>,
        /// Table-level constraints.
        constraints: Vec<TableConstraint>,
    },
    /// `ALTER TABLE .. ADD COLUMN`.
    AddColumn {
        /// Table name.
        table: String,
        /// The column definition.
        column: Column,
    },
    /// `ALTER TABLE .. ALTER COLUMN .. TYPE`.
    AlterColumnType {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// The new type.
        ty: ColumnType,
    },
    /// `ALTER COLUMN .. SET NOT NULL`.
    SetNotNull {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// `ALTER COLUMN .. DROP NOT NULL`.
    DropNotNull {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// `ALTER COLUMN .. SET DEFAULT`.
    SetDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Normalized default expression.
        expr: String,
    },
    /// `ALTER COLUMN .. DROP DEFAULT`.
    DropDefault {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// `ALTER TABLE .. ADD CONSTRAINT` (named or anonymous).
    AddConstraint {
        /// Table name.
        table: String,
        /// Constraint kind.
        kind: ConstraintKind,
        /// Constraint name, if given.
        name: Option<String>,
        /// Constrained columns.
        columns: Vec<String>,
    },
    /// `ALTER TABLE .. DROP CONSTRAINT`.
    DropConstraint {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },
    /// `ALTER TABLE .. DROP COLUMN`.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// `DROP TABLE`.
    DropTable {
        /// Table name.
        table: String,
    },
}

impl SqlOp {
    /// Short description used as warning context during replay.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table, .. } => format!("CREATE TABLE {table}"),
            Self::AddColumn { table, column } => {
                format!("ALTER TABLE {table} ADD COLUMN {}", column.name)
            }
            Self::AlterColumnType { table, column, ty } => {
                format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {ty}")
            }
            Self::SetNotNull { table, column } => {
                format!("ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL")
            }
            Self::DropNotNull { table, column } => {
                format!("ALTER TABLE {table} ALTER COLUMN {column} DROP NOT NULL")
            }
            Self::SetDefault {
                table,
                column,
                expr,
            } => format!("ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {expr}"),
            Self::DropDefault { table, column } => {
                format!("ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT")
            }
            Self::AddConstraint {
                table, kind, name, ..
            } => match name {
                Some(name) => format!("ALTER TABLE {table} ADD CONSTRAINT {name} {kind}"),
                None => format!("ALTER TABLE {table} ADD {kind}"),
            },
            Self::DropConstraint { table, name } => {
                format!("ALTER TABLE {table} DROP CONSTRAINT {name}")
            }
            Self::DropColumn { table, column } => {
                format!("ALTER TABLE {table} DROP COLUMN {column}")
            }
            Self::DropTable { table } => format!("DROP TABLE {table}"),
        }
    }
}

/// Splits raw SQL text into statements and parses each one.
///
/// Returns every recognized operation in statement order, plus the
/// accumulated warnings. Never fails.
#[must_use]
pub fn parse_sql(sql: &str) -> (Vec<SqlOp>, Vec<ParseWarning>) {
    let mut ops = Vec::new();
    let mut warnings = Vec::new();
    for stmt in split_statements(sql) {
        let (op, mut stmt_warnings) = parse_statement(&stmt);
        if let Some(op) = op {
            ops.push(op);
        }
        warnings.append(&mut stmt_warnings);
    }
    (ops, warnings)
}

/// Parses one statement into at most one operation plus warnings.
#[must_use]
pub fn parse_statement(stmt: &str) -> (Option<SqlOp>, Vec<ParseWarning>) {
    let tokens = tokenize(stmt);
    let mut warnings = Vec::new();

    let op = if matches_keywords(&tokens, &["create", "table"]) {
        parse_create_table(stmt, &tokens, &mut warnings)
    } else if matches_keywords(&tokens, &["alter", "table"]) {
        parse_alter_table(stmt, &tokens, &mut warnings)
    } else if matches_keywords(&tokens, &["drop", "table"]) {
        parse_drop_table(&tokens)
    } else {
        warnings.push(ParseWarning::new(stmt, "Unsupported statement"));
        None
    };

    if op.is_none() && warnings.is_empty() {
        // A recognizer declined without explaining itself; make sure the
        // statement is never silently dropped.
        warnings.push(ParseWarning::new(stmt, "Unsupported statement"));
    }
    (op, warnings)
}

// ================================================================
// Tokenizer
// ================================================================

/// Splits a statement into whitespace-delimited tokens while respecting
/// quote state and parenthesis depth, so `numeric(10, 2)` and quoted
/// strings containing spaces are single tokens.
pub(crate) fn tokenize(stmt: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    let mut in_single = false;
    let mut in_double = false;

    let mut chars = stmt.chars().peekable();
    while let Some(c) = chars.next() {
        if in_single {
            current.push(c);
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    current.push('\'');
                    chars.next();
                } else {
                    in_single = false;
                }
            }
            continue;
        }
        if in_double {
            current.push(c);
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_double = false;
                }
            }
            continue;
        }
        match c {
            '\'' => {
                current.push(c);
                in_single = true;
            }
            '"' => {
                current.push(c);
                in_double = true;
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Case-insensitive comparison of the leading tokens against keywords.
fn matches_keywords(tokens: &[String], keywords: &[&str]) -> bool {
    keywords.len() <= tokens.len()
        && keywords
            .iter()
            .zip(tokens)
            .all(|(kw, tok)| tok.eq_ignore_ascii_case(kw))
}

fn is_kw(token: Option<&String>, kw: &str) -> bool {
    token.is_some_and(|t| word_of(t).eq_ignore_ascii_case(kw))
}

/// The part of a token before any glued parenthesis group
/// (`key(id)` → `key`).
pub(crate) fn word_of(token: &str) -> &str {
    match token.find('(') {
        Some(idx) => &token[..idx],
        None => token,
    }
}

/// The content of a token's glued parenthesis group
/// (`key(id)` → `Some("id")`).
pub(crate) fn parens_of(token: &str) -> Option<&str> {
    let open = token.find('(')?;
    let close = token.rfind(')')?;
    if close <= open {
        return None;
    }
    Some(&token[open + 1..close])
}

/// Looks for a parenthesized payload either glued onto the token at `idx`
/// or as the standalone token right after it. Returns the payload and the
/// index of the first token past it.
fn paren_payload(tokens: &[String], idx: usize) -> Option<(String, usize)> {
    if let Some(tok) = tokens.get(idx) {
        if let Some(inner) = parens_of(tok) {
            return Some((inner.to_string(), idx + 1));
        }
    }
    if let Some(next) = tokens.get(idx + 1) {
        if next.starts_with('(') {
            if let Some(inner) = parens_of(next) {
                return Some((inner.to_string(), idx + 2));
            }
        }
    }
    None
}

/// Splits text on `sep` at parenthesis depth zero, outside quotes.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: usize = 0;
    let mut in_single = false;
    let mut in_double = false;

    for c in text.chars() {
        if in_single {
            current.push(c);
            if c == '\'' {
                in_single = false;
            }
            continue;
        }
        if in_double {
            current.push(c);
            if c == '"' {
                in_double = false;
            }
            continue;
        }
        match c {
            '\'' => {
                current.push(c);
                in_single = true;
            }
            '"' => {
                current.push(c);
                in_double = true;
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Byte span of the first top-level parenthesized group, quote-aware.
fn top_level_paren_span(text: &str) -> Option<(usize, usize)> {
    let mut depth: usize = 0;
    let mut in_single = false;
    let mut in_double = false;
    let mut open = None;

    for (i, c) in text.char_indices() {
        if in_single {
            if c == '\'' {
                in_single = false;
            }
            continue;
        }
        if in_double {
            if c == '"' {
                in_double = false;
            }
            continue;
        }
        match c {
            '\'' => in_single = true,
            '"' => in_double = true,
            '(' => {
                if depth == 0 {
                    open = Some(i);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(open) = open {
                        return Some((open, i));
                    }
                }
            }
            _ => {}
        }
    }
    None
}

// ================================================================
// Column definitions
// ================================================================

/// Keywords that terminate the base-type token run of a column definition.
fn is_constraint_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "primary" | "unique" | "not" | "null" | "default" | "constraint" | "references" | "check"
    )
}

/// Parses a column definition: name, base-type tokens until a constraint
/// keyword, then constraint tokens in any order.
fn parse_column_def(tokens: &[String], warnings: &mut Vec<ParseWarning>) -> Option<Column> {
    let name_tok = tokens.first()?;
    let name = normalize::ident(name_tok);

    let mut i = 1;
    let mut type_parts: Vec<&str> = Vec::new();
    while i < tokens.len() && !is_constraint_keyword(word_of(&tokens[i])) {
        type_parts.push(&tokens[i]);
        i += 1;
    }
    if type_parts.is_empty() {
        warnings.push(ParseWarning::new(
            tokens.join(" "),
            "Unsupported column definition without a type",
        ));
        return None;
    }
    let mut column = Column::new(&name, ColumnType::new(&type_parts.join(" ")));

    while i < tokens.len() {
        let word = word_of(&tokens[i]).to_ascii_lowercase();
        match word.as_str() {
            "primary" => {
                if is_kw(tokens.get(i + 1), "key") {
                    i += 1;
                }
                column.primary_key = true;
                column.nullable = false;
                i += 1;
            }
            "unique" => {
                column.unique = true;
                i += 1;
            }
            "not" => {
                if is_kw(tokens.get(i + 1), "null") {
                    i += 1;
                }
                column.nullable = false;
                i += 1;
            }
            "null" => {
                column.nullable = true;
                i += 1;
            }
            "default" => {
                // The expression runs until the next recognized constraint
                // keyword; the first token always belongs to it, so
                // DEFAULT NULL stays an expression.
                let mut expr_parts: Vec<&str> = Vec::new();
                i += 1;
                if i < tokens.len() {
                    expr_parts.push(&tokens[i]);
                    i += 1;
                }
                while i < tokens.len() && !is_constraint_keyword(word_of(&tokens[i])) {
                    expr_parts.push(&tokens[i]);
                    i += 1;
                }
                if expr_parts.is_empty() {
                    warnings.push(ParseWarning::new(
                        tokens.join(" "),
                        "Unsupported DEFAULT without an expression",
                    ));
                } else {
                    column.default = Some(normalize::default_expr(&expr_parts.join(" ")));
                }
            }
            "references" => {
                if let Some((target, target_cols, next)) = parse_references(tokens, i + 1) {
                    if target_cols.len() == 1 {
                        column.foreign_key =
                            Some(crate::schema::ForeignKey::new(&target, &target_cols[0]));
                    } else {
                        warnings.push(ParseWarning::new(
                            tokens.join(" "),
                            "Unsupported REFERENCES without a single target column",
                        ));
                    }
                    i = next;
                } else {
                    warnings.push(ParseWarning::new(
                        tokens.join(" "),
                        "Unsupported REFERENCES clause",
                    ));
                    i += 1;
                }
            }
            "constraint" => {
                // Inline constraint name; the following keyword applies.
                i += 2;
            }
            "check" => {
                warnings.push(ParseWarning::new(
                    tokens.join(" "),
                    "Unsupported CHECK constraint",
                ));
                let (_, next) =
                    paren_payload(tokens, i).unwrap_or((String::new(), i + 1));
                i = next;
            }
            _ => i += 1,
        }
    }
    Some(column)
}

/// Parses a `REFERENCES table(column)` target starting at `idx`. Returns
/// the table, the referenced columns, and the index past the clause.
fn parse_references(tokens: &[String], idx: usize) -> Option<(String, Vec<String>, usize)> {
    let target_tok = tokens.get(idx)?;
    let table = normalize::ident(word_of(target_tok));
    if table.is_empty() {
        return None;
    }
    let (payload, next) = paren_payload(tokens, idx)?;
    let columns: Vec<String> = split_top_level(&payload, ',')
        .iter()
        .map(|c| normalize::ident(c))
        .collect();
    if columns.is_empty() {
        return None;
    }
    Some((table, columns, next))
}

// ================================================================
// Statement recognizers
// ================================================================

fn parse_create_table(
    stmt: &str,
    tokens: &[String],
    warnings: &mut Vec<ParseWarning>,
) -> Option<SqlOp> {
    let mut idx = 2;
    if is_kw(tokens.get(idx), "if") && is_kw(tokens.get(idx + 1), "not") {
        idx += 3;
    }
    let name_tok = tokens.get(idx)?;
    let table = normalize::ident(word_of(name_tok));

    let (open, close) = top_level_paren_span(stmt)?;
    let body = &stmt[open + 1..close];

    let mut columns = Vec::new();
    let mut constraints = Vec::new();
    for item in split_top_level(body, ',') {
        let item_tokens = tokenize(&item);
        let leading = item_tokens
            .first()
            .map(|t| word_of(t).to_ascii_lowercase())
            .unwrap_or_default();
        match leading.as_str() {
            "constraint" | "primary" | "unique" => {
                if let Some(constraint) = parse_table_constraint(&item, &item_tokens, warnings) {
                    constraints.push(constraint);
                }
            }
            "foreign" => {
                warnings.push(ParseWarning::new(
                    item,
                    "Unsupported table-level FOREIGN KEY constraint",
                ));
            }
            "check" => {
                warnings.push(ParseWarning::new(
                    item,
                    "Unsupported table-level CHECK constraint",
                ));
            }
            _ => {
                if let Some(column) = parse_column_def(&item_tokens, warnings) {
                    columns.push(column);
                }
            }
        }
    }

    Some(SqlOp::CreateTable {
        table,
        columns,
        constraints,
    })
}

fn parse_table_constraint(
    item: &str,
    tokens: &[String],
    warnings: &mut Vec<ParseWarning>,
) -> Option<TableConstraint> {
    let mut idx = 0;
    let mut name = None;
    if is_kw(tokens.first(), "constraint") {
        name = tokens.get(1).map(|t| normalize::ident(t));
        idx = 2;
    }

    let kind_word = tokens.get(idx).map(|t| word_of(t).to_ascii_lowercase());
    let kind = match kind_word.as_deref() {
        Some("primary") => {
            if is_kw(tokens.get(idx + 1), "key") && parens_of(&tokens[idx]).is_none() {
                idx += 1;
            }
            ConstraintKind::PrimaryKey
        }
        Some("unique") => ConstraintKind::Unique,
        _ => {
            warnings.push(ParseWarning::new(item, "Unsupported table constraint"));
            return None;
        }
    };

    let (payload, _) = match paren_payload(tokens, idx) {
        Some(found) => found,
        None => {
            warnings.push(ParseWarning::new(
                item,
                "Unsupported constraint without a column list",
            ));
            return None;
        }
    };
    let columns: Vec<String> = split_top_level(&payload, ',')
        .iter()
        .map(|c| normalize::ident(c))
        .collect();
    if columns.is_empty() {
        warnings.push(ParseWarning::new(
            item,
            "Unsupported constraint without a column list",
        ));
        return None;
    }

    Some(TableConstraint {
        kind,
        name,
        columns,
    })
}

fn parse_alter_table(
    stmt: &str,
    tokens: &[String],
    warnings: &mut Vec<ParseWarning>,
) -> Option<SqlOp> {
    let mut idx = 2;
    if is_kw(tokens.get(idx), "if") && is_kw(tokens.get(idx + 1), "exists") {
        idx += 2;
    }
    if is_kw(tokens.get(idx), "only") {
        idx += 1;
    }
    let table = normalize::ident(word_of(tokens.get(idx)?));
    let rest = &tokens[idx + 1..];

    let action = rest.first().map(|t| t.to_ascii_lowercase());
    match action.as_deref() {
        Some("add") => parse_alter_add(stmt, table, rest, warnings),
        Some("alter") => parse_alter_column(stmt, table, rest, warnings),
        Some("drop") => parse_alter_drop(stmt, table, rest, warnings),
        _ => {
            warnings.push(ParseWarning::new(stmt, "Unsupported ALTER TABLE action"));
            None
        }
    }
}

fn parse_alter_add(
    stmt: &str,
    table: String,
    rest: &[String],
    warnings: &mut Vec<ParseWarning>,
) -> Option<SqlOp> {
    // ADD CONSTRAINT name PRIMARY KEY (..) | UNIQUE (..), or the
    // anonymous ADD PRIMARY KEY (..) / ADD UNIQUE (..) forms.
    if is_kw(rest.get(1), "constraint") {
        let name = rest.get(2).map(|t| normalize::ident(t));
        return parse_add_constraint(stmt, table, name, rest, 3, warnings);
    }
    if is_kw(rest.get(1), "primary") || is_kw(rest.get(1), "unique") {
        return parse_add_constraint(stmt, table, None, rest, 1, warnings);
    }

    // ADD [COLUMN] [IF NOT EXISTS] <definition>
    let mut idx = 1;
    if is_kw(rest.get(idx), "column") {
        idx += 1;
    }
    if is_kw(rest.get(idx), "if") && is_kw(rest.get(idx + 1), "not") {
        idx += 3;
    }
    let def_tokens = rest.get(idx..).unwrap_or_default();
    let column = parse_column_def(def_tokens, warnings)?;
    Some(SqlOp::AddColumn { table, column })
}

fn parse_add_constraint(
    stmt: &str,
    table: String,
    name: Option<String>,
    rest: &[String],
    idx: usize,
    warnings: &mut Vec<ParseWarning>,
) -> Option<SqlOp> {
    let mut idx = idx;
    let kind_word = rest.get(idx).map(|t| word_of(t).to_ascii_lowercase());
    let kind = match kind_word.as_deref() {
        Some("primary") => {
            if is_kw(rest.get(idx + 1), "key") && parens_of(&rest[idx]).is_none() {
                idx += 1;
            }
            ConstraintKind::PrimaryKey
        }
        Some("unique") => ConstraintKind::Unique,
        Some("foreign") => {
            warnings.push(ParseWarning::new(
                stmt,
                "Unsupported FOREIGN KEY constraint",
            ));
            return None;
        }
        _ => {
            warnings.push(ParseWarning::new(stmt, "Unsupported ADD CONSTRAINT kind"));
            return None;
        }
    };

    let (payload, _) = match paren_payload(rest, idx) {
        Some(found) => found,
        None => {
            warnings.push(ParseWarning::new(
                stmt,
                "Unsupported constraint without a column list",
            ));
            return None;
        }
    };
    let columns: Vec<String> = split_top_level(&payload, ',')
        .iter()
        .map(|c| normalize::ident(c))
        .collect();

    Some(SqlOp::AddConstraint {
        table,
        kind,
        name,
        columns,
    })
}

fn parse_alter_column(
    stmt: &str,
    table: String,
    rest: &[String],
    warnings: &mut Vec<ParseWarning>,
) -> Option<SqlOp> {
    let mut idx = 1;
    if is_kw(rest.get(idx), "column") {
        idx += 1;
    }
    let column = normalize::ident(word_of(rest.get(idx)?));
    idx += 1;

    let verb = rest.get(idx).map(|t| t.to_ascii_lowercase());
    match verb.as_deref() {
        Some("type") => {
            // Gather type tokens up to an optional USING clause.
            let mut type_parts: Vec<&str> = Vec::new();
            idx += 1;
            while idx < rest.len() && !rest[idx].eq_ignore_ascii_case("using") {
                type_parts.push(&rest[idx]);
                idx += 1;
            }
            if type_parts.is_empty() {
                warnings.push(ParseWarning::new(stmt, "Unsupported ALTER COLUMN TYPE"));
                return None;
            }
            Some(SqlOp::AlterColumnType {
                table,
                column,
                ty: ColumnType::new(&type_parts.join(" ")),
            })
        }
        Some("set") => match rest.get(idx + 1).map(|t| t.to_ascii_lowercase()).as_deref() {
            Some("not") => Some(SqlOp::SetNotNull { table, column }),
            Some("default") => {
                let expr_parts: Vec<&str> =
                    rest[idx + 2..].iter().map(String::as_str).collect();
                if expr_parts.is_empty() {
                    warnings.push(ParseWarning::new(
                        stmt,
                        "Unsupported SET DEFAULT without an expression",
                    ));
                    return None;
                }
                Some(SqlOp::SetDefault {
                    table,
                    column,
                    expr: normalize::default_expr(&expr_parts.join(" ")),
                })
            }
            _ => {
                warnings.push(ParseWarning::new(stmt, "Unsupported ALTER COLUMN action"));
                None
            }
        },
        Some("drop") => match rest.get(idx + 1).map(|t| t.to_ascii_lowercase()).as_deref() {
            Some("not") => Some(SqlOp::DropNotNull { table, column }),
            Some("default") => Some(SqlOp::DropDefault { table, column }),
            _ => {
                warnings.push(ParseWarning::new(stmt, "Unsupported ALTER COLUMN action"));
                None
            }
        },
        _ => {
            warnings.push(ParseWarning::new(stmt, "Unsupported ALTER COLUMN action"));
            None
        }
    }
}

fn parse_alter_drop(
    stmt: &str,
    table: String,
    rest: &[String],
    warnings: &mut Vec<ParseWarning>,
) -> Option<SqlOp> {
    let mut idx = 1;
    if is_kw(rest.get(idx), "constraint") {
        idx += 1;
        if is_kw(rest.get(idx), "if") && is_kw(rest.get(idx + 1), "exists") {
            idx += 2;
        }
        let name = normalize::ident(word_of(rest.get(idx)?));
        return Some(SqlOp::DropConstraint { table, name });
    }

    if is_kw(rest.get(idx), "column") {
        idx += 1;
    }
    if is_kw(rest.get(idx), "if") && is_kw(rest.get(idx + 1), "exists") {
        idx += 2;
    }
    match rest.get(idx) {
        Some(tok) => Some(SqlOp::DropColumn {
            table,
            column: normalize::ident(word_of(tok)),
        }),
        None => {
            warnings.push(ParseWarning::new(stmt, "Unsupported ALTER TABLE DROP"));
            None
        }
    }
}

fn parse_drop_table(tokens: &[String]) -> Option<SqlOp> {
    let mut idx = 2;
    if is_kw(tokens.get(idx), "if") && is_kw(tokens.get(idx + 1), "exists") {
        idx += 2;
    }
    let table = normalize::ident(word_of(tokens.get(idx)?));
    Some(SqlOp::DropTable { table })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(stmt: &str) -> SqlOp {
        let (op, warnings) = parse_statement(stmt);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        op.expect("expected an operation")
    }

    #[test]
    fn tokenizer_keeps_paren_groups_together() {
        let tokens = tokenize("ADD COLUMN price numeric(10, 2) NOT NULL");
        assert_eq!(
            tokens,
            vec!["ADD", "COLUMN", "price", "numeric(10, 2)", "NOT", "NULL"]
        );
    }

    #[test]
    fn tokenizer_keeps_quoted_strings_together() {
        let tokens = tokenize("SET DEFAULT 'two words'");
        assert_eq!(tokens, vec!["SET", "DEFAULT", "'two words'"]);
    }

    #[test]
    fn create_table_basic() {
        let op = parse_one(
            "CREATE TABLE users (id uuid PRIMARY KEY, email varchar(255) UNIQUE NOT NULL)",
        );
        match op {
            SqlOp::CreateTable {
                table,
                columns,
                constraints,
            } => {
                assert_eq!(table, "users");
                assert!(constraints.is_empty());
                assert_eq!(columns.len(), 2);
                assert!(columns[0].primary_key);
                assert!(!columns[0].nullable);
                assert_eq!(columns[1].ty.as_str(), "varchar(255)");
                assert!(columns[1].unique);
                assert!(!columns[1].nullable);
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn create_table_strips_schema_qualifier_and_quotes() {
        let op = parse_one("CREATE TABLE public.\"Users\" (\"Id\" uuid PRIMARY KEY)");
        match op {
            SqlOp::CreateTable { table, columns, .. } => {
                assert_eq!(table, "users");
                assert_eq!(columns[0].name, "id");
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn create_table_multi_token_default_preserved() {
        let op = parse_one(
            "CREATE TABLE events (at timestamptz DEFAULT timezone('utc', now()) NOT NULL)",
        );
        match op {
            SqlOp::CreateTable { columns, .. } => {
                assert_eq!(
                    columns[0].default.as_deref(),
                    Some("timezone('utc',now())")
                );
                assert!(!columns[0].nullable);
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn create_table_comma_inside_default_does_not_split_columns() {
        let op = parse_one(
            "CREATE TABLE t (a numeric(10, 2) DEFAULT round(1.5, 1), b text)",
        );
        match op {
            SqlOp::CreateTable { columns, .. } => {
                assert_eq!(columns.len(), 2);
                assert_eq!(columns[0].ty.as_str(), "numeric(10,2)");
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn create_table_with_named_table_constraint() {
        let op = parse_one(
            "CREATE TABLE t (id uuid, CONSTRAINT pk_t PRIMARY KEY (id))",
        );
        match op {
            SqlOp::CreateTable { constraints, .. } => {
                assert_eq!(constraints.len(), 1);
                assert_eq!(constraints[0].kind, ConstraintKind::PrimaryKey);
                assert_eq!(constraints[0].name.as_deref(), Some("pk_t"));
                assert_eq!(constraints[0].columns, vec!["id"]);
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn create_table_references() {
        let op = parse_one("CREATE TABLE posts (author_id uuid REFERENCES users(id))");
        match op {
            SqlOp::CreateTable { columns, .. } => {
                let fk = columns[0].foreign_key.as_ref().expect("foreign key");
                assert_eq!(fk.table, "users");
                assert_eq!(fk.column, "id");
            }
            other => panic!("expected CreateTable, got {other:?}"),
        }
    }

    #[test]
    fn create_table_foreign_key_constraint_warns() {
        let (op, warnings) = parse_statement(
            "CREATE TABLE t (a uuid, FOREIGN KEY (a) REFERENCES u(id))",
        );
        assert!(op.is_some());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("Unsupported"));
    }

    #[test]
    fn add_column() {
        let op = parse_one("ALTER TABLE users ADD COLUMN email varchar(255) UNIQUE");
        assert_eq!(
            op,
            SqlOp::AddColumn {
                table: "users".to_string(),
                column: Column::new("email", "varchar(255)").unique(),
            }
        );
    }

    #[test]
    fn add_column_without_column_keyword() {
        let op = parse_one("ALTER TABLE users ADD age int");
        match op {
            SqlOp::AddColumn { column, .. } => assert_eq!(column.ty.as_str(), "int"),
            other => panic!("expected AddColumn, got {other:?}"),
        }
    }

    #[test]
    fn alter_column_type_ignores_using_clause() {
        let op = parse_one("ALTER TABLE users ALTER COLUMN age TYPE bigint USING age::bigint");
        assert_eq!(
            op,
            SqlOp::AlterColumnType {
                table: "users".to_string(),
                column: "age".to_string(),
                ty: ColumnType::new("bigint"),
            }
        );
    }

    #[test]
    fn set_and_drop_not_null() {
        assert_eq!(
            parse_one("ALTER TABLE t ALTER COLUMN c SET NOT NULL"),
            SqlOp::SetNotNull {
                table: "t".to_string(),
                column: "c".to_string()
            }
        );
        assert_eq!(
            parse_one("ALTER TABLE t ALTER COLUMN c DROP NOT NULL"),
            SqlOp::DropNotNull {
                table: "t".to_string(),
                column: "c".to_string()
            }
        );
    }

    #[test]
    fn set_default_normalizes_expression() {
        let op = parse_one("ALTER TABLE t ALTER COLUMN c SET DEFAULT NOW()");
        assert_eq!(
            op,
            SqlOp::SetDefault {
                table: "t".to_string(),
                column: "c".to_string(),
                expr: "now()".to_string(),
            }
        );
    }

    #[test]
    fn drop_default() {
        assert_eq!(
            parse_one("ALTER TABLE t ALTER COLUMN c DROP DEFAULT"),
            SqlOp::DropDefault {
                table: "t".to_string(),
                column: "c".to_string()
            }
        );
    }

    #[test]
    fn add_constraint_named_and_anonymous() {
        let op = parse_one("ALTER TABLE users ADD CONSTRAINT uq_users_email UNIQUE (email)");
        assert_eq!(
            op,
            SqlOp::AddConstraint {
                table: "users".to_string(),
                kind: ConstraintKind::Unique,
                name: Some("uq_users_email".to_string()),
                columns: vec!["email".to_string()],
            }
        );

        let op = parse_one("ALTER TABLE users ADD PRIMARY KEY (id)");
        assert_eq!(
            op,
            SqlOp::AddConstraint {
                table: "users".to_string(),
                kind: ConstraintKind::PrimaryKey,
                name: None,
                columns: vec!["id".to_string()],
            }
        );
    }

    #[test]
    fn drop_constraint_with_if_exists() {
        let op = parse_one("ALTER TABLE users DROP CONSTRAINT IF EXISTS users_pkey");
        assert_eq!(
            op,
            SqlOp::DropConstraint {
                table: "users".to_string(),
                name: "users_pkey".to_string(),
            }
        );
    }

    #[test]
    fn drop_column_and_table() {
        assert_eq!(
            parse_one("ALTER TABLE users DROP COLUMN bio"),
            SqlOp::DropColumn {
                table: "users".to_string(),
                column: "bio".to_string()
            }
        );
        assert_eq!(
            parse_one("DROP TABLE IF EXISTS users"),
            SqlOp::DropTable {
                table: "users".to_string()
            }
        );
    }

    #[test]
    fn unsupported_statement_warns_once() {
        let (op, warnings) = parse_statement("CREATE INDEX idx ON users(email)");
        assert!(op.is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("Unsupported"));
        assert!(warnings[0].statement.contains("CREATE INDEX"));
    }

    #[test]
    fn parse_sql_accumulates_across_statements() {
        let sql = "CREATE TABLE a (id int);\nCREATE INDEX i ON a(id);\nDROP TABLE a;";
        let (ops, warnings) = parse_sql(sql);
        assert_eq!(ops.len(), 2);
        assert_eq!(warnings.len(), 1);
    }
}
