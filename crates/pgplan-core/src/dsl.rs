//! The declarative schema text format.
//!
//! Parses `table name { .. }` blocks into a [`Schema`] and renders a
//! schema back into the same grammar (the import workflow's output is
//! guaranteed to parse again). One column per line:
//!
//! ```text
//! table users {
//!   id uuid pk
//!   email varchar(255) unique
//!   org_id uuid references orgs(id)
//!   created_at timestamptz not null default now()
//! }
//! ```
//!
//! `#` starts a full-line comment. A table-level `primary key <column>`
//! line names the primary key without flagging the column.

use crate::ddl::{parens_of, tokenize, word_of};
use crate::error::DslError;
use crate::normalize;
use crate::schema::{Column, ColumnType, ForeignKey, Schema, Table};

/// Attribute keywords that terminate a column's type token run.
fn is_attr_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "pk" | "unique" | "not" | "null" | "nullable" | "default" | "references"
    )
}

/// Parses declarative schema text.
///
/// # Errors
///
/// Returns a line-numbered [`DslError`] on malformed input. Structural
/// problems (duplicate names, dangling references) are left to the
/// validator.
pub fn parse_schema(text: &str) -> Result<Schema, DslError> {
    let mut schema = Schema::new();
    let mut current: Option<(Table, usize)> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if current.is_none() {
            let table = parse_table_header(line, line_no)?;
            current = Some((table, line_no));
        } else if line == "}" {
            if let Some((table, _)) = current.take() {
                schema.tables.push(table);
            }
        } else if let Some((ref mut table, _)) = current {
            parse_body_line(table, line, line_no)?;
        }
    }

    if let Some((table, opened_at)) = current {
        return Err(DslError::new(
            opened_at,
            format!("table '{}' block is never closed", table.name),
        ));
    }
    Ok(schema)
}

fn parse_table_header(line: &str, line_no: usize) -> Result<Table, DslError> {
    let Some(body) = line.strip_suffix('{') else {
        return Err(DslError::new(line_no, "expected 'table <name> {'"));
    };
    let tokens: Vec<&str> = body.split_whitespace().collect();
    match tokens.as_slice() {
        ["table", name] => Ok(Table::new(name)),
        _ => Err(DslError::new(line_no, "expected 'table <name> {'")),
    }
}

fn parse_body_line(table: &mut Table, line: &str, line_no: usize) -> Result<(), DslError> {
    let tokens = tokenize(line);

    // Table-level primary key line.
    if tokens.len() == 3
        && tokens[0].eq_ignore_ascii_case("primary")
        && tokens[1].eq_ignore_ascii_case("key")
    {
        table.primary_key = Some(normalize::ident(&tokens[2]));
        return Ok(());
    }

    let column = parse_column_line(&tokens, line_no)?;
    table.columns.push(column);
    Ok(())
}

fn parse_column_line(tokens: &[String], line_no: usize) -> Result<Column, DslError> {
    let name_tok = tokens
        .first()
        .ok_or_else(|| DslError::new(line_no, "expected a column definition"))?;
    let name = normalize::ident(name_tok);

    let mut i = 1;
    let mut type_parts: Vec<&str> = Vec::new();
    while i < tokens.len() && !is_attr_keyword(word_of(&tokens[i])) {
        type_parts.push(&tokens[i]);
        i += 1;
    }
    if type_parts.is_empty() {
        return Err(DslError::new(
            line_no,
            format!("column '{name}' is missing a type"),
        ));
    }
    let mut column = Column::new(&name, ColumnType::new(&type_parts.join(" ")));

    while i < tokens.len() {
        let word = word_of(&tokens[i]).to_ascii_lowercase();
        match word.as_str() {
            "pk" => {
                column.primary_key = true;
                column.nullable = false;
                i += 1;
            }
            "unique" => {
                column.unique = true;
                i += 1;
            }
            "not" => {
                if !tokens
                    .get(i + 1)
                    .is_some_and(|t| t.eq_ignore_ascii_case("null"))
                {
                    return Err(DslError::new(line_no, "expected 'not null'"));
                }
                column.nullable = false;
                i += 2;
            }
            "nullable" => {
                column.nullable = true;
                i += 1;
            }
            "default" => {
                let mut expr_parts: Vec<&str> = Vec::new();
                i += 1;
                if i < tokens.len() {
                    expr_parts.push(&tokens[i]);
                    i += 1;
                }
                while i < tokens.len() && !is_attr_keyword(word_of(&tokens[i])) {
                    expr_parts.push(&tokens[i]);
                    i += 1;
                }
                if expr_parts.is_empty() {
                    return Err(DslError::new(
                        line_no,
                        format!("column '{name}' has 'default' without an expression"),
                    ));
                }
                column.default = Some(normalize::default_expr(&expr_parts.join(" ")));
            }
            "references" => {
                let target = tokens.get(i + 1).ok_or_else(|| {
                    DslError::new(
                        line_no,
                        format!("column '{name}' has 'references' without a target"),
                    )
                })?;
                let target_table = normalize::ident(word_of(target));
                let target_column = parens_of(target)
                    .or_else(|| tokens.get(i + 2).and_then(|t| parens_of(t)))
                    .ok_or_else(|| {
                        DslError::new(
                            line_no,
                            format!("column '{name}' references must be 'table(column)'"),
                        )
                    })?;
                let consumed_extra = parens_of(target).is_none();
                column.foreign_key = Some(ForeignKey::new(&target_table, target_column));
                i += if consumed_extra { 3 } else { 2 };
            }
            other => {
                return Err(DslError::new(
                    line_no,
                    format!("unknown attribute '{other}' on column '{name}'"),
                ));
            }
        }
    }
    Ok(column)
}

/// Renders a schema back into the declarative text format.
///
/// Tables are emitted in lexicographic order; columns keep their order.
/// The output always parses back through [`parse_schema`].
#[must_use]
pub fn render_schema(schema: &Schema) -> String {
    let mut out = String::new();
    for (i, table) in schema.sorted_tables().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("table {} {{\n", table.name));

        // The explicit field is only worth a line when no column carries
        // the flag; otherwise the flag already says it.
        if let Some(ref pk) = table.primary_key {
            let flagged = table.get_column(pk).is_some_and(|c| c.primary_key);
            if !flagged {
                out.push_str(&format!("  primary key {pk}\n"));
            }
        }

        for col in &table.columns {
            out.push_str("  ");
            out.push_str(&col.name);
            out.push(' ');
            out.push_str(col.ty.as_str());
            if col.primary_key {
                out.push_str(" pk");
            }
            if col.unique {
                out.push_str(" unique");
            }
            if !col.nullable && !col.primary_key {
                out.push_str(" not null");
            }
            if let Some(ref default) = col.default {
                out.push_str(&format!(" default {default}"));
            }
            if let Some(ref fk) = col.foreign_key {
                out.push_str(&format!(" references {}({})", fk.table, fk.column));
            }
            out.push('\n');
        }
        out.push_str("}\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# user-facing tables
table users {
  id uuid pk
  email varchar(255) unique not null
  created_at timestamptz not null default now()
}

table posts {
  id uuid pk
  author_id uuid references users(id)
  body text nullable
}
";

    #[test]
    fn parses_sample_schema() {
        let schema = parse_schema(SAMPLE).unwrap();
        assert_eq!(schema.tables.len(), 2);

        let users = schema.get_table("users").unwrap();
        assert_eq!(users.resolved_primary_key(), Some("id"));
        let email = users.get_column("email").unwrap();
        assert!(email.unique);
        assert!(!email.nullable);
        assert_eq!(
            users.get_column("created_at").unwrap().default.as_deref(),
            Some("now()")
        );

        let posts = schema.get_table("posts").unwrap();
        let fk = posts.get_column("author_id").unwrap().foreign_key.as_ref().unwrap();
        assert_eq!(fk.table, "users");
        assert_eq!(fk.column, "id");
    }

    #[test]
    fn table_level_primary_key_line() {
        let schema = parse_schema("table t {\n  primary key id\n  id uuid\n}\n").unwrap();
        let t = schema.get_table("t").unwrap();
        assert_eq!(t.primary_key.as_deref(), Some("id"));
        assert_eq!(t.resolved_primary_key(), Some("id"));
    }

    #[test]
    fn multi_token_default_is_preserved() {
        let schema =
            parse_schema("table t {\n  at timestamptz default timezone('utc', now())\n}\n")
                .unwrap();
        let at = schema.get_table("t").unwrap().get_column("at").unwrap();
        assert_eq!(at.default.as_deref(), Some("timezone('utc',now())"));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_schema("table users {\n  id\n}\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("missing a type"));

        let err = parse_schema("users {\n}\n").unwrap_err();
        assert_eq!(err.line, 1);

        let err = parse_schema("table users {\n  id uuid frobnicate\n}\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("frobnicate"));
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let err = parse_schema("table users {\n  id uuid\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("never closed"));
    }

    #[test]
    fn render_is_lexicographic_and_parses_back() {
        let schema = parse_schema(SAMPLE).unwrap();
        let rendered = render_schema(&schema);

        // posts < users lexicographically.
        let posts_at = rendered.find("table posts").unwrap();
        let users_at = rendered.find("table users").unwrap();
        assert!(posts_at < users_at);

        let reparsed = parse_schema(&rendered).unwrap();
        for table in &schema.tables {
            let back = reparsed.get_table(&table.name).expect("table survives");
            assert_eq!(back.columns, table.columns, "columns of {}", table.name);
            assert_eq!(back.resolved_primary_key(), table.resolved_primary_key());
        }
    }

    #[test]
    fn render_emits_primary_key_line_only_without_flag() {
        let schema = parse_schema("table t {\n  primary key id\n  id uuid\n}\n").unwrap();
        let rendered = render_schema(&schema);
        assert!(rendered.contains("  primary key id\n"));

        let flagged = parse_schema("table t {\n  id uuid pk\n}\n").unwrap();
        assert!(!render_schema(&flagged).contains("primary key id"));
    }
}
