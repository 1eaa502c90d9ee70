use std::fmt;

use crate::builders::Accumulator;
use crate::clauses::{render_where, ParamCursor, WriteSet};
use crate::error::{PgFluentError, Result};
use crate::types::SqlValue;

/// Terminal operations of the fluent builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Find,
    Count,
    Sum,
    Avg,
    Insert,
    Update,
    Delete,
    Increment,
    Decrement,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Find => "find",
            OperationKind::Count => "count",
            OperationKind::Sum => "sum",
            OperationKind::Avg => "avg",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Increment => "increment",
            OperationKind::Decrement => "decrement",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal SQL text plus the arguments for its `$n` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: OperationKind,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Double-quotes an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quoted_table(acc: &Accumulator, kind: OperationKind) -> Result<String> {
    if acc.table.trim().is_empty() {
        return Err(PgFluentError::usage(kind, "no table name given"));
    }
    Ok(quote_ident(&acc.table))
}

fn push_where(sql: &mut String, where_sql: Option<String>) {
    if let Some(where_sql) = where_sql {
        sql.push_str(" WHERE ");
        sql.push_str(&where_sql);
    }
}

/// Assembles a statement that needs nothing beyond the accumulator:
/// find, count, sum, avg and delete.
pub fn assemble(kind: OperationKind, acc: &Accumulator) -> Result<Statement> {
    let table = quoted_table(acc, kind)?;
    let mut cursor = ParamCursor::new();
    let mut sql = String::with_capacity(256);

    match kind {
        OperationKind::Find => {
            sql.push_str("SELECT ");
            sql.push_str(&acc.fields);
            sql.push_str(" FROM ");
            sql.push_str(&table);
            push_where(&mut sql, render_where(&acc.predicates, &mut cursor, kind)?);

            if let Some(group) = acc.group.as_deref().filter(|g| !g.trim().is_empty()) {
                sql.push_str(" GROUP BY ");
                sql.push_str(group);
            }
            if let Some((field, direction)) = acc.sort.as_ref().filter(|(f, _)| !f.trim().is_empty()) {
                sql.push_str(" ORDER BY ");
                sql.push_str(field);
                sql.push(' ');
                sql.push_str(&direction.to_string());
            }
            if let Some(offset) = acc.offset.filter(|n| *n > 0) {
                sql.push_str(" OFFSET ");
                sql.push_str(&offset.to_string());
            }
            if let Some(limit) = acc.limit.filter(|n| *n > 0) {
                sql.push_str(" LIMIT ");
                sql.push_str(&limit.to_string());
            }
        }
        OperationKind::Count => {
            sql.push_str("SELECT ");
            if acc.has_projection() {
                sql.push_str(&acc.fields);
            } else {
                sql.push_str("COUNT(*)");
            }
            sql.push_str(" FROM ");
            sql.push_str(&table);
            push_where(&mut sql, render_where(&acc.predicates, &mut cursor, kind)?);
        }
        OperationKind::Sum | OperationKind::Avg => {
            if !acc.has_projection() {
                return Err(PgFluentError::usage(
                    kind,
                    "select the field to aggregate first, e.g. .select(\"amount\")",
                ));
            }
            let function = if kind == OperationKind::Sum { "SUM" } else { "AVG" };
            sql.push_str("SELECT ");
            sql.push_str(function);
            sql.push('(');
            sql.push_str(&acc.fields);
            sql.push_str(") FROM ");
            sql.push_str(&table);
            push_where(&mut sql, render_where(&acc.predicates, &mut cursor, kind)?);
        }
        OperationKind::Delete => {
            if acc.predicates.is_empty() {
                return Err(PgFluentError::usage(
                    kind,
                    "refusing to delete without a condition",
                ));
            }
            sql.push_str("DELETE FROM ");
            sql.push_str(&table);
            push_where(&mut sql, render_where(&acc.predicates, &mut cursor, kind)?);
        }
        OperationKind::Insert
        | OperationKind::Update
        | OperationKind::Increment
        | OperationKind::Decrement => {
            return Err(PgFluentError::usage(
                kind,
                "statement needs write values or a field name",
            ));
        }
    }

    Ok(Statement {
        kind,
        sql,
        params: cursor.into_params(),
    })
}

/// `INSERT INTO "t" ("a", "b") VALUES ($1, $2)[, ($3, $4)...]`
pub fn assemble_insert(
    acc: &Accumulator,
    resolve: impl FnOnce(&mut ParamCursor) -> Result<WriteSet>,
) -> Result<Statement> {
    let kind = OperationKind::Insert;
    let table = quoted_table(acc, kind)?;
    let mut cursor = ParamCursor::new();
    let set = resolve(&mut cursor)?;

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        set.column_list(),
        set.values_list()
    );
    Ok(Statement {
        kind,
        sql,
        params: cursor.into_params(),
    })
}

/// `UPDATE "t" SET ("a", "b") = ($2, $3) WHERE id=$1`
///
/// WHERE placeholders are numbered first; SET values continue after them.
/// A single column is written as `SET "a" = $n` since PostgreSQL rejects a
/// parenthesised one-column list without ROW().
pub fn assemble_update(
    acc: &Accumulator,
    resolve: impl FnOnce(&mut ParamCursor) -> Result<WriteSet>,
) -> Result<Statement> {
    let kind = OperationKind::Update;
    let table = quoted_table(acc, kind)?;
    let mut cursor = ParamCursor::new();
    let where_sql = render_where(&acc.predicates, &mut cursor, kind)?;
    let set = resolve(&mut cursor)?;

    let mut sql = format!("UPDATE {table} SET ");
    match (set.columns(), set.rows().first()) {
        ([column], Some(row)) if row.len() == 1 => {
            sql.push_str(column);
            sql.push_str(" = ");
            sql.push_str(&row[0]);
        }
        _ => {
            sql.push('(');
            sql.push_str(&set.column_list());
            sql.push_str(") = ");
            sql.push_str(&set.values_list());
        }
    }
    push_where(&mut sql, where_sql);

    Ok(Statement {
        kind,
        sql,
        params: cursor.into_params(),
    })
}

/// `UPDATE "t" SET "f" = "f" + 1 [WHERE ...]` (or `- 1` for decrement)
pub fn assemble_step(kind: OperationKind, acc: &Accumulator, field: &str) -> Result<Statement> {
    let operator = match kind {
        OperationKind::Increment => '+',
        OperationKind::Decrement => '-',
        other => {
            return Err(PgFluentError::usage(
                other,
                "only increment and decrement step a field",
            ))
        }
    };
    if field.trim().is_empty() {
        return Err(PgFluentError::usage(kind, "no field name given"));
    }

    let table = quoted_table(acc, kind)?;
    let mut cursor = ParamCursor::new();
    let field = quote_ident(field);
    let mut sql = format!("UPDATE {table} SET {field} = {field} {operator} 1");
    push_where(&mut sql, render_where(&acc.predicates, &mut cursor, kind)?);

    Ok(Statement {
        kind,
        sql,
        params: cursor.into_params(),
    })
}
