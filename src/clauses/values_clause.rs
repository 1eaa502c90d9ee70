use crate::builders::{quote_ident, OperationKind};
use crate::clauses::ParamCursor;
use crate::error::{PgFluentError, Result};
use crate::traits::Record;
use crate::types::SqlValue;

/// Token written in place of a database-assigned column.
pub const DEFAULT_TOKEN: &str = "DEFAULT";

/// Columns and value tokens for an INSERT or UPDATE.
/// Every row in `rows` lines up with `columns`.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl WriteSet {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// `"a", "b"`
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }

    /// `($1, $2), ($3, $4)`
    pub fn values_list(&self) -> String {
        self.rows
            .iter()
            .map(|row| format!("({})", row.join(", ")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn checked_values<R: Record>(record: &R, operation: OperationKind) -> Result<Vec<SqlValue>> {
    let values = record.values();
    if values.len() != R::fields().len() {
        return Err(PgFluentError::contract(
            operation,
            format!(
                "record yields {} values for {} fields",
                values.len(),
                R::fields().len()
            ),
        ));
    }
    Ok(values)
}

/// Builds the column list and one VALUES group per record.
///
/// The column list comes from the record type, so every group has the same
/// shape. Generated fields keep their column but are written as `DEFAULT`
/// without consuming a placeholder.
pub fn resolve_insert<R: Record>(records: &[R], cursor: &mut ParamCursor) -> Result<WriteSet> {
    if records.is_empty() {
        return Err(PgFluentError::contract(
            OperationKind::Insert,
            "nothing to insert",
        ));
    }
    let fields = R::fields();
    if fields.is_empty() {
        return Err(PgFluentError::contract(
            OperationKind::Insert,
            "record type has no fields",
        ));
    }

    let columns = fields.iter().map(|f| quote_ident(f.column)).collect();
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let values = checked_values(record, OperationKind::Insert)?;
        let row = fields
            .iter()
            .zip(values)
            .map(|(field, value)| {
                if field.generated {
                    DEFAULT_TOKEN.to_string()
                } else {
                    cursor.bind(value)
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(WriteSet { columns, rows })
}

/// Writes every non-generated field of `record`.
pub fn resolve_update_record<R: Record>(record: &R, cursor: &mut ParamCursor) -> Result<WriteSet> {
    let values = checked_values(record, OperationKind::Update)?;
    let mut columns = Vec::new();
    let mut row = Vec::new();
    for (field, value) in R::fields().iter().zip(values) {
        if field.generated {
            continue;
        }
        columns.push(quote_ident(field.column));
        row.push(cursor.bind(value));
    }

    if columns.is_empty() {
        return Err(PgFluentError::contract(
            OperationKind::Update,
            "record has no writable fields",
        ));
    }
    Ok(WriteSet {
        columns,
        rows: vec![row],
    })
}

/// Writes exactly the supplied columns, in the order given.
pub fn resolve_update_changes(
    changes: Vec<(String, SqlValue)>,
    cursor: &mut ParamCursor,
) -> Result<WriteSet> {
    if changes.is_empty() {
        return Err(PgFluentError::contract(
            OperationKind::Update,
            "no columns to update",
        ));
    }

    let mut columns = Vec::with_capacity(changes.len());
    let mut row = Vec::with_capacity(changes.len());
    for (column, value) in changes {
        columns.push(quote_ident(&column));
        row.push(cursor.bind(value));
    }
    Ok(WriteSet {
        columns,
        rows: vec![row],
    })
}
