use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{PgFluentError, Result};
use crate::traits::{FieldDescriptor, FieldType, Record};
use crate::types::FieldValue;

/// Driver-agnostic raw result from a database statement.
/// Drivers render every non-NULL value as text; NULL stays `None`.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of cells in column order
    pub rows: Vec<Vec<Option<String>>>,
    /// Rows touched by a write statement
    pub rows_affected: u64,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Result of a write statement touching `n` rows.
    pub fn affected(n: u64) -> Self {
        Self {
            rows_affected: n,
            ..Self::default()
        }
    }
}

/// A value decoded out of one receptacle.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanValue {
    Null,
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Text(String),
}

/// One scanned row, keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct ScanRow {
    values: HashMap<String, ScanValue>,
}

impl ScanRow {
    pub fn get(&self, column: &str) -> Option<&ScanValue> {
        self.values.get(column)
    }

    /// Moves a column's value into a field.
    /// A column the row does not carry yields the field's default.
    pub fn take<T: FieldValue + Default>(&mut self, column: &str) -> Result<T> {
        match self.values.remove(column) {
            Some(value) => T::from_scan_value(value, column),
            None => Ok(T::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One typed receptacle per result column, chosen from the destination's fields.
#[derive(Debug, Clone)]
pub struct ScanSurface {
    columns: Vec<String>,
    receptacles: Vec<FieldType>,
}

impl ScanSurface {
    /// Matches result columns against record fields by external column name.
    /// Fields without a column are skipped; columns without a field get a
    /// NULL-tolerant text receptacle.
    pub fn new(columns: &[String], fields: &[FieldDescriptor]) -> Self {
        let index: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.as_str(), i))
            .collect();

        let mut receptacles = vec![FieldType::OptionalText; columns.len()];
        for field in fields {
            if let Some(&i) = index.get(field.column) {
                receptacles[i] = field.field_type;
            }
        }

        Self {
            columns: columns.to_vec(),
            receptacles,
        }
    }

    pub fn receptacle(&self, column: &str) -> Option<FieldType> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.receptacles[i])
    }

    /// Decodes one row of text cells into typed values.
    pub fn scan(&self, cells: &[Option<String>]) -> Result<ScanRow> {
        if cells.len() != self.columns.len() {
            return Err(PgFluentError::decode(
                "*",
                format!(
                    "row has {} values but the result has {} columns",
                    cells.len(),
                    self.columns.len()
                ),
            ));
        }

        let mut values = HashMap::with_capacity(cells.len());
        for ((column, kind), cell) in self.columns.iter().zip(&self.receptacles).zip(cells) {
            let value = decode_cell(*kind, column, cell.as_deref())?;
            values.insert(column.clone(), value);
        }
        Ok(ScanRow { values })
    }
}

/// Maps raw rows onto records. With `first_only` decoding stops after one row.
pub(crate) fn map_rows<R: Record>(raw: &RawQueryResult, first_only: bool) -> Result<Vec<R>> {
    let surface = ScanSurface::new(&raw.columns, R::fields());
    let take = if first_only { 1 } else { raw.rows.len() };

    raw.rows
        .iter()
        .take(take)
        .map(|cells| {
            let mut row = surface.scan(cells)?;
            R::from_scan(&mut row)
        })
        .collect()
}

/// Decodes a single cell straight into `T`, for scalar results like aggregates.
pub(crate) fn decode_scalar<T: FieldValue>(column: &str, cell: Option<&str>) -> Result<T> {
    let value = decode_cell(T::FIELD_TYPE, column, cell)?;
    T::from_scan_value(value, column)
}

fn decode_cell(kind: FieldType, column: &str, cell: Option<&str>) -> Result<ScanValue> {
    let Some(text) = cell else {
        if kind.is_optional() {
            return Ok(ScanValue::Null);
        }
        return Err(PgFluentError::decode(
            column,
            format!("unexpected NULL for {kind:?} field"),
        ));
    };

    match kind {
        FieldType::Integer | FieldType::OptionalInteger => {
            parse_integer(text).map(ScanValue::Integer).ok_or_else(|| {
                PgFluentError::decode(column, format!("'{text}' is not an integer"))
            })
        }
        FieldType::Float | FieldType::OptionalFloat => text
            .trim()
            .parse::<f64>()
            .map(ScanValue::Float)
            .map_err(|e| PgFluentError::decode(column, format!("'{text}': {e}"))),
        FieldType::Bool | FieldType::OptionalBool => parse_bool(text)
            .map(ScanValue::Bool)
            .ok_or_else(|| PgFluentError::decode(column, format!("'{text}' is not a boolean"))),
        FieldType::Timestamp | FieldType::OptionalTimestamp => parse_timestamp(text)
            .map(ScanValue::Timestamp)
            .ok_or_else(|| PgFluentError::decode(column, format!("'{text}' is not a timestamp"))),
        FieldType::Text | FieldType::OptionalText => Ok(ScanValue::Text(text.to_string())),
    }
}

// NUMERIC results such as SUM(bigint) render as "12" or "12.000".
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let (whole, fraction) = text.split_once('.')?;
    if fraction.chars().all(|c| c == '0') {
        whole.parse::<i64>().ok()
    } else {
        None
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "t" | "true" | "TRUE" | "1" => Some(true),
        "f" | "false" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(v) = DateTime::parse_from_rfc3339(text) {
        return Some(v.with_timezone(&Utc));
    }
    if let Ok(v) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(v.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(v) = NaiveDateTime::parse_from_str(text, format) {
            return Some(v.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|v| v.and_utc())
}
