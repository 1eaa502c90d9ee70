use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{PgFluentError, Result};
use crate::traits::FieldType;
use crate::types::{ScanValue, SqlValue};

/// Conversion between a Rust field type, its scan receptacle, and a SQL parameter.
///
/// This is the typed coercion table the row mapper uses: `FIELD_TYPE` picks the
/// receptacle a column is decoded into, `from_scan_value` turns the decoded value
/// into the field, and `to_sql_value` produces the write argument.
pub trait FieldValue: Sized {
    const FIELD_TYPE: FieldType;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self>;

    fn to_sql_value(&self) -> SqlValue;
}

fn mismatch(value: &ScanValue, column: &str, expected: &str) -> PgFluentError {
    match value {
        ScanValue::Null => PgFluentError::decode(column, format!("unexpected NULL for {expected}")),
        other => PgFluentError::decode(column, format!("expected {expected}, got {other:?}")),
    }
}

macro_rules! impl_integer_field {
    ($($t:ty => $to_sql:expr),* $(,)?) => {$(
        impl FieldValue for $t {
            const FIELD_TYPE: FieldType = FieldType::Integer;

            fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
                match value {
                    ScanValue::Integer(raw) => <$t>::try_from(raw).map_err(|_| {
                        PgFluentError::decode(
                            column,
                            format!("{} is out of range for {}", raw, stringify!($t)),
                        )
                    }),
                    other => Err(mismatch(&other, column, "an integer")),
                }
            }

            fn to_sql_value(&self) -> SqlValue {
                let to_sql: fn($t) -> SqlValue = $to_sql;
                to_sql(*self)
            }
        }

        impl FieldValue for Option<$t> {
            const FIELD_TYPE: FieldType = FieldType::OptionalInteger;

            fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
                match value {
                    ScanValue::Null => Ok(None),
                    other => <$t>::from_scan_value(other, column).map(Some),
                }
            }

            fn to_sql_value(&self) -> SqlValue {
                self.as_ref().map_or(SqlValue::Null, FieldValue::to_sql_value)
            }
        }
    )*};
}

impl_integer_field! {
    i8 => |v| SqlValue::Int32(i32::from(v)),
    i16 => |v| SqlValue::Int32(i32::from(v)),
    i32 => SqlValue::Int32,
    i64 => SqlValue::Int64,
    u8 => |v| SqlValue::Int32(i32::from(v)),
    u16 => |v| SqlValue::Int32(i32::from(v)),
    u32 => |v| SqlValue::Int64(i64::from(v)),
    // PostgreSQL has no unsigned 64-bit type; values past i64::MAX go as text.
    u64 => |v| i64::try_from(v).map_or_else(|_| SqlValue::Text(v.to_string()), SqlValue::Int64),
}

impl FieldValue for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Float(v) => Ok(v),
            other => Err(mismatch(&other, column, "a float")),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float64(*self)
    }
}

impl FieldValue for f32 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        f64::from_scan_value(value, column).map(|v| v as f32)
    }

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Float64(f64::from(*self))
    }
}

impl FieldValue for Option<f64> {
    const FIELD_TYPE: FieldType = FieldType::OptionalFloat;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Null => Ok(None),
            other => f64::from_scan_value(other, column).map(Some),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        (*self).into()
    }
}

impl FieldValue for Option<f32> {
    const FIELD_TYPE: FieldType = FieldType::OptionalFloat;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Null => Ok(None),
            other => f32::from_scan_value(other, column).map(Some),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        (*self).into()
    }
}

impl FieldValue for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Bool(v) => Ok(v),
            other => Err(mismatch(&other, column, "a boolean")),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

impl FieldValue for Option<bool> {
    const FIELD_TYPE: FieldType = FieldType::OptionalBool;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Null => Ok(None),
            other => bool::from_scan_value(other, column).map(Some),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        (*self).into()
    }
}

impl FieldValue for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Text(v) => Ok(v),
            other => Err(mismatch(&other, column, "text")),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl FieldValue for Option<String> {
    const FIELD_TYPE: FieldType = FieldType::OptionalText;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Null => Ok(None),
            other => String::from_scan_value(other, column).map(Some),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        self.as_deref().into()
    }
}

impl FieldValue for DateTime<Utc> {
    const FIELD_TYPE: FieldType = FieldType::Timestamp;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Timestamp(v) => Ok(v),
            other => Err(mismatch(&other, column, "a timestamp")),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }
}

impl FieldValue for NaiveDateTime {
    const FIELD_TYPE: FieldType = FieldType::Timestamp;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        DateTime::<Utc>::from_scan_value(value, column).map(|v| v.naive_utc())
    }

    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Timestamp(self.and_utc())
    }
}

impl FieldValue for Option<DateTime<Utc>> {
    const FIELD_TYPE: FieldType = FieldType::OptionalTimestamp;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Null => Ok(None),
            other => DateTime::<Utc>::from_scan_value(other, column).map(Some),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        (*self).into()
    }
}

impl FieldValue for Option<NaiveDateTime> {
    const FIELD_TYPE: FieldType = FieldType::OptionalTimestamp;

    fn from_scan_value(value: ScanValue, column: &str) -> Result<Self> {
        match value {
            ScanValue::Null => Ok(None),
            other => NaiveDateTime::from_scan_value(other, column).map(Some),
        }
    }

    fn to_sql_value(&self) -> SqlValue {
        (*self).into()
    }
}
