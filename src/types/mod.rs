mod field_value;
mod row;
mod sql_value;

pub use field_value::FieldValue;
pub(crate) use row::{decode_scalar, map_rows};
pub use row::{RawQueryResult, ScanRow, ScanSurface, ScanValue};
pub use sql_value::SqlValue;
