use crate::error::Result;
use crate::types::{ScanRow, SqlValue};

/// Semantic type tag of a record field.
/// Selects the receptacle a result column is scanned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    OptionalInteger,
    Float,
    OptionalFloat,
    Bool,
    OptionalBool,
    Timestamp,
    OptionalTimestamp,
    Text,
    OptionalText,
}

impl FieldType {
    /// Whether the receptacle accepts SQL NULL.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            FieldType::OptionalInteger
                | FieldType::OptionalFloat
                | FieldType::OptionalBool
                | FieldType::OptionalTimestamp
                | FieldType::OptionalText
        )
    }
}

/// Static description of one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The Rust field name.
    pub name: &'static str,
    /// The column name used in SQL; the field name unless annotated.
    pub column: &'static str,
    pub field_type: FieldType,
    /// Assigned by the database (surrogate keys etc.), written as `DEFAULT`.
    pub generated: bool,
}

/// A row type the mapper can read into and the write resolver can read from.
///
/// Implementations are normally generated with the [`record!`](crate::record) macro,
/// which builds the descriptor table at compile time.
pub trait Record: Sized {
    /// Field descriptors in declaration order.
    fn fields() -> &'static [FieldDescriptor];

    /// Current field values, in the same order as [`Record::fields`].
    fn values(&self) -> Vec<SqlValue>;

    /// Builds an instance from one scanned row.
    /// Fields whose column is absent from the row take their default value.
    fn from_scan(row: &mut ScanRow) -> Result<Self>;
}

/// Target of a read: either a single record or a growable list of records.
pub trait Destination {
    type Record: Record;

    /// Whether every row is kept; otherwise reading stops after the first.
    const COLLECTS: bool;

    /// Stores decoded records. Only called once every row has decoded.
    fn fill(&mut self, records: Vec<Self::Record>);
}

impl<R: Record> Destination for Vec<R> {
    type Record = R;

    const COLLECTS: bool = true;

    fn fill(&mut self, records: Vec<R>) {
        *self = records;
    }
}

/// Declares a struct and implements [`Record`] and [`Destination`] for it.
///
/// Field attributes:
/// - `#[column("name")]` maps the field to a differently named column.
/// - `#[generated]` (or `#[primary]`) marks a database-assigned field.
///
/// Any other attribute, doc comments included, is kept on the field.
///
/// # Example
/// ```
/// use chrono::{DateTime, Utc};
///
/// pgfluent::record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Account {
///         #[generated]
///         pub id: i64,
///         #[column("user_name")]
///         pub name: String,
///         pub balance: f64,
///         pub closed_at: Option<DateTime<Utc>>,
///     }
/// }
///
/// use pgfluent::Record;
/// assert_eq!(Account::fields()[1].column, "user_name");
/// assert!(Account::fields()[0].generated);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$($fattr:tt)*])*
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $crate::__record_struct! {
            [$(#[$meta])* $vis struct $name] [] []
            $( $(#[$($fattr)*])* $fvis $field : $fty, )*
        }

        impl $crate::Record for $name {
            fn fields() -> &'static [$crate::FieldDescriptor] {
                static FIELDS: &[$crate::FieldDescriptor] = &[
                    $(
                        $crate::FieldDescriptor {
                            name: stringify!($field),
                            column: $crate::__record_column!($field; $([$($fattr)*])*),
                            field_type: <$fty as $crate::FieldValue>::FIELD_TYPE,
                            generated: $crate::__record_generated!($([$($fattr)*])*),
                        },
                    )*
                ];
                FIELDS
            }

            fn values(&self) -> ::std::vec::Vec<$crate::SqlValue> {
                ::std::vec![
                    $( $crate::FieldValue::to_sql_value(&self.$field), )*
                ]
            }

            fn from_scan(row: &mut $crate::ScanRow) -> $crate::Result<Self> {
                ::std::result::Result::Ok(Self {
                    $(
                        $field: row.take::<$fty>(
                            $crate::__record_column!($field; $([$($fattr)*])*)
                        )?,
                    )*
                })
            }
        }

        impl $crate::Destination for $name {
            type Record = $name;

            const COLLECTS: bool = false;

            fn fill(&mut self, records: ::std::vec::Vec<$name>) {
                if let ::std::option::Option::Some(first) = records.into_iter().next() {
                    *self = first;
                }
            }
        }
    };
}

/// Emits the struct, dropping `column`, `generated` and `primary` and
/// keeping every other field attribute (doc comments included).
#[doc(hidden)]
#[macro_export]
macro_rules! __record_struct {
    ([$($head:tt)*] [$($done:tt)*] []) => {
        $($head)* { $($done)* }
    };
    ([$($head:tt)*] [$($done:tt)*] [$($keep:tt)*] #[column $($args:tt)*] $($rest:tt)*) => {
        $crate::__record_struct!([$($head)*] [$($done)*] [$($keep)*] $($rest)*);
    };
    ([$($head:tt)*] [$($done:tt)*] [$($keep:tt)*] #[generated] $($rest:tt)*) => {
        $crate::__record_struct!([$($head)*] [$($done)*] [$($keep)*] $($rest)*);
    };
    ([$($head:tt)*] [$($done:tt)*] [$($keep:tt)*] #[primary] $($rest:tt)*) => {
        $crate::__record_struct!([$($head)*] [$($done)*] [$($keep)*] $($rest)*);
    };
    ([$($head:tt)*] [$($done:tt)*] [$($keep:tt)*] #[$($attr:tt)*] $($rest:tt)*) => {
        $crate::__record_struct!([$($head)*] [$($done)*] [$($keep)* #[$($attr)*]] $($rest)*);
    };
    ([$($head:tt)*] [$($done:tt)*] [$($keep:tt)*] $fvis:vis $field:ident : $fty:ty, $($rest:tt)*) => {
        $crate::__record_struct!(
            [$($head)*] [$($done)* $($keep)* $fvis $field: $fty,] [] $($rest)*
        );
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_column {
    ($field:ident;) => {
        stringify!($field)
    };
    ($field:ident; [column($col:literal)] $($rest:tt)*) => {
        $col
    };
    ($field:ident; [$($other:tt)*] $($rest:tt)*) => {
        $crate::__record_column!($field; $($rest)*)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_generated {
    () => {
        false
    };
    ([generated] $($rest:tt)*) => {
        true
    };
    ([primary] $($rest:tt)*) => {
        true
    };
    ([$($other:tt)*] $($rest:tt)*) => {
        $crate::__record_generated!($($rest)*)
    };
}
