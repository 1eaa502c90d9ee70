//! pgfluent - a fluent PostgreSQL statement builder with a dynamic row mapper
//!
//! Records are declared with [`record!`], which builds the static field table
//! the mapper scans into and the write resolver reads from.
//!
//! # Example
//! ```ignore
//! use pgfluent::{ConnectionConfig, PgFluentClient, SortDirection};
//!
//! pgfluent::record! {
//!     #[derive(Debug, Default)]
//!     pub struct User {
//!         #[generated]
//!         pub id: i64,
//!         #[column("user_name")]
//!         pub name: String,
//!         pub age: i32,
//!     }
//! }
//!
//! let client = PgFluentClient::connect(&ConnectionConfig::from_env()?).await?;
//! let querier = client.querier();
//!
//! let adults: Vec<User> = querier
//!     .table("users")
//!     .where_("age >= ?", [18])
//!     .sort("id", SortDirection::Desc)
//!     .limit(20)
//!     .find_all()
//!     .await?;
//!
//! let mut user = User::default();
//! querier.table("users").where_("id = ?", [7]).find_into(&mut user).await?;
//!
//! querier.table("users").insert(&User { id: 0, name: "Ann".into(), age: 31 }).await?;
//! ```

pub mod builders;
pub mod clauses;
pub mod config;
pub mod drivers;
pub mod error;
pub mod querier;
pub mod traits;
pub mod types;

mod client;

// Re-export main types for convenient access
pub use builders::{OperationKind, SortDirection, Statement, TableQuery};
pub use client::PgFluentClient;
pub use config::{ConnectionConfig, SslMode};
pub use error::{PgFluentError, Result};
pub use querier::Querier;
pub use traits::{DatabaseDriver, Destination, FieldDescriptor, FieldType, Record};
pub use types::{FieldValue, RawQueryResult, ScanRow, SqlValue};

/// Builds a `Vec<SqlValue>` from mixed-type arguments.
///
/// ```
/// use pgfluent::{params, SqlValue};
///
/// let args = params!["normal", 62, true];
/// assert_eq!(
///     args,
///     vec![SqlValue::Text("normal".into()), SqlValue::Int32(62), SqlValue::Bool(true)]
/// );
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::SqlValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::SqlValue::from($value)),+]
    };
}
