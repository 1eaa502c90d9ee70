use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RawQueryResult, SqlValue};

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Owning the (pooled) connection
/// - Converting SqlValue parameters to native types
/// - Preparing and running statements, converting results to RawQueryResult
///
/// Parameters use PostgreSQL-style placeholders ($1, $2, etc.)
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Run a statement that returns rows.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// Run a statement that returns no rows; yields the affected row count.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;
}
