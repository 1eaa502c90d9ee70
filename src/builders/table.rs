use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::builders::{
    assemble, assemble_insert, assemble_step, assemble_update, Accumulator, OperationKind,
    SortDirection, Statement,
};
use crate::clauses::{
    resolve_insert, resolve_update_changes, resolve_update_record, Combinator, Predicate,
};
use crate::error::{PgFluentError, Result};
use crate::traits::{DatabaseDriver, Destination, Record};
use crate::types::{decode_scalar, map_rows, FieldValue, RawQueryResult, SqlValue};

/// Fluent builder scoped to one table and one statement.
///
/// Chained calls consume and return the builder, so they may come in any order
/// and repeat. `where_`/`where_or` accumulate; `select`, `sort`, `group`,
/// `offset` and `limit` overwrite. Every terminal call consumes the builder:
/// open a new scope with [`Querier::table`](crate::Querier::table) for the next
/// statement.
pub struct TableQuery {
    driver: Arc<dyn DatabaseDriver>,
    acc: Accumulator,
    timeout: Option<Duration>,
}

impl TableQuery {
    pub(crate) fn new(
        driver: Arc<dyn DatabaseDriver>,
        table: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            driver,
            acc: Accumulator::new(table),
            timeout,
        }
    }

    /// Set the projection, a raw SQL fragment such as `"id, name"`.
    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.acc.fields = fields.into();
        self
    }

    /// Add a condition joined with AND. Each `?` in `template` takes the next
    /// argument.
    ///
    /// ```ignore
    /// querier.table("users").where_("id = ?", [62]);
    /// querier.table("users").where_("age BETWEEN ? AND ?", [18, 30]);
    /// querier.table("users").where_("name = ? AND age > ?", pgfluent::params!["Ann", 18]);
    /// querier.table("users").where_("tags ?? ?", ["admin"]); // jsonb `?` operator
    /// ```
    pub fn where_<I, V>(self, template: &str, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.push_predicate(Combinator::And, template, args)
    }

    /// Add a condition joined with OR.
    ///
    /// Conditions are not parenthesised: `where_(a).where_or(b).where_(c)`
    /// renders `a OR b AND c`, which SQL reads as `a OR (b AND c)`.
    pub fn where_or<I, V>(self, template: &str, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.push_predicate(Combinator::Or, template, args)
    }

    fn push_predicate<I, V>(mut self, combinator: Combinator, template: &str, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.acc
            .predicates
            .push(Predicate::new(combinator, template, args));
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.acc.sort = Some((field.into(), direction));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.acc.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.acc.limit = Some(limit);
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.acc.group = Some(group.into());
        self
    }

    /// Deadline for the terminal call, replacing the querier default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the terminal call without a deadline.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.acc
    }

    /// Render the statement a read, aggregate or delete would send, without
    /// sending it.
    pub fn to_statement(&self, kind: OperationKind) -> Result<Statement> {
        assemble(kind, &self.acc)
    }

    /// Read matching rows into `dest`.
    ///
    /// A single record takes the first row and is left untouched when nothing
    /// matches. A `Vec` is replaced with every row, but only once all rows
    /// have decoded.
    pub async fn find_into<D: Destination>(self, dest: &mut D) -> Result<()> {
        let stmt = assemble(OperationKind::Find, &self.acc)?;
        let raw = self.run_query(&stmt).await?;
        let records = map_rows::<D::Record>(&raw, !D::COLLECTS)?;
        dest.fill(records);
        Ok(())
    }

    /// Read the first matching row, if any.
    pub async fn find_one<R: Record>(self) -> Result<Option<R>> {
        let stmt = assemble(OperationKind::Find, &self.acc)?;
        let raw = self.run_query(&stmt).await?;
        Ok(map_rows::<R>(&raw, true)?.into_iter().next())
    }

    /// Read every matching row.
    pub async fn find_all<R: Record>(self) -> Result<Vec<R>> {
        let stmt = assemble(OperationKind::Find, &self.acc)?;
        let raw = self.run_query(&stmt).await?;
        map_rows::<R>(&raw, false)
    }

    /// `COUNT(*)` unless `select` set another expression.
    pub async fn count(self) -> Result<i64> {
        let stmt = assemble(OperationKind::Count, &self.acc)?;
        let raw = self.run_query(&stmt).await?;
        match first_cell(&raw) {
            Some((column, cell)) => decode_scalar::<i64>(column, cell),
            None => Err(PgFluentError::NoRows(OperationKind::Count)),
        }
    }

    /// Sum of the selected field. `None` when no row matched (SQL NULL),
    /// which is distinct from a sum of zero.
    pub async fn sum<T: FieldValue>(self) -> Result<Option<T>> {
        self.aggregate(OperationKind::Sum).await
    }

    /// Average of the selected field; `None` when no row matched.
    pub async fn avg<T: FieldValue>(self) -> Result<Option<T>> {
        self.aggregate(OperationKind::Avg).await
    }

    async fn aggregate<T: FieldValue>(self, kind: OperationKind) -> Result<Option<T>> {
        let stmt = assemble(kind, &self.acc)?;
        let raw = self.run_query(&stmt).await?;
        match first_cell(&raw) {
            Some((column, Some(text))) => decode_scalar::<T>(column, Some(text)).map(Some),
            _ => Ok(None),
        }
    }

    /// Insert one record. Generated fields are written as `DEFAULT`.
    pub async fn insert<R: Record>(self, record: &R) -> Result<u64> {
        self.insert_many(std::slice::from_ref(record)).await
    }

    /// Insert several records in one statement, one VALUES group each.
    pub async fn insert_many<R: Record>(self, records: &[R]) -> Result<u64> {
        let stmt = assemble_insert(&self.acc, |cursor| resolve_insert(records, cursor))?;
        self.run_execute(&stmt).await
    }

    /// Write every non-generated field of `record` to the matching rows.
    pub async fn update<R: Record>(self, record: &R) -> Result<u64> {
        let stmt = assemble_update(&self.acc, |cursor| resolve_update_record(record, cursor))?;
        self.warn_if_unconditional(&stmt);
        self.run_execute(&stmt).await
    }

    /// Write exactly the given columns, in iteration order.
    ///
    /// ```ignore
    /// querier
    ///     .table("users")
    ///     .where_("id = ?", [7])
    ///     .update_fields([("name", SqlValue::from("Ann")), ("age", SqlValue::from(31))])
    ///     .await?;
    /// ```
    pub async fn update_fields<I, K, V>(self, changes: I) -> Result<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        let changes = changes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let stmt = assemble_update(&self.acc, |cursor| resolve_update_changes(changes, cursor))?;
        self.warn_if_unconditional(&stmt);
        self.run_execute(&stmt).await
    }

    /// Delete matching rows. Refuses to run without at least one condition.
    pub async fn delete(self) -> Result<u64> {
        let stmt = assemble(OperationKind::Delete, &self.acc)?;
        self.run_execute(&stmt).await
    }

    /// `field = field + 1` on matching rows.
    pub async fn increment(self, field: &str) -> Result<u64> {
        let stmt = assemble_step(OperationKind::Increment, &self.acc, field)?;
        self.run_execute(&stmt).await
    }

    /// `field = field - 1` on matching rows.
    pub async fn decrement(self, field: &str) -> Result<u64> {
        let stmt = assemble_step(OperationKind::Decrement, &self.acc, field)?;
        self.run_execute(&stmt).await
    }

    fn warn_if_unconditional(&self, stmt: &Statement) {
        if self.acc.predicates.is_empty() {
            tracing::warn!(
                table = %self.acc.table,
                sql = %stmt.sql,
                "update without a condition touches every row"
            );
        }
    }

    async fn run_query(&self, stmt: &Statement) -> Result<RawQueryResult> {
        log_statement(stmt);
        let future = self.driver.query(&stmt.sql, &stmt.params);
        with_deadline(stmt.kind, self.timeout, future).await
    }

    async fn run_execute(&self, stmt: &Statement) -> Result<u64> {
        log_statement(stmt);
        let future = self.driver.execute(&stmt.sql, &stmt.params);
        with_deadline(stmt.kind, self.timeout, future).await
    }
}

fn log_statement(stmt: &Statement) {
    tracing::debug!(
        operation = %stmt.kind,
        sql = %stmt.sql,
        params = stmt.params.len(),
        "executing statement"
    );
}

async fn with_deadline<T>(
    operation: OperationKind,
    timeout: Option<Duration>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    let result = match timeout {
        Some(after) => tokio::time::timeout(after, future)
            .await
            .map_err(|_| PgFluentError::Timeout { operation, after })?,
        None => future.await,
    };
    result.map_err(|source| PgFluentError::Statement {
        operation,
        source: Box::new(source),
    })
}

fn first_cell(raw: &RawQueryResult) -> Option<(&str, Option<&str>)> {
    let row = raw.rows.first()?;
    let column = raw.columns.first().map(String::as_str).unwrap_or("?column?");
    row.first().map(|cell| (column, cell.as_deref()))
}
