use std::sync::Arc;
use std::time::Duration;

use crate::builders::TableQuery;
use crate::traits::DatabaseDriver;

/// Statement factory.
/// Created from a PgFluentClient; each call to [`Querier::table`] opens a fresh
/// builder, so one querier can serve any number of concurrent tasks.
#[derive(Clone)]
pub struct Querier {
    driver: Arc<dyn DatabaseDriver>,
    timeout: Option<Duration>,
}

impl Querier {
    pub(crate) fn new(driver: Arc<dyn DatabaseDriver>, timeout: Option<Duration>) -> Self {
        Self { driver, timeout }
    }

    /// Start a statement against `table`.
    pub fn table(&self, table: impl Into<String>) -> TableQuery {
        TableQuery::new(Arc::clone(&self.driver), table, self.timeout)
    }

    /// The shared driver, for statements the builder cannot express.
    pub fn driver(&self) -> Arc<dyn DatabaseDriver> {
        Arc::clone(&self.driver)
    }

    /// Default deadline applied to every statement this querier opens.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
