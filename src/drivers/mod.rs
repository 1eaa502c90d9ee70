//! `DatabaseDriver` implementations: the pooled PostgreSQL driver and a
//! recording in-memory driver for tests.

mod in_memory_test;
mod tokio_postgres;

pub use self::in_memory_test::{InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery};
pub use self::tokio_postgres::TokioPostgresDriver;
