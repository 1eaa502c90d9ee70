use std::sync::Arc;
use std::time::Duration;

use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::Socket;

use crate::builders::TableQuery;
use crate::config::ConnectionConfig;
use crate::drivers::TokioPostgresDriver;
use crate::error::{PgFluentError, Result};
use crate::querier::Querier;
use crate::traits::DatabaseDriver;

/// Main entry point for pgfluent.
/// Holds a pooled database connection and hands out queriers.
pub struct PgFluentClient {
    driver: Arc<dyn DatabaseDriver>,
    timeout: Option<Duration>,
}

impl PgFluentClient {
    /// Build the pool and verify the server is reachable.
    ///
    /// A failed check is retried `connect_retries` times, `retry_interval_secs`
    /// apart, before the last error is returned.
    ///
    /// Connections are made without TLS, so `ssl_mode = "require"` is
    /// rejected with a config error; use [`connect_with_tls`](Self::connect_with_tls).
    ///
    /// # Example
    /// ```ignore
    /// let config = ConnectionConfig::from_env()?;
    /// let client = PgFluentClient::connect(&config).await?;
    /// ```
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Self::establish(config, TokioPostgresDriver::connect(config)?).await
    }

    /// Same as [`connect`](Self::connect) with a TLS connector, e.g. one from
    /// `postgres-native-tls` or `tokio-postgres-rustls`.
    pub async fn connect_with_tls<T>(config: &ConnectionConfig, tls: T) -> Result<Self>
    where
        T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
        T::Stream: Sync + Send,
        T::TlsConnect: Sync + Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        Self::establish(config, TokioPostgresDriver::connect_with_tls(config, tls)?).await
    }

    async fn establish(config: &ConnectionConfig, driver: TokioPostgresDriver) -> Result<Self> {
        let attempts = config.connect_retries.saturating_add(1);

        let mut attempt = 1;
        loop {
            match driver.ping().await {
                Ok(()) => break,
                Err(err) if attempt < attempts => {
                    tracing::warn!(
                        host = %config.host,
                        dbname = %config.dbname,
                        attempt,
                        error = %err,
                        "database not reachable, retrying"
                    );
                    tokio::time::sleep(config.retry_interval()).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(PgFluentError::ConnectionFailed(format!(
                        "{}:{}/{} unreachable after {} attempts: {}",
                        config.host, config.port, config.dbname, attempts, err
                    )))
                }
            }
        }

        tracing::info!(
            host = %config.host,
            dbname = %config.dbname,
            pool_size = config.pool_size,
            "connected to database"
        );
        Ok(Self {
            driver: Arc::new(driver),
            timeout: config.statement_timeout(),
        })
    }

    /// Like [`connect`](Self::connect), but terminates the process when the
    /// database stays unreachable. Meant for service startup only.
    pub async fn connect_or_exit(config: &ConnectionConfig) -> Self {
        match Self::connect(config).await {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "giving up on database connection");
                std::process::exit(1);
            }
        }
    }

    /// Create a new client with a custom driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            driver,
            timeout: None,
        }
    }

    /// Default deadline for every statement issued through this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Create a Querier for building and executing statements.
    pub fn querier(&self) -> Querier {
        Querier::new(Arc::clone(&self.driver), self.timeout)
    }

    /// The shared driver, for statements the builder cannot express.
    ///
    /// ```ignore
    /// client
    ///     .driver()
    ///     .execute("REFRESH MATERIALIZED VIEW daily_totals", &[])
    ///     .await?;
    /// ```
    pub fn driver(&self) -> Arc<dyn DatabaseDriver> {
        Arc::clone(&self.driver)
    }

    /// Shortcut for `client.querier().table(name)`.
    pub fn table(&self, table: impl Into<String>) -> TableQuery {
        self.querier().table(table)
    }
}

#[cfg(test)]
mod tests {
    use tokio_postgres::NoTls;

    use super::*;
    use crate::config::SslMode;

    fn unreachable() -> ConnectionConfig {
        ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_retries: 1,
            retry_interval_secs: 0,
            ..ConnectionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_require_ssl_without_connector_is_a_config_error() {
        let config = ConnectionConfig {
            ssl_mode: SslMode::Require,
            ..unreachable()
        };
        let err = PgFluentClient::connect(&config).await.err().unwrap();
        assert!(matches!(err, PgFluentError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_with_tls_gives_up_after_retries() {
        let err = PgFluentClient::connect_with_tls(&unreachable(), NoTls)
            .await
            .err()
            .unwrap();
        match err {
            PgFluentError::ConnectionFailed(message) => {
                assert!(message.contains("after 2 attempts"), "{message}")
            }
            other => panic!("Expected ConnectionFailed, got {other:?}"),
        }
    }
}
