use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PgFluentError, Result};

/// TLS negotiation mode, mirroring libpq's `sslmode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    #[default]
    Prefer,
    Require,
}

impl FromStr for SslMode {
    type Err = PgFluentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(PgFluentError::Config(format!("unknown sslmode '{other}'"))),
        }
    }
}

impl From<SslMode> for tokio_postgres::config::SslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => tokio_postgres::config::SslMode::Disable,
            SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
            SslMode::Require => tokio_postgres::config::SslMode::Require,
        }
    }
}

/// Connection, pool and retry settings.
///
/// Loadable from TOML (every key optional):
/// ```toml
/// host = "db.internal"
/// user = "app"
/// password = "secret"
/// dbname = "shop"
/// ssl_mode = "require"
/// pool_size = 20
/// max_lifetime_secs = 300
/// statement_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
    pub ssl_mode: SslMode,
    /// Maximum pooled connections.
    pub pool_size: usize,
    /// Connections older than this are discarded instead of reused.
    pub max_lifetime_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    /// Default deadline for each statement; `None` waits indefinitely.
    pub statement_timeout_ms: Option<u64>,
    /// Extra connection attempts made at startup before giving up.
    pub connect_retries: u32,
    pub retry_interval_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            dbname: "postgres".to_string(),
            ssl_mode: SslMode::default(),
            pool_size: 10,
            max_lifetime_secs: Some(180),
            connect_timeout_secs: None,
            statement_timeout_ms: None,
            connect_retries: 3,
            retry_interval_secs: 5,
        }
    }
}

impl ConnectionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| PgFluentError::Config(e.to_string()))
    }

    /// Reads the libpq variables `PGHOST`, `PGPORT`, `PGUSER`, `PGPASSWORD`,
    /// `PGDATABASE` and `PGSSLMODE`; anything unset keeps its default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(host) = lookup("PGHOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PGPORT") {
            config.port = port
                .parse()
                .map_err(|_| PgFluentError::Config(format!("PGPORT '{port}' is not a port")))?;
        }
        if let Some(user) = lookup("PGUSER") {
            config.user = user;
        }
        if let Some(password) = lookup("PGPASSWORD") {
            config.password = Some(password);
        }
        if let Some(dbname) = lookup("PGDATABASE") {
            config.dbname = dbname;
        }
        if let Some(mode) = lookup("PGSSLMODE") {
            config.ssl_mode = mode.parse()?;
        }
        Ok(config)
    }

    pub fn max_lifetime(&self) -> Option<Duration> {
        self.max_lifetime_secs.map(Duration::from_secs)
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.dbname)
            .ssl_mode(self.ssl_mode.into());
        if let Some(password) = &self.password {
            pg.password(password);
        }
        if let Some(secs) = self.connect_timeout_secs {
            pg.connect_timeout(Duration::from_secs(secs));
        }
        pg
    }
}
