use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::{Hook, HookError, Manager, ManagerConfig, Pool, RecyclingMethod};
use rust_decimal::Decimal;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{NoTls, Row, Socket};
use uuid::Uuid;

use crate::config::{ConnectionConfig, SslMode};
use crate::error::{PgFluentError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

type Param = Box<dyn ToSql + Sync + Send>;
type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// PostgreSQL driver backed by a deadpool-postgres connection pool.
pub struct TokioPostgresDriver {
    pool: Pool,
}

impl TokioPostgresDriver {
    /// Build a pool without TLS. No connection is opened until first use;
    /// call [`ping`](Self::ping) to check connectivity.
    ///
    /// `SslMode::Require` cannot be satisfied without a connector and is
    /// rejected here; use [`connect_with_tls`](Self::connect_with_tls).
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        if config.ssl_mode == SslMode::Require {
            return Err(PgFluentError::Config(
                "ssl_mode = require needs a TLS connector, use connect_with_tls".to_string(),
            ));
        }
        Self::connect_with_tls(config, NoTls)
    }

    /// Build a pool using a custom TLS connector.
    pub fn connect_with_tls<T>(config: &ConnectionConfig, tls: T) -> Result<Self>
    where
        T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
        T::Stream: Sync + Send,
        T::TlsConnect: Sync + Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        let manager = Manager::from_config(
            config.to_pg_config(),
            tls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let mut builder = Pool::builder(manager).max_size(config.pool_size);
        if let Some(max_lifetime) = config.max_lifetime() {
            builder = builder.pre_recycle(Hook::sync_fn(move |_, metrics| {
                if metrics.age() > max_lifetime {
                    Err(HookError::Message(
                        "connection exceeded its maximum lifetime".into(),
                    ))
                } else {
                    Ok(())
                }
            }));
        }

        let pool = builder
            .build()
            .map_err(|e| PgFluentError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Check out a connection and run `SELECT 1` on it.
    pub async fn ping(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| PgFluentError::ConnectionFailed(e.to_string()))?;
        client
            .simple_query("SELECT 1")
            .await
            .map_err(|e| PgFluentError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    async fn prepare(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<(deadpool_postgres::Object, tokio_postgres::Statement, Vec<Param>)> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| PgFluentError::Pool(e.to_string()))?;
        let statement = client
            .prepare(sql)
            .await
            .map_err(|e| PgFluentError::QueryFailed(e.to_string()))?;

        if statement.params().len() != params.len() {
            return Err(PgFluentError::QueryFailed(format!(
                "statement expects {} parameters, got {}",
                statement.params().len(),
                params.len()
            )));
        }
        let converted = params
            .iter()
            .zip(statement.params())
            .enumerate()
            .map(|(i, (value, ty))| to_param(value, ty).map_err(|e| e.at(i + 1)))
            .collect::<std::result::Result<Vec<_>, ConversionError>>()
            .map_err(|e| PgFluentError::QueryFailed(e.to_string()))?;

        Ok((client, statement, converted))
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let (client, statement, converted) = self.prepare(sql, params).await?;
        let rows = client
            .query(&statement, &param_refs(&converted))
            .await
            .map_err(|e| PgFluentError::QueryFailed(e.to_string()))?;

        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let cells = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| cell_to_text(row, i))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RawQueryResult::new(columns, cells))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let (client, statement, converted) = self.prepare(sql, params).await?;
        client
            .execute(&statement, &param_refs(&converted))
            .await
            .map_err(|e| PgFluentError::QueryFailed(e.to_string()))
    }
}

fn param_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params
        .iter()
        .map(|b| b.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

#[derive(Debug)]
struct ConversionError {
    position: usize,
    value: SqlValue,
    ty: Type,
}

impl ConversionError {
    fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parameter ${}: cannot send {:?} as {}",
            self.position, self.value, self.ty
        )
    }
}

/// Convert a SqlValue to the Rust type PostgreSQL expects for this parameter.
fn to_param(value: &SqlValue, ty: &Type) -> std::result::Result<Param, ConversionError> {
    let fail = || ConversionError {
        position: 0,
        value: value.clone(),
        ty: ty.clone(),
    };

    let param: Param = match value {
        SqlValue::Null => null_of(ty),
        SqlValue::Int32(v) => integer_param(i64::from(*v), ty).ok_or_else(fail)?,
        SqlValue::Int64(v) => integer_param(*v, ty).ok_or_else(fail)?,
        SqlValue::Float64(v) => match *ty {
            Type::FLOAT4 => Box::new(*v as f32),
            Type::NUMERIC => Box::new(Decimal::try_from(*v).map_err(|_| fail())?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => Box::new(v.to_string()),
            _ => Box::new(*v),
        },
        SqlValue::Bool(v) => match *ty {
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => Box::new(v.to_string()),
            _ => Box::new(*v),
        },
        SqlValue::Timestamp(v) => match *ty {
            Type::TIMESTAMP => Box::new(v.naive_utc()),
            Type::DATE => Box::new(v.date_naive()),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => Box::new(v.to_rfc3339()),
            _ => Box::new(*v),
        },
        SqlValue::Text(s) => text_param(s, ty).ok_or_else(fail)?,
    };
    Ok(param)
}

fn null_of(ty: &Type) -> Param {
    match *ty {
        Type::BOOL => Box::new(None::<bool>),
        Type::INT2 => Box::new(None::<i16>),
        Type::INT4 => Box::new(None::<i32>),
        Type::INT8 => Box::new(None::<i64>),
        Type::FLOAT4 => Box::new(None::<f32>),
        Type::FLOAT8 => Box::new(None::<f64>),
        Type::NUMERIC => Box::new(None::<Decimal>),
        Type::TIMESTAMPTZ => Box::new(None::<DateTime<Utc>>),
        Type::TIMESTAMP => Box::new(None::<NaiveDateTime>),
        Type::DATE => Box::new(None::<NaiveDate>),
        Type::UUID => Box::new(None::<Uuid>),
        Type::JSON | Type::JSONB => Box::new(None::<serde_json::Value>),
        _ => Box::new(None::<String>),
    }
}

fn integer_param(v: i64, ty: &Type) -> Option<Param> {
    let param: Param = match *ty {
        Type::INT2 => Box::new(i16::try_from(v).ok()?),
        Type::INT4 => Box::new(i32::try_from(v).ok()?),
        Type::FLOAT4 => Box::new(v as f32),
        Type::FLOAT8 => Box::new(v as f64),
        Type::NUMERIC => Box::new(Decimal::from(v)),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR => Box::new(v.to_string()),
        _ => Box::new(v),
    };
    Some(param)
}

fn text_param(s: &str, ty: &Type) -> Option<Param> {
    let param: Param = match *ty {
        Type::BOOL => Box::new(match s.trim() {
            "t" | "true" | "1" => true,
            "f" | "false" | "0" => false,
            _ => return None,
        }),
        Type::INT2 => Box::new(s.trim().parse::<i16>().ok()?),
        Type::INT4 => Box::new(s.trim().parse::<i32>().ok()?),
        Type::INT8 => Box::new(s.trim().parse::<i64>().ok()?),
        Type::FLOAT4 => Box::new(s.trim().parse::<f32>().ok()?),
        Type::FLOAT8 => Box::new(s.trim().parse::<f64>().ok()?),
        Type::NUMERIC => Box::new(Decimal::from_str(s.trim()).ok()?),
        Type::TIMESTAMPTZ => {
            Box::new(DateTime::parse_from_rfc3339(s.trim()).ok()?.with_timezone(&Utc))
        }
        Type::UUID => Box::new(Uuid::parse_str(s.trim()).ok()?),
        Type::JSON | Type::JSONB => Box::new(serde_json::from_str::<serde_json::Value>(s).ok()?),
        _ => Box::new(s.to_string()),
    };
    Some(param)
}

/// Render one cell as text according to its column type; NULL stays `None`.
fn cell_to_text(row: &Row, index: usize) -> Result<Option<String>> {
    let column = &row.columns()[index];
    let decode = |e: tokio_postgres::Error| PgFluentError::decode(column.name(), e.to_string());

    let text = match *column.type_() {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .map_err(decode)?
            .map(|v| v.to_rfc3339()),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)
            .map_err(decode)?
            .map(|v| v.and_utc().to_rfc3339()),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::UUID => row
            .try_get::<_, Option<Uuid>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(index)
            .map_err(decode)?
            .map(|v| v.to_string()),
        _ => row
            .try_get::<_, Option<AnyText>>(index)
            .map_err(decode)?
            .map(|v| v.0),
    };
    Ok(text)
}

/// Receives a column of any type, so columns nobody maps never fail a row.
struct AnyText(String);

impl<'a> FromSql<'a> for AnyText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        render_raw(ty, raw).map(AnyText)
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Text-like values decode as UTF-8; anything else is printed as hex the way
/// PostgreSQL prints `bytea`.
fn render_raw(ty: &Type, raw: &[u8]) -> std::result::Result<String, BoxError> {
    if <String as FromSql<'_>>::accepts(ty) {
        return String::from_sql(ty, raw);
    }
    Ok(hex_bytes(raw))
}

fn hex_bytes(raw: &[u8]) -> String {
    let hex: String = raw.iter().map(|b| format!("{b:02x}")).collect();
    format!("\\x{hex}")
}
