//! tokio-postgres executor.

use super::{ExecContext, ExecutorConfig, StatementExecutor, truncate_for_log};
use crate::dialect::{Dialect, Postgres, SqlStatement, Statement};
use crate::error::{OrmError, OrmResult};
use crate::param::ParamMap;
use crate::record::Record;
use crate::value::Value;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::error::Error;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Row};
use uuid::Uuid;

enum Source {
    #[cfg(feature = "pool")]
    Pool(deadpool_postgres::Pool),
    Client(Arc<Mutex<Client>>),
}

/// Runs [`Statement::Sql`] statements against PostgreSQL.
///
/// ```ignore
/// let pool = polyorm::create_pool("postgres://localhost/app")?;
/// let db = polyorm::Db::new(PgExecutor::from_pool(pool));
/// ```
pub struct PgExecutor {
    source: Source,
    config: ExecutorConfig,
}

impl std::fmt::Debug for PgExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self.source {
            #[cfg(feature = "pool")]
            Source::Pool(_) => "pool",
            Source::Client(_) => "client",
        };
        f.debug_struct("PgExecutor")
            .field("source", &source)
            .field("config", &self.config)
            .finish()
    }
}

/// A checked-out connection.
enum Conn<'a> {
    #[cfg(feature = "pool")]
    Pooled(deadpool_postgres::Object),
    Shared(MutexGuard<'a, Client>),
}

impl Deref for Conn<'_> {
    type Target = Client;

    fn deref(&self) -> &Client {
        match self {
            #[cfg(feature = "pool")]
            Conn::Pooled(obj) => obj,
            Conn::Shared(guard) => guard,
        }
    }
}

impl DerefMut for Conn<'_> {
    fn deref_mut(&mut self) -> &mut Client {
        match self {
            #[cfg(feature = "pool")]
            Conn::Pooled(obj) => obj,
            Conn::Shared(guard) => guard,
        }
    }
}

impl PgExecutor {
    /// Check out a pooled connection per call.
    #[cfg(feature = "pool")]
    pub fn from_pool(pool: deadpool_postgres::Pool) -> Self {
        Self {
            source: Source::Pool(pool),
            config: ExecutorConfig::default(),
        }
    }

    /// Share one client; calls are serialised on it.
    pub fn from_client(client: Client) -> Self {
        Self {
            source: Source::Client(Arc::new(Mutex::new(client))),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    async fn conn(&self) -> OrmResult<Conn<'_>> {
        match &self.source {
            #[cfg(feature = "pool")]
            Source::Pool(pool) => Ok(Conn::Pooled(pool.get().await?)),
            Source::Client(client) => Ok(Conn::Shared(client.lock().await)),
        }
    }

    /// Apply the configured timeout, then log slow or failed statements.
    async fn observe<T, F>(&self, text: &str, ctx: &ExecContext, work: F) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>> + Send,
    {
        let started = Instant::now();
        let result = match self.config.query_timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or_else(|_| Err(OrmError::Timeout(limit))),
            None => work.await,
        };
        let elapsed = started.elapsed();
        let max = self.config.max_logged_sql_length;

        match &result {
            Err(err) => tracing::error!(
                target: "polyorm.sql",
                kind = ?ctx.kind,
                entity = ctx.entity,
                elapsed_ms = elapsed.as_millis() as u64,
                sql = %truncate_for_log(text, max),
                error = %err,
                "statement failed"
            ),
            Ok(_) => {
                if let Some(threshold) = self.config.slow_query_threshold
                    && elapsed > threshold
                {
                    tracing::warn!(
                        target: "polyorm.sql",
                        kind = ?ctx.kind,
                        entity = ctx.entity,
                        elapsed_ms = elapsed.as_millis() as u64,
                        sql = %truncate_for_log(text, max),
                        "slow statement"
                    );
                }
            }
        }
        result
    }
}

fn sql_of(statement: &Statement) -> OrmResult<&SqlStatement> {
    statement.as_sql().ok_or_else(|| {
        OrmError::configuration(
            "PgExecutor received a document command; compile with a relational dialect",
        )
    })
}

fn failed(sql: &SqlStatement, err: tokio_postgres::Error) -> OrmError {
    OrmError::execution(sql.text.clone(), sql.params.clone(), err)
}

impl StatementExecutor for PgExecutor {
    fn dialect(&self) -> &dyn Dialect {
        &Postgres
    }

    fn max_logged_sql_length(&self) -> Option<usize> {
        self.config.max_logged_sql_length
    }

    async fn fetch(&self, statement: &Statement, ctx: &ExecContext) -> OrmResult<Vec<Record>> {
        let sql = sql_of(statement)?;
        self.observe(&sql.text, ctx, async {
            let mut conn = self.conn().await?;
            let params = sql.params.as_refs();
            let rows = if ctx.transactional {
                let tx = conn.transaction().await.map_err(|e| failed(sql, e))?;
                let rows = tx
                    .query(sql.text.as_str(), &params)
                    .await
                    .map_err(|e| failed(sql, e))?;
                tx.commit().await.map_err(|e| failed(sql, e))?;
                rows
            } else {
                conn.query(sql.text.as_str(), &params)
                    .await
                    .map_err(|e| failed(sql, e))?
            };
            rows.iter().map(decode_row).collect::<OrmResult<Vec<_>>>()
        })
        .await
    }

    async fn execute(&self, statement: &Statement, ctx: &ExecContext) -> OrmResult<u64> {
        let sql = sql_of(statement)?;
        self.observe(&sql.text, ctx, async {
            let mut conn = self.conn().await?;
            let params = sql.params.as_refs();
            if ctx.transactional {
                // Dropping `tx` before commit rolls back.
                let tx = conn.transaction().await.map_err(|e| failed(sql, e))?;
                let affected = tx
                    .execute(sql.text.as_str(), &params)
                    .await
                    .map_err(|e| failed(sql, e))?;
                tx.commit().await.map_err(|e| failed(sql, e))?;
                Ok::<_, OrmError>(affected)
            } else {
                conn.execute(sql.text.as_str(), &params)
                    .await
                    .map_err(|e| failed(sql, e))
            }
        })
        .await
    }

    async fn execute_batch(&self, statements: &[Statement], ctx: &ExecContext) -> OrmResult<u64> {
        let batch: Vec<&SqlStatement> = statements.iter().map(sql_of).collect::<OrmResult<_>>()?;
        let summary: Vec<&str> = batch.iter().map(|s| s.text.as_str()).collect();
        let summary = summary.join("; ");
        // BEGIN / COMMIT failures belong to the whole batch.
        let batch_failed = |err: tokio_postgres::Error| {
            let params = ParamMap::snapshot(batch.iter().map(|s| &s.params));
            OrmError::execution(summary.clone(), params, err)
        };

        self.observe(&summary, ctx, async {
            let mut conn = self.conn().await?;
            let tx = conn.transaction().await.map_err(batch_failed)?;
            let mut total = 0u64;
            for sql in &batch {
                total += tx
                    .execute(sql.text.as_str(), &sql.params.as_refs())
                    .await
                    .map_err(|e| failed(sql, e))?;
            }
            tx.commit().await.map_err(batch_failed)?;
            Ok::<_, OrmError>(total)
        })
        .await
    }
}

fn decode_row(row: &Row) -> OrmResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_cell(row, idx, column.type_())
            .map_err(|e| OrmError::decode(column.name(), e.to_string()))?;
        record.push(column.name(), value);
    }
    Ok(record)
}

type CellError = Box<dyn Error + Send + Sync>;

fn cell<'r, T, F>(row: &'r Row, idx: usize, wrap: F) -> Result<Value, CellError>
where
    T: tokio_postgres::types::FromSql<'r>,
    F: FnOnce(T) -> Value,
{
    Ok(row
        .try_get::<_, Option<T>>(idx)?
        .map(wrap)
        .unwrap_or(Value::Null))
}

fn decode_cell(row: &Row, idx: usize, ty: &Type) -> Result<Value, CellError> {
    if *ty == Type::BOOL {
        cell(row, idx, Value::Bool)
    } else if *ty == Type::INT2 {
        cell(row, idx, |v: i16| Value::Int(v.into()))
    } else if *ty == Type::INT4 {
        cell(row, idx, |v: i32| Value::Int(v.into()))
    } else if *ty == Type::INT8 {
        cell(row, idx, Value::Int)
    } else if *ty == Type::FLOAT4 {
        cell(row, idx, |v: f32| Value::Float(v.into()))
    } else if *ty == Type::FLOAT8 {
        cell(row, idx, Value::Float)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        cell(row, idx, Value::Text)
    } else if *ty == Type::BYTEA {
        cell(row, idx, Value::Bytes)
    } else if *ty == Type::UUID {
        cell(row, idx, |v: Uuid| Value::Uuid(v))
    } else if *ty == Type::TIMESTAMPTZ {
        cell(row, idx, |v: DateTime<Utc>| Value::Timestamp(v))
    } else if *ty == Type::TIMESTAMP {
        cell(row, idx, |v: NaiveDateTime| Value::Timestamp(v.and_utc()))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        cell(row, idx, Value::Json)
    } else {
        Err(format!("unsupported column type {ty}").into())
    }
}
