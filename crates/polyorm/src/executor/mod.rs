//! Statement execution.
//!
//! Builders compile synchronously and hand the finished [`Statement`] to a
//! [`StatementExecutor`]; that call is the only await point. Connection
//! management, retries and transport all belong to the executor.

mod postgres;

pub use postgres::PgExecutor;

use crate::dialect::{Dialect, Statement};
use crate::error::OrmResult;
use crate::record::Record;
use std::future::Future;
use std::time::Duration;

/// Which builder operation produced a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Count,
    Update,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecMode {
    Read,
    Write,
}

/// Per-call execution metadata passed alongside a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecContext {
    pub kind: StatementKind,
    pub mode: ExecMode,
    /// Run inside a transaction that commits only on success.
    pub transactional: bool,
    /// Entity type name, for diagnostics.
    pub entity: &'static str,
    /// Shard / routing key, passed through untouched.
    pub routing_key: Option<String>,
}

impl ExecContext {
    /// A non-transactional read.
    pub fn read(kind: StatementKind, entity: &'static str) -> Self {
        Self {
            kind,
            mode: ExecMode::Read,
            transactional: false,
            entity,
            routing_key: None,
        }
    }

    /// A write; `transactional` is off until [`ExecContext::in_transaction`].
    pub fn write(kind: StatementKind, entity: &'static str) -> Self {
        Self {
            kind,
            mode: ExecMode::Write,
            transactional: false,
            entity,
            routing_key: None,
        }
    }

    pub fn in_transaction(mut self) -> Self {
        self.transactional = true;
        self
    }

    pub fn with_routing_key(mut self, routing_key: Option<String>) -> Self {
        self.routing_key = routing_key;
        self
    }
}

/// A backend that runs compiled statements.
///
/// Implementations must honour [`ExecContext::transactional`]: either every
/// effect of the call commits or none does, including when the returned
/// future is dropped before completion.
pub trait StatementExecutor: Send + Sync {
    /// The dialect statements for this executor must be compiled with.
    fn dialect(&self) -> &dyn Dialect;

    /// Byte limit for statement text in the dispatch log; `None` logs it in full.
    fn max_logged_sql_length(&self) -> Option<usize> {
        Some(DEFAULT_MAX_LOGGED_SQL_LENGTH)
    }

    /// Run a statement and return its rows, keyed by unquoted column name.
    fn fetch(
        &self,
        statement: &Statement,
        ctx: &ExecContext,
    ) -> impl Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &self,
        statement: &Statement,
        ctx: &ExecContext,
    ) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Run statements in order inside one transaction; returns the total
    /// affected-row count.
    fn execute_batch(
        &self,
        statements: &[Statement],
        ctx: &ExecContext,
    ) -> impl Future<Output = OrmResult<u64>> + Send;
}

/// Executor timeouts and logging limits.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Statement timeout. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Statements slower than this are logged at WARN.
    pub slow_query_threshold: Option<Duration>,
    /// Truncate logged statement text (in bytes). `None` disables truncation.
    pub max_logged_sql_length: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            slow_query_threshold: None,
            max_logged_sql_length: Some(DEFAULT_MAX_LOGGED_SQL_LENGTH),
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statement timeout.
    ///
    /// A statement exceeding it is abandoned and the call returns
    /// [`OrmError::Timeout`](crate::OrmError::Timeout); an open transaction
    /// is rolled back.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn with_max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = Some(len);
        self
    }

    /// Log statement text in full.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql_length = None;
        self
    }
}

pub(crate) const DEFAULT_MAX_LOGGED_SQL_LENGTH: usize = 200;

/// Cut `text` to at most `max` bytes on a char boundary, marking the cut.
pub(crate) fn truncate_for_log(text: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if text.len() > max => {
            let mut end = max;
            while end > 0 && !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &text[..end])
        }
        _ => text.to_string(),
    }
}

/// Statement text as it appears in the dispatch log.
pub(crate) fn logged_sql(statement: &Statement, max: Option<usize>) -> String {
    truncate_for_log(&statement.text(), max)
}

/// Emit the DEBUG event every dispatched statement gets.
pub(crate) fn log_dispatch<X: StatementExecutor>(
    executor: &X,
    statement: &Statement,
    ctx: &ExecContext,
) {
    if !tracing::enabled!(target: "polyorm.sql", tracing::Level::DEBUG) {
        return;
    }
    tracing::debug!(
        target: "polyorm.sql",
        kind = ?ctx.kind,
        entity = ctx.entity,
        routing_key = ctx.routing_key.as_deref().unwrap_or("-"),
        param_count = statement.params().len(),
        sql = %logged_sql(statement, executor.max_logged_sql_length()),
        "dispatching statement"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_for_log("SELECT 1", Some(100)), "SELECT 1");
        assert_eq!(truncate_for_log("SELECT 1", None), "SELECT 1");
        assert_eq!(truncate_for_log("héllo", Some(2)), "h...");
    }

    #[test]
    fn dispatch_log_honours_configured_length() {
        let long = format!("SELECT {} FROM t", "c, ".repeat(100));
        let statement = Statement::Sql(crate::dialect::SqlStatement {
            text: long.clone(),
            params: Default::default(),
        });

        let default = ExecutorConfig::new();
        let cut = logged_sql(&statement, default.max_logged_sql_length);
        assert_eq!(cut.len(), DEFAULT_MAX_LOGGED_SQL_LENGTH + 3);
        assert!(cut.ends_with("..."));

        let full = ExecutorConfig::new().no_truncate();
        assert_eq!(logged_sql(&statement, full.max_logged_sql_length), long);

        let short = ExecutorConfig::new().with_max_logged_sql_length(6);
        assert_eq!(logged_sql(&statement, short.max_logged_sql_length), "SELECT...");
    }

    #[test]
    fn write_context_is_opt_in_transactional() {
        let ctx = ExecContext::write(StatementKind::Update, "User");
        assert!(!ctx.transactional);
        let ctx = ctx.in_transaction().with_routing_key(Some("eu".into()));
        assert!(ctx.transactional);
        assert_eq!(ctx.mode, ExecMode::Write);
        assert_eq!(ctx.routing_key.as_deref(), Some("eu"));
    }
}
