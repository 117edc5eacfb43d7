//! Shared fixtures for integration tests.

#![allow(dead_code)]

use polyorm::{Dialect, Entity, ExecContext, OrmResult, Record, Statement, StatementExecutor};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Entity)]
#[orm(table = "users")]
pub struct User {
    #[orm(id)]
    pub id: String,
    pub name: Option<String>,
    pub age: i32,
}

/// Column renames, a skipped field and the default table name.
#[derive(Debug, Clone, PartialEq, Entity)]
pub struct AuditEntry {
    pub id: i64,
    #[orm(column = "actor_name")]
    pub actor: String,
    #[orm(skip)]
    pub rendered: String,
}

/// One executor call: the statements it received and its context.
#[derive(Debug, Clone)]
pub struct Call {
    pub statements: Vec<Statement>,
    pub ctx: ExecContext,
}

impl Call {
    pub fn sql(&self) -> String {
        self.statements[0].text().into_owned()
    }
}

/// In-memory executor that records every call and replies with canned rows.
pub struct RecordingExecutor<D> {
    dialect: D,
    rows: Vec<Record>,
    affected: u64,
    calls: Mutex<Vec<Call>>,
}

impl<D: Dialect + 'static> RecordingExecutor<D> {
    pub fn new(dialect: D) -> Self {
        Self {
            dialect,
            rows: Vec::new(),
            affected: 1,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = rows;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, statements: &[Statement], ctx: &ExecContext) {
        self.calls.lock().unwrap().push(Call {
            statements: statements.to_vec(),
            ctx: ctx.clone(),
        });
    }
}

impl<D: Dialect + 'static> StatementExecutor for RecordingExecutor<D> {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn fetch(&self, statement: &Statement, ctx: &ExecContext) -> OrmResult<Vec<Record>> {
        self.record(std::slice::from_ref(statement), ctx);
        Ok(self.rows.clone())
    }

    async fn execute(&self, statement: &Statement, ctx: &ExecContext) -> OrmResult<u64> {
        self.record(std::slice::from_ref(statement), ctx);
        Ok(self.affected)
    }

    async fn execute_batch(&self, statements: &[Statement], ctx: &ExecContext) -> OrmResult<u64> {
        self.record(statements, ctx);
        Ok(self.affected * statements.len() as u64)
    }
}

pub fn user_row(id: &str, name: Option<&str>, age: i32) -> Record {
    Record::new()
        .with("id", id)
        .with("name", name)
        .with("age", age)
}
