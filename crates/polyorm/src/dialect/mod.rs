//! Backend dialects.
//!
//! A [`Dialect`] turns a resolved statement plan into a backend-native
//! [`Statement`]. Relational backends implement the smaller [`SqlDialect`]
//! hook trait and share one text translator; the document backend
//! implements [`Dialect`] directly and emits filter documents instead of text.
//! Either way the predicate AST is the same.

mod backends;
mod document;
mod sql;

pub use backends::{MySql, Postgres, SqlServer, Sqlite};
pub use document::{DocumentCommand, DocumentSort, DocumentStore};
pub use sql::SqlDialect;

use crate::error::OrmResult;
use crate::metadata::{FieldDescriptor, TableDescriptor};
use crate::param::ParamMap;
use crate::predicate::PredicateNode;
use crate::value::Value;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Identity of a dialect, used as the metadata cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DialectKind {
    Postgres,
    MySql,
    Sqlite,
    SqlServer,
    Document,
}

impl DialectKind {
    /// Number of variants.
    pub const COUNT: usize = 5;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Backend capability: identifier quoting plus statement emission.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn kind(&self) -> DialectKind;

    /// Quote a table or column name so reserved words are safe identifiers.
    fn quote_identifier(&self, name: &str) -> String;

    fn compile_select(&self, plan: &SelectPlan<'_>) -> OrmResult<Statement>;

    fn compile_count(&self, plan: &CountPlan<'_>) -> OrmResult<Statement>;

    fn compile_update(&self, plan: &UpdatePlan<'_>) -> OrmResult<Statement>;

    fn compile_delete(&self, plan: &DeletePlan<'_>) -> OrmResult<Statement>;

    fn compile_insert(&self, plan: &InsertPlan<'_>) -> OrmResult<Statement>;
}

/// One ORDER BY key.
#[derive(Debug, Clone, Copy)]
pub struct SortKey<'a> {
    pub field: &'a FieldDescriptor,
    pub ascending: bool,
}

/// A resolved SELECT.
#[derive(Debug, Clone)]
pub struct SelectPlan<'a> {
    pub table: &'a TableDescriptor,
    pub filter: Option<&'a PredicateNode>,
    /// Projected fields; never empty.
    pub columns: Vec<&'a FieldDescriptor>,
    pub order: Vec<SortKey<'a>>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

/// A resolved COUNT.
#[derive(Debug, Clone)]
pub struct CountPlan<'a> {
    pub table: &'a TableDescriptor,
    pub filter: Option<&'a PredicateNode>,
}

/// A resolved UPDATE. Assignments keep their first-set order.
#[derive(Debug, Clone)]
pub struct UpdatePlan<'a> {
    pub table: &'a TableDescriptor,
    pub filter: &'a PredicateNode,
    pub assignments: Vec<(&'a FieldDescriptor, &'a Value)>,
}

/// A resolved DELETE.
#[derive(Debug, Clone)]
pub struct DeletePlan<'a> {
    pub table: &'a TableDescriptor,
    pub filter: &'a PredicateNode,
}

/// A resolved single-row INSERT.
#[derive(Debug, Clone)]
pub struct InsertPlan<'a> {
    pub table: &'a TableDescriptor,
    pub values: Vec<(&'a FieldDescriptor, &'a Value)>,
}

/// Parameterized statement text plus its bound values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    pub text: String,
    pub params: ParamMap,
}

/// A compiled, backend-native statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Statement {
    Sql(SqlStatement),
    Document(DocumentCommand),
}

impl Statement {
    /// Statement text for logs and diagnostics. Never contains bound values
    /// for SQL statements.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Statement::Sql(sql) => Cow::Borrowed(&sql.text),
            Statement::Document(cmd) => Cow::Owned(
                serde_json::to_string(cmd).unwrap_or_else(|_| format!("{cmd:?}")),
            ),
        }
    }

    /// Bound parameters; empty for document commands, whose values are
    /// typed document members.
    pub fn params(&self) -> Cow<'_, ParamMap> {
        match self {
            Statement::Sql(sql) => Cow::Borrowed(&sql.params),
            Statement::Document(_) => Cow::Owned(ParamMap::new()),
        }
    }

    pub fn as_sql(&self) -> Option<&SqlStatement> {
        match self {
            Statement::Sql(sql) => Some(sql),
            Statement::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentCommand> {
        match self {
            Statement::Document(cmd) => Some(cmd),
            Statement::Sql(_) => None,
        }
    }
}
