//! Filtered DELETE builder.

use super::scope::{Scope, dispatch_execute};
use crate::dialect::{DeletePlan, Statement};
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::executor::{ExecMode, StatementExecutor, StatementKind};
use crate::predicate::PredicateNode;

/// Fluent delete builder for entity `E`. Refuses to run without a filter.
pub struct DeleteBuilder<'a, E, X> {
    scope: Scope<'a, E, X>,
}

impl<'a, E: Entity, X: StatementExecutor> DeleteBuilder<'a, E, X> {
    pub fn new(executor: &'a X, routing_key: Option<String>) -> Self {
        Self {
            scope: Scope::new(executor, routing_key),
        }
    }

    /// AND-merge a predicate into the filter.
    pub fn filter(mut self, predicate: PredicateNode) -> Self {
        self.scope.add_filter(predicate);
        self
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.scope.routing_key()
    }

    /// Delete matching rows; returns the affected-row count.
    pub async fn delete(self) -> OrmResult<u64> {
        let statement = self.to_statement()?;
        let ctx = self.scope.context(StatementKind::Delete, ExecMode::Write);
        dispatch_execute(self.scope.executor, &statement, &ctx).await
    }

    pub fn to_statement(&self) -> OrmResult<Statement> {
        let table = self.scope.table()?;
        let filter = self.scope.required_filter("delete")?;
        self.scope
            .executor
            .dialect()
            .compile_delete(&DeletePlan { table, filter })
    }
}
