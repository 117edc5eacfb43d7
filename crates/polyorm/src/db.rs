//! Per-executor entry point.

use crate::entity::Entity;
use crate::error::OrmResult;
use crate::executor::{ExecContext, StatementExecutor, StatementKind, log_dispatch};
use crate::metadata;
use crate::qb::insert::{insert_statement, save_statements};
use crate::qb::{DeleteBuilder, QueryBuilder, UpdateBuilder};

/// Builder factory bound to one executor.
#[derive(Debug, Clone)]
pub struct Db<X> {
    executor: X,
}

impl<X: StatementExecutor> Db<X> {
    pub fn new(executor: X) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn as_queryable<E: Entity>(&self) -> QueryBuilder<'_, E, X> {
        QueryBuilder::new(&self.executor, None)
    }

    /// Query with a shard / routing key passed through to the executor.
    pub fn as_queryable_routed<E: Entity>(
        &self,
        routing_key: impl Into<String>,
    ) -> QueryBuilder<'_, E, X> {
        QueryBuilder::new(&self.executor, Some(routing_key.into()))
    }

    pub fn as_updatable<E: Entity>(&self) -> UpdateBuilder<'_, E, X> {
        UpdateBuilder::new(&self.executor, None)
    }

    pub fn as_updatable_routed<E: Entity>(
        &self,
        routing_key: impl Into<String>,
    ) -> UpdateBuilder<'_, E, X> {
        UpdateBuilder::new(&self.executor, Some(routing_key.into()))
    }

    pub fn as_deletable<E: Entity>(&self) -> DeleteBuilder<'_, E, X> {
        DeleteBuilder::new(&self.executor, None)
    }

    pub fn as_deletable_routed<E: Entity>(
        &self,
        routing_key: impl Into<String>,
    ) -> DeleteBuilder<'_, E, X> {
        DeleteBuilder::new(&self.executor, Some(routing_key.into()))
    }

    /// Insert one entity; returns the affected-row count.
    pub async fn insert<E: Entity>(&self, entity: &E) -> OrmResult<u64> {
        let dialect = self.executor.dialect();
        let table = metadata::descriptor::<E>(dialect)?;
        let statement = insert_statement(&table, dialect, entity)?;
        let ctx = ExecContext::write(StatementKind::Insert, table.entity());
        log_dispatch(&self.executor, &statement, &ctx);
        self.executor.execute(&statement, &ctx).await
    }

    /// Replace the row with the entity's primary key: delete then insert,
    /// atomically.
    pub async fn save<E: Entity>(&self, entity: &E) -> OrmResult<u64> {
        let dialect = self.executor.dialect();
        let table = metadata::descriptor::<E>(dialect)?;
        let statements = save_statements(&table, dialect, entity)?;
        let ctx = ExecContext::write(StatementKind::Insert, table.entity()).in_transaction();
        for statement in &statements {
            log_dispatch(&self.executor, statement, &ctx);
        }
        self.executor.execute_batch(&statements, &ctx).await
    }
}
