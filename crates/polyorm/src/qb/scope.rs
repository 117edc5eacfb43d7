//! State shared by every builder: target table, filters, routing and the
//! first recorded construction error.

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecContext, ExecMode, StatementExecutor, StatementKind, log_dispatch};
use crate::dialect::Statement;
use crate::metadata::{self, TableDescriptor};
use crate::predicate::PredicateNode;
use std::marker::PhantomData;
use std::sync::Arc;

pub(crate) struct Scope<'a, E, X> {
    pub(crate) executor: &'a X,
    table: Option<Arc<TableDescriptor>>,
    routing_key: Option<String>,
    /// AND of every `filter` call so far.
    pub(crate) filter: Option<PredicateNode>,
    build_error: Option<OrmError>,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity, X: StatementExecutor> Scope<'a, E, X> {
    pub(crate) fn new(executor: &'a X, routing_key: Option<String>) -> Self {
        let (table, build_error) = match metadata::descriptor::<E>(executor.dialect()) {
            Ok(table) => (Some(table), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            executor,
            table,
            routing_key,
            filter: None,
            build_error,
            _entity: PhantomData,
        }
    }

    /// Record an error; the first one wins.
    pub(crate) fn fail(&mut self, err: OrmError) {
        if self.build_error.is_none() {
            self.build_error = Some(err);
        }
    }

    /// Record `FieldNotFound` if `property` is not mapped.
    pub(crate) fn check_field(&mut self, property: &str) {
        let err = self
            .table
            .as_ref()
            .and_then(|t| t.field(property).err());
        if let Some(err) = err {
            self.fail(err);
        }
    }

    /// AND-merge a predicate, validating its field references.
    pub(crate) fn add_filter(&mut self, predicate: PredicateNode) {
        let err = self
            .table
            .as_ref()
            .and_then(|t| t.validate(&predicate).err());
        if let Some(err) = err {
            self.fail(err);
        }
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
    }

    /// The resolved table, or the first recorded error.
    pub(crate) fn table(&self) -> OrmResult<&TableDescriptor> {
        if let Some(err) = &self.build_error {
            return Err(err.replay());
        }
        self.table.as_deref().ok_or_else(|| {
            OrmError::configuration(format!("no table descriptor for '{}'", std::any::type_name::<E>()))
        })
    }

    /// The merged filter, or `UnconditionalOperation` naming `operation`.
    pub(crate) fn required_filter(&self, operation: &str) -> OrmResult<&PredicateNode> {
        self.filter.as_ref().ok_or_else(|| {
            OrmError::unconditional(format!(
                "{operation} on '{}' requires at least one filter",
                self.entity_name()
            ))
        })
    }

    fn entity_name(&self) -> &'static str {
        match &self.table {
            Some(table) => table.entity(),
            None => std::any::type_name::<E>(),
        }
    }

    pub(crate) fn context(&self, kind: StatementKind, mode: ExecMode) -> ExecContext {
        let ctx = match mode {
            ExecMode::Read => ExecContext::read(kind, self.entity_name()),
            ExecMode::Write => ExecContext::write(kind, self.entity_name()),
        };
        ctx.with_routing_key(self.routing_key.clone())
    }

    pub(crate) fn routing_key(&self) -> Option<&str> {
        self.routing_key.as_deref()
    }
}

/// Log then fetch.
pub(crate) async fn dispatch_fetch<X: StatementExecutor>(
    executor: &X,
    statement: &Statement,
    ctx: &ExecContext,
) -> OrmResult<Vec<crate::record::Record>> {
    log_dispatch(executor, statement, ctx);
    executor.fetch(statement, ctx).await
}

/// Log then execute.
pub(crate) async fn dispatch_execute<X: StatementExecutor>(
    executor: &X,
    statement: &Statement,
    ctx: &ExecContext,
) -> OrmResult<u64> {
    log_dispatch(executor, statement, ctx);
    executor.execute(statement, ctx).await
}
