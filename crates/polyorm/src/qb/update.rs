//! Filtered UPDATE builder.

use super::scope::{Scope, dispatch_execute};
use crate::dialect::{Statement, UpdatePlan};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecMode, StatementExecutor, StatementKind};
use crate::predicate::PredicateNode;
use crate::value::Value;

/// Fluent update builder for entity `E`.
///
/// Refuses to run without both a filter and at least one assignment.
/// Assignment parameters are named `U_Parameter{n}`, filter parameters
/// `Parameter{n}`.
pub struct UpdateBuilder<'a, E, X> {
    scope: Scope<'a, E, X>,
    /// In first-set order; a repeated field overwrites its value in place.
    assignments: Vec<(String, Value)>,
}

impl<'a, E: Entity, X: StatementExecutor> UpdateBuilder<'a, E, X> {
    pub fn new(executor: &'a X, routing_key: Option<String>) -> Self {
        Self {
            scope: Scope::new(executor, routing_key),
            assignments: Vec::new(),
        }
    }

    /// AND-merge a predicate into the filter.
    pub fn filter(mut self, predicate: PredicateNode) -> Self {
        self.scope.add_filter(predicate);
        self
    }

    /// Assign a value to a field.
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.assign(field, value.into());
        self
    }

    /// Assign several fields at once.
    pub fn set_many<K, V, I>(mut self, values: I) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (field, value) in values {
            self.assign(field.as_ref(), value.into());
        }
        self
    }

    fn assign(&mut self, field: &str, value: Value) {
        self.scope.check_field(field);
        match self.assignments.iter_mut().find(|(f, _)| f == field) {
            Some(slot) => slot.1 = value,
            None => self.assignments.push((field.to_string(), value)),
        }
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.scope.routing_key()
    }

    /// Run the update in a transaction; returns the affected-row count.
    pub async fn update(self) -> OrmResult<u64> {
        let statement = self.to_statement()?;
        let ctx = self
            .scope
            .context(StatementKind::Update, ExecMode::Write)
            .in_transaction();
        dispatch_execute(self.scope.executor, &statement, &ctx).await
    }

    /// Compile without executing. Applies the same guards as [`UpdateBuilder::update`].
    pub fn to_statement(&self) -> OrmResult<Statement> {
        let table = self.scope.table()?;
        let filter = self.scope.required_filter("update")?;
        if self.assignments.is_empty() {
            return Err(OrmError::unconditional(format!(
                "update on '{}' has no assignments",
                table.entity()
            )));
        }

        let assignments = self
            .assignments
            .iter()
            .map(|(name, value)| Ok((table.field(name)?, value)))
            .collect::<OrmResult<Vec<_>>>()?;
        let plan = UpdatePlan {
            table,
            filter,
            assignments,
        };
        self.scope.executor.dialect().compile_update(&plan)
    }
}
