//! Query builder: filtered, sorted, projected and paged reads.

use super::scope::{Scope, dispatch_fetch};
use crate::cursor;
use crate::dialect::{CountPlan, SelectPlan, SortKey, Statement};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::executor::{ExecMode, StatementExecutor, StatementKind};
use crate::metadata::{FieldDescriptor, TableDescriptor};
use crate::predicate::PredicateNode;
use crate::record::Record;

/// One page of results plus the token for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub items: Vec<E>,
    /// Pass to [`QueryBuilder::skip_cursor`] to continue after this page.
    pub next_cursor: String,
}

/// Fluent read builder for entity `E`.
///
/// Field names are checked as they are added; the first problem is reported
/// by the terminal call, before anything is sent to the executor.
///
/// ```ignore
/// let adults = db
///     .as_queryable::<User>()
///     .filter(is_null("name").or(gte("age", 18)))
///     .order_by("age")
///     .skip(50)
///     .take(10)
///     .to_list()
///     .await?;
/// ```
pub struct QueryBuilder<'a, E, X> {
    scope: Scope<'a, E, X>,
    sort_keys: Vec<(String, bool)>,
    select_fields: Vec<String>,
    unselect_fields: Vec<String>,
    /// Integer skip or decoded cursor; last call wins.
    skip: Option<OrmResult<u64>>,
    take: Option<u64>,
}

impl<'a, E: Entity, X: StatementExecutor> QueryBuilder<'a, E, X> {
    pub fn new(executor: &'a X, routing_key: Option<String>) -> Self {
        Self {
            scope: Scope::new(executor, routing_key),
            sort_keys: Vec::new(),
            select_fields: Vec::new(),
            unselect_fields: Vec::new(),
            skip: None,
            take: None,
        }
    }

    /// AND-merge a predicate into the filter.
    pub fn filter(mut self, predicate: PredicateNode) -> Self {
        self.scope.add_filter(predicate);
        self
    }

    /// Append an ascending sort key.
    pub fn order_by(self, field: &str) -> Self {
        self.push_sort(field, true)
    }

    /// Append a descending sort key.
    pub fn order_by_descending(self, field: &str) -> Self {
        self.push_sort(field, false)
    }

    fn push_sort(mut self, field: &str, ascending: bool) -> Self {
        self.scope.check_field(field);
        self.sort_keys.push((field.to_string(), ascending));
        self
    }

    /// Add a field to the projection. Without any `select`, all fields are read.
    pub fn select(mut self, field: &str) -> Self {
        self.scope.check_field(field);
        self.select_fields.push(field.to_string());
        self
    }

    /// Remove a field from the projection.
    ///
    /// If this leaves nothing to read, the projection falls back to all fields.
    pub fn unselect(mut self, field: &str) -> Self {
        self.scope.check_field(field);
        self.unselect_fields.push(field.to_string());
        self
    }

    pub fn skip(mut self, offset: u64) -> Self {
        self.skip = Some(Ok(offset));
        self
    }

    /// Continue from a token returned by [`QueryBuilder::to_result`].
    pub fn skip_cursor(mut self, token: &str) -> Self {
        self.skip = Some(cursor::decode(token));
        self
    }

    pub fn take(mut self, limit: u64) -> Self {
        self.take = Some(limit);
        self
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.scope.routing_key()
    }

    // ==================== Terminal operations ====================

    /// Count matching rows. Sort, skip and take are ignored.
    pub async fn count(self) -> OrmResult<u64> {
        let statement = self.compile_count()?;
        let ctx = self.scope.context(StatementKind::Count, ExecMode::Read);
        let records = dispatch_fetch(self.scope.executor, &statement, &ctx).await?;
        count_of(records)
    }

    /// Whether at least one row matches. Reads only the primary key.
    pub async fn any(self) -> OrmResult<bool> {
        let statement = self.compile_select(Some(1), true)?;
        let ctx = self.scope.context(StatementKind::Select, ExecMode::Read);
        let records = dispatch_fetch(self.scope.executor, &statement, &ctx).await?;
        Ok(!records.is_empty())
    }

    /// The first matching entity, if any.
    pub async fn first(self) -> OrmResult<Option<E>> {
        let statement = self.compile_select(Some(1), false)?;
        let ctx = self.scope.context(StatementKind::Select, ExecMode::Read);
        let records = dispatch_fetch(self.scope.executor, &statement, &ctx).await?;
        records.into_iter().next().map(E::from_record).transpose()
    }

    /// All matching entities. Fails with `UnconditionalOperation` when no
    /// filter was given.
    pub async fn to_list(self) -> OrmResult<Vec<E>> {
        self.scope.required_filter("to_list")?;
        let statement = self.compile_select(self.take, false)?;
        let ctx = self.scope.context(StatementKind::Select, ExecMode::Read);
        let records = dispatch_fetch(self.scope.executor, &statement, &ctx).await?;
        records.into_iter().map(E::from_record).collect()
    }

    /// Like [`QueryBuilder::to_list`], plus a cursor for the following page.
    pub async fn to_result(self) -> OrmResult<Page<E>> {
        self.scope.required_filter("to_result")?;
        let offset = self.resolved_skip()?.unwrap_or(0);
        let statement = self.compile_select(self.take, false)?;
        let ctx = self.scope.context(StatementKind::Select, ExecMode::Read);
        let records = dispatch_fetch(self.scope.executor, &statement, &ctx).await?;
        let items = records
            .into_iter()
            .map(E::from_record)
            .collect::<OrmResult<Vec<E>>>()?;
        let next = offset.checked_add(items.len() as u64).ok_or_else(|| {
            OrmError::InvalidCursor(format!("offset {offset} leaves no room for another page"))
        })?;
        let next_cursor = cursor::encode(next);
        Ok(Page { items, next_cursor })
    }

    /// Compile the full query without executing it.
    pub fn to_statement(&self) -> OrmResult<Statement> {
        self.compile_select(self.take, false)
    }

    // ==================== Compilation ====================

    fn resolved_skip(&self) -> OrmResult<Option<u64>> {
        match &self.skip {
            None => Ok(None),
            Some(Ok(offset)) => Ok(Some(*offset)),
            Some(Err(err)) => Err(err.replay()),
        }
    }

    fn compile_count(&self) -> OrmResult<Statement> {
        let table = self.scope.table()?;
        let plan = CountPlan {
            table,
            filter: self.scope.filter.as_ref(),
        };
        self.scope.executor.dialect().compile_count(&plan)
    }

    fn compile_select(&self, take: Option<u64>, key_only: bool) -> OrmResult<Statement> {
        let table = self.scope.table()?;
        let skip = self.resolved_skip()?;
        let columns = if key_only {
            vec![table.primary_key()]
        } else {
            self.projection(table)?
        };
        let order = self
            .sort_keys
            .iter()
            .map(|(name, ascending)| {
                Ok(SortKey {
                    field: table.field(name)?,
                    ascending: *ascending,
                })
            })
            .collect::<OrmResult<Vec<_>>>()?;

        let plan = SelectPlan {
            table,
            filter: self.scope.filter.as_ref(),
            columns,
            order,
            skip,
            take,
        };
        self.scope.executor.dialect().compile_select(&plan)
    }

    fn projection<'t>(&self, table: &'t TableDescriptor) -> OrmResult<Vec<&'t FieldDescriptor>> {
        let mut selected: Vec<&FieldDescriptor> = Vec::new();
        if self.select_fields.is_empty() {
            selected.extend(table.fields());
        } else {
            for name in &self.select_fields {
                let field = table.field(name)?;
                if !selected.iter().any(|f| f.property == field.property) {
                    selected.push(field);
                }
            }
        }

        selected.retain(|f| !self.unselect_fields.iter().any(|u| u == f.property));
        if selected.is_empty() {
            return Ok(table.fields().iter().collect());
        }
        Ok(selected)
    }
}

/// Read the count from the first column of the first record.
fn count_of(records: Vec<Record>) -> OrmResult<u64> {
    let Some(record) = records.into_iter().next() else {
        return Ok(0);
    };
    let Some((column, _)) = record.columns().next() else {
        return Ok(0);
    };
    let column = column.to_string();
    let count: i64 = record.try_get(&column)?;
    u64::try_from(count).map_err(|_| OrmError::decode(column, "negative count"))
}
