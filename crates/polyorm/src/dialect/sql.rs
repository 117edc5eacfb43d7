//! Shared text translator for relational backends.

use super::{
    CountPlan, DeletePlan, Dialect, DialectKind, InsertPlan, SelectPlan, SqlStatement, Statement,
    UpdatePlan,
};
use crate::compiler;
use crate::error::{OrmError, OrmResult};
use crate::metadata::TableDescriptor;
use crate::param::{ASSIGNMENT_PREFIX, FILTER_PREFIX, ParamMap};
use crate::predicate::PredicateNode;
use std::fmt;

/// Syntax hooks for a relational backend.
///
/// Implementors get [`Dialect`] through a blanket impl: statement layout,
/// predicate compilation and parameter naming are shared, only the pieces
/// below vary.
pub trait SqlDialect: Send + Sync + fmt::Debug {
    const KIND: DialectKind;

    /// Opening and closing identifier quote characters.
    fn identifier_quotes(&self) -> (char, char);

    /// Placeholder text for a parameter, given its name and 1-based position.
    fn placeholder(&self, name: &str, position: usize) -> String;

    /// Paging suffix, or `None` when neither bound is set.
    fn limit_offset(&self, skip: Option<u64>, take: Option<u64>) -> Option<String>;

    /// Whether paging syntax is only valid after an ORDER BY.
    fn paging_requires_order(&self) -> bool {
        false
    }

    /// The backend refuses a zero row count in its paging clause; a
    /// `take(0)` query is then compiled as an always-false filter instead.
    fn rejects_zero_fetch(&self) -> bool {
        false
    }

    /// Escape `%`, `_` and the escape character itself so user text in a
    /// LIKE pattern matches literally.
    fn escape_like(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                out.push('\\');
            }
            out.push(ch);
        }
        out
    }

    /// Suffix appended after a LIKE operand, e.g. ` ESCAPE '\'`.
    fn like_escape_clause(&self) -> &'static str {
        " ESCAPE '\\'"
    }

    fn always_false(&self) -> &'static str {
        "1=0"
    }

    fn always_true(&self) -> &'static str {
        "1=1"
    }

    /// Quote an identifier, doubling any embedded closing quote.
    fn quote(&self, name: &str) -> String {
        let (open, close) = self.identifier_quotes();
        let mut out = String::with_capacity(name.len() + 2);
        out.push(open);
        for ch in name.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
        out
    }
}

fn where_clause<D: SqlDialect>(
    dialect: &D,
    filter: &PredicateNode,
    table: &TableDescriptor,
    params: &mut ParamMap,
    sql: &mut String,
) -> OrmResult<()> {
    let clause = compiler::compile_sql_into(filter, table, dialect, params, FILTER_PREFIX)?;
    sql.push_str(" WHERE ");
    sql.push_str(&clause);
    Ok(())
}

fn finish(text: String, params: ParamMap) -> OrmResult<Statement> {
    Ok(Statement::Sql(SqlStatement { text, params }))
}

impl<D: SqlDialect> Dialect for D {
    fn kind(&self) -> DialectKind {
        D::KIND
    }

    fn quote_identifier(&self, name: &str) -> String {
        self.quote(name)
    }

    fn compile_select(&self, plan: &SelectPlan<'_>) -> OrmResult<Statement> {
        if plan.columns.is_empty() {
            return Err(OrmError::configuration(format!(
                "select on '{}' has an empty projection",
                plan.table.entity()
            )));
        }

        let mut params = ParamMap::new();
        let columns: Vec<&str> = plan.columns.iter().map(|f| f.column.as_str()).collect();
        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), plan.table.table());

        if plan.take == Some(0) && self.rejects_zero_fetch() {
            let never = self.always_false();
            match plan.filter {
                Some(filter) => {
                    let clause = compiler::compile_sql_into(
                        filter,
                        plan.table,
                        self,
                        &mut params,
                        FILTER_PREFIX,
                    )?;
                    sql.push_str(&format!(" WHERE ({clause}) AND ({never})"));
                }
                None => sql.push_str(&format!(" WHERE {never}")),
            }
            return finish(sql, params);
        }

        if let Some(filter) = plan.filter {
            where_clause(self, filter, plan.table, &mut params, &mut sql)?;
        }

        let paged = plan.skip.is_some() || plan.take.is_some();
        if !plan.order.is_empty() {
            let keys: Vec<String> = plan
                .order
                .iter()
                .map(|k| {
                    let dir = if k.ascending { "ASC" } else { "DESC" };
                    format!("{} {dir}", k.field.column)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        } else if paged && self.paging_requires_order() {
            sql.push_str(" ORDER BY (SELECT NULL)");
        }

        if let Some(paging) = self.limit_offset(plan.skip, plan.take) {
            sql.push(' ');
            sql.push_str(&paging);
        }

        finish(sql, params)
    }

    fn compile_count(&self, plan: &CountPlan<'_>) -> OrmResult<Statement> {
        let mut params = ParamMap::new();
        let mut sql = format!("SELECT COUNT(1) FROM {}", plan.table.table());
        if let Some(filter) = plan.filter {
            where_clause(self, filter, plan.table, &mut params, &mut sql)?;
        }
        finish(sql, params)
    }

    fn compile_update(&self, plan: &UpdatePlan<'_>) -> OrmResult<Statement> {
        if plan.assignments.is_empty() {
            return Err(OrmError::unconditional(format!(
                "update on '{}' has no assignments",
                plan.table.entity()
            )));
        }

        let mut params = ParamMap::new();
        let sets: Vec<String> = plan
            .assignments
            .iter()
            .map(|(field, value)| {
                let (name, position) = params.push(ASSIGNMENT_PREFIX, (*value).clone());
                format!("{} = {}", field.column, self.placeholder(&name, position))
            })
            .collect();
        let mut sql = format!("UPDATE {} SET {}", plan.table.table(), sets.join(", "));
        where_clause(self, plan.filter, plan.table, &mut params, &mut sql)?;
        finish(sql, params)
    }

    fn compile_delete(&self, plan: &DeletePlan<'_>) -> OrmResult<Statement> {
        let mut params = ParamMap::new();
        let mut sql = format!("DELETE FROM {}", plan.table.table());
        where_clause(self, plan.filter, plan.table, &mut params, &mut sql)?;
        finish(sql, params)
    }

    fn compile_insert(&self, plan: &InsertPlan<'_>) -> OrmResult<Statement> {
        if plan.values.is_empty() {
            return Err(OrmError::configuration(format!(
                "insert into '{}' has no values",
                plan.table.entity()
            )));
        }

        let mut params = ParamMap::new();
        let mut columns = Vec::with_capacity(plan.values.len());
        let mut placeholders = Vec::with_capacity(plan.values.len());
        for (field, value) in &plan.values {
            let (name, position) = params.push(FILTER_PREFIX, (*value).clone());
            columns.push(field.column.as_str());
            placeholders.push(self.placeholder(&name, position));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            plan.table.table(),
            columns.join(", "),
            placeholders.join(", ")
        );
        finish(sql, params)
    }
}
