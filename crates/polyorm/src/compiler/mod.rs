//! Predicate compilation.
//!
//! Compilation happens in two steps. [`lower`] resolves field names against a
//! [`TableDescriptor`] and applies the null-aware rewrite rules, producing a
//! small tree of clauses that already say exactly which rows match. The
//! renderers in [`sql`] and [`document`] then spell that tree in backend
//! syntax without making any semantic decisions of their own, so the same
//! predicate selects the same rows on every backend.
//!
//! The rewrite rules follow two-valued logic: a comparison against a null
//! column is never "unknown". `name != "x"` matches rows where `name` is null,
//! `age < 5` does not.

pub(crate) mod document;
pub(crate) mod sql;

use crate::dialect::SqlDialect;
use crate::error::{OrmError, OrmResult};
use crate::metadata::{FieldDescriptor, TableDescriptor};
use crate::param::{FILTER_PREFIX, ParamMap};
use crate::predicate::{CompareOp, LogicalOp, Operand, PredicateNode, TextMatchKind};
use crate::value::{Value, ValueType};

/// Extra null handling wrapped around a core clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guard {
    None,
    /// `column IS NULL OR <core>`
    OrNull,
    /// `column IS NOT NULL AND <core>`
    AndNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Clause<'a> {
    /// Constant truth value.
    Always(bool),
    /// `IS NULL`, or `IS NOT NULL` when negated.
    Null {
        field: &'a FieldDescriptor,
        negate: bool,
    },
    Compare {
        field: &'a FieldDescriptor,
        op: CompareOp,
        value: &'a Value,
        guard: Guard,
    },
    /// `values` never contains null and is never empty.
    In {
        field: &'a FieldDescriptor,
        values: Vec<&'a Value>,
        negate: bool,
        guard: Guard,
    },
    /// `pattern` is raw user text and never empty.
    Like {
        field: &'a FieldDescriptor,
        pattern: &'a str,
        kind: TextMatchKind,
        negate: bool,
        guard: Guard,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lowered<'a> {
    Clause(Clause<'a>),
    Logical {
        op: LogicalOp,
        left: Box<Lowered<'a>>,
        right: Box<Lowered<'a>>,
    },
}

/// Resolve fields and apply the null-aware rewrite rules.
pub(crate) fn lower<'a>(
    node: &'a PredicateNode,
    table: &'a TableDescriptor,
) -> OrmResult<Lowered<'a>> {
    match node {
        PredicateNode::Logical { op, left, right } => Ok(Lowered::Logical {
            op: *op,
            left: Box::new(lower(left, table)?),
            right: Box::new(lower(right, table)?),
        }),
        PredicateNode::Comparison { op, left, right } => {
            lower_comparison(node, *op, left, right, table).map(Lowered::Clause)
        }
        PredicateNode::Membership {
            field,
            values,
            negate,
        } => Ok(Lowered::Clause(lower_membership(
            table.field(field)?,
            values,
            *negate,
        ))),
        PredicateNode::TextMatch {
            field,
            pattern,
            kind,
            negate,
        } => {
            let field = table.field(field)?;
            if field.value_type != ValueType::Text {
                return Err(OrmError::unsupported(format!(
                    "text match on non-text field '{}': {node}",
                    field.property
                )));
            }
            lower_text_match(node, field, pattern, *kind, *negate).map(Lowered::Clause)
        }
    }
}

fn lower_comparison<'a>(
    node: &PredicateNode,
    op: CompareOp,
    left: &'a Operand,
    right: &'a Operand,
    table: &'a TableDescriptor,
) -> OrmResult<Clause<'a>> {
    // Normalise to `field op constant`.
    let (op, name, value) = match (left, right) {
        (Operand::Field(name), Operand::Constant(value)) => (op, name, value),
        (Operand::Constant(value), Operand::Field(name)) => (op.flip(), name, value),
        (Operand::Field(_), Operand::Field(_)) => {
            return Err(OrmError::unsupported(format!(
                "comparison between two fields is not supported: {node}"
            )));
        }
        (Operand::Constant(_), Operand::Constant(_)) => {
            return Err(OrmError::unsupported(format!(
                "comparison does not reference a field: {node}"
            )));
        }
    };
    let field = table.field(name)?;

    if value.is_null() {
        return Ok(match op {
            CompareOp::Eq => Clause::Null {
                field,
                negate: false,
            },
            CompareOp::NotEq => Clause::Null {
                field,
                negate: true,
            },
            // Ordering against null never holds.
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                Clause::Always(false)
            }
        });
    }

    let guard = match op {
        CompareOp::Eq | CompareOp::Gt | CompareOp::Gte => Guard::None,
        CompareOp::NotEq => Guard::OrNull,
        CompareOp::Lt | CompareOp::Lte => Guard::AndNotNull,
    };
    Ok(Clause::Compare {
        field,
        op,
        value,
        guard,
    })
}

fn lower_membership<'a>(
    field: &'a FieldDescriptor,
    values: &'a [Value],
    negate: bool,
) -> Clause<'a> {
    if values.is_empty() {
        // IN () matches nothing, NOT IN () matches everything.
        return Clause::Always(negate);
    }

    let has_null = values.iter().any(Value::is_null);
    let values: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    if values.is_empty() {
        return Clause::Null { field, negate };
    }

    let guard = match (negate, has_null) {
        (false, false) => Guard::None,
        (false, true) => Guard::OrNull,
        (true, false) => Guard::OrNull,
        (true, true) => Guard::AndNotNull,
    };
    Clause::In {
        field,
        values,
        negate,
        guard,
    }
}

fn lower_text_match<'a>(
    node: &PredicateNode,
    field: &'a FieldDescriptor,
    pattern: &'a Value,
    kind: TextMatchKind,
    negate: bool,
) -> OrmResult<Clause<'a>> {
    match pattern {
        Value::Null => Ok(Clause::Always(false)),
        // Every non-null string contains the empty string.
        Value::Text(text) if text.is_empty() => Ok(Clause::Null {
            field,
            negate: !negate,
        }),
        Value::Text(text) => Ok(Clause::Like {
            field,
            pattern: text,
            kind,
            negate,
            guard: if negate { Guard::OrNull } else { Guard::None },
        }),
        _ => Err(OrmError::unsupported(format!(
            "text match pattern must be a string: {node}"
        ))),
    }
}

/// A compiled WHERE fragment and the parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledClause {
    pub text: String,
    pub params: ParamMap,
}

/// Compile a predicate into a relational WHERE fragment.
///
/// Parameters are named `Parameter1`, `Parameter2`, ... in the order their
/// placeholders appear in the text.
pub fn compile_sql<D: SqlDialect>(
    node: &PredicateNode,
    table: &TableDescriptor,
    dialect: &D,
) -> OrmResult<CompiledClause> {
    let mut params = ParamMap::new();
    let text = compile_sql_into(node, table, dialect, &mut params, FILTER_PREFIX)?;
    Ok(CompiledClause { text, params })
}

/// Compile into an existing parameter map, naming new parameters with `prefix`.
pub fn compile_sql_into<D: SqlDialect>(
    node: &PredicateNode,
    table: &TableDescriptor,
    dialect: &D,
    params: &mut ParamMap,
    prefix: &str,
) -> OrmResult<String> {
    let lowered = lower(node, table)?;
    Ok(sql::render(&lowered, dialect, params, prefix))
}

/// Compile a predicate into a document-store filter.
pub fn compile_document(
    node: &PredicateNode,
    table: &TableDescriptor,
) -> OrmResult<serde_json::Value> {
    let lowered = lower(node, table)?;
    Ok(document::render(&lowered))
}
