//! Boolean predicate trees over entity fields.
//!
//! Predicates are plain data: a [`PredicateNode`] is built with the free
//! functions in this module (or the combinator methods on the node) and is
//! only reduced to backend syntax when a builder executes.
//!
//! ```ignore
//! use polyorm::predicate::*;
//!
//! let adults_or_unnamed = is_null("name").or(gte("age", 18));
//! let by_ids = in_list("id", ["a", "b"]);
//! let search = contains("name", "ann").and(not_in("status", [Some("banned"), None]));
//! ```

use crate::value::Value;
use std::fmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// The operator obtained by swapping operands (`v < F` is `F > v`).
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::NotEq => CompareOp::NotEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Gte => CompareOp::Lte,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Lte => CompareOp::Gte,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Reference to an entity property.
    Field(String),
    /// A constant known when the predicate is built.
    Constant(Value),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(name) => f.write_str(name),
            Operand::Constant(Value::Null) => f.write_str("null"),
            Operand::Constant(Value::Text(s)) => write!(f, "{s:?}"),
            Operand::Constant(v) => write!(f, "{}", v.to_json()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextMatchKind {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextMatchKind {
    fn method(self) -> &'static str {
        match self {
            TextMatchKind::Contains => "contains",
            TextMatchKind::StartsWith => "starts_with",
            TextMatchKind::EndsWith => "ends_with",
        }
    }
}

/// Predicate AST node.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PredicateNode {
    /// `left op right`; exactly one side must be a field, the other a constant.
    Comparison {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    /// `left AND right` / `left OR right`.
    Logical {
        op: LogicalOp,
        left: Box<PredicateNode>,
        right: Box<PredicateNode>,
    },
    /// Substring / prefix / suffix match. `pattern` is `Text` or `Null`.
    TextMatch {
        field: String,
        pattern: Value,
        kind: TextMatchKind,
        negate: bool,
    },
    /// `field IN (values)`; `values` may contain `Null`.
    Membership {
        field: String,
        values: Vec<Value>,
        negate: bool,
    },
}

impl PredicateNode {
    /// Combine with another predicate using AND.
    pub fn and(self, other: PredicateNode) -> Self {
        and(self, other)
    }

    /// Combine with another predicate using OR.
    pub fn or(self, other: PredicateNode) -> Self {
        or(self, other)
    }

    /// Every property name referenced anywhere in the tree, in visit order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PredicateNode::Comparison { left, right, .. } => {
                for side in [left, right] {
                    if let Operand::Field(name) = side {
                        out.push(name);
                    }
                }
            }
            PredicateNode::Logical { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            PredicateNode::TextMatch { field, .. } | PredicateNode::Membership { field, .. } => {
                out.push(field);
            }
        }
    }

    /// Fold a list of predicates into a left-deep AND chain.
    pub fn all(nodes: impl IntoIterator<Item = PredicateNode>) -> Option<PredicateNode> {
        nodes.into_iter().reduce(and)
    }
}

impl fmt::Display for PredicateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateNode::Comparison { op, left, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
            PredicateNode::Logical { op, left, right } => {
                let op = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                write!(f, "({left}) {op} ({right})")
            }
            PredicateNode::TextMatch {
                field,
                pattern,
                kind,
                negate,
            } => {
                let bang = if *negate { "!" } else { "" };
                let pattern = Operand::Constant(pattern.clone());
                write!(f, "{bang}{field}.{}({pattern})", kind.method())
            }
            PredicateNode::Membership {
                field,
                values,
                negate,
            } => {
                let list: Vec<String> = values
                    .iter()
                    .map(|v| Operand::Constant(v.clone()).to_string())
                    .collect();
                let op = if *negate { "not in" } else { "in" };
                write!(f, "{field} {op} [{}]", list.join(", "))
            }
        }
    }
}

// ==================== Construction API ====================

/// Reference a field as a comparison operand.
pub fn field(name: impl Into<String>) -> Operand {
    Operand::Field(name.into())
}

/// Wrap a constant as a comparison operand.
pub fn constant(value: impl Into<Value>) -> Operand {
    Operand::Constant(value.into())
}

/// General comparison between two operands.
///
/// The compiler accepts a field on either side; field-to-field and
/// constant-to-constant comparisons are rejected at compile time.
pub fn compare(op: CompareOp, left: Operand, right: Operand) -> PredicateNode {
    PredicateNode::Comparison { op, left, right }
}

fn field_cmp(op: CompareOp, name: impl Into<String>, value: impl Into<Value>) -> PredicateNode {
    compare(op, field(name), constant(value))
}

/// `field == value` (`value` may be null)
pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> PredicateNode {
    field_cmp(CompareOp::Eq, name, value)
}

/// `field != value`
pub fn ne(name: impl Into<String>, value: impl Into<Value>) -> PredicateNode {
    field_cmp(CompareOp::NotEq, name, value)
}

/// `field > value`
pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> PredicateNode {
    field_cmp(CompareOp::Gt, name, value)
}

/// `field >= value`
pub fn gte(name: impl Into<String>, value: impl Into<Value>) -> PredicateNode {
    field_cmp(CompareOp::Gte, name, value)
}

/// `field < value`
pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> PredicateNode {
    field_cmp(CompareOp::Lt, name, value)
}

/// `field <= value`
pub fn lte(name: impl Into<String>, value: impl Into<Value>) -> PredicateNode {
    field_cmp(CompareOp::Lte, name, value)
}

/// `field == null`
pub fn is_null(name: impl Into<String>) -> PredicateNode {
    eq(name, Value::Null)
}

/// `field != null`
pub fn is_not_null(name: impl Into<String>) -> PredicateNode {
    ne(name, Value::Null)
}

pub fn and(left: PredicateNode, right: PredicateNode) -> PredicateNode {
    PredicateNode::Logical {
        op: LogicalOp::And,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn or(left: PredicateNode, right: PredicateNode) -> PredicateNode {
    PredicateNode::Logical {
        op: LogicalOp::Or,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn text_match(
    name: impl Into<String>,
    pattern: impl Into<Value>,
    kind: TextMatchKind,
    negate: bool,
) -> PredicateNode {
    PredicateNode::TextMatch {
        field: name.into(),
        pattern: pattern.into(),
        kind,
        negate,
    }
}

/// `field` contains `pattern` (`Option<&str>` / `None` allowed).
pub fn contains(name: impl Into<String>, pattern: impl Into<Value>) -> PredicateNode {
    text_match(name, pattern, TextMatchKind::Contains, false)
}

pub fn starts_with(name: impl Into<String>, pattern: impl Into<Value>) -> PredicateNode {
    text_match(name, pattern, TextMatchKind::StartsWith, false)
}

pub fn ends_with(name: impl Into<String>, pattern: impl Into<Value>) -> PredicateNode {
    text_match(name, pattern, TextMatchKind::EndsWith, false)
}

pub fn not_contains(name: impl Into<String>, pattern: impl Into<Value>) -> PredicateNode {
    text_match(name, pattern, TextMatchKind::Contains, true)
}

pub fn not_starts_with(name: impl Into<String>, pattern: impl Into<Value>) -> PredicateNode {
    text_match(name, pattern, TextMatchKind::StartsWith, true)
}

pub fn not_ends_with(name: impl Into<String>, pattern: impl Into<Value>) -> PredicateNode {
    text_match(name, pattern, TextMatchKind::EndsWith, true)
}

/// `field IN (values)`. Pass `Option<T>` items to include null.
pub fn in_list<V: Into<Value>>(
    name: impl Into<String>,
    values: impl IntoIterator<Item = V>,
) -> PredicateNode {
    PredicateNode::Membership {
        field: name.into(),
        values: values.into_iter().map(Into::into).collect(),
        negate: false,
    }
}

/// `field NOT IN (values)`.
pub fn not_in<V: Into<Value>>(
    name: impl Into<String>,
    values: impl IntoIterator<Item = V>,
) -> PredicateNode {
    PredicateNode::Membership {
        field: name.into(),
        values: values.into_iter().map(Into::into).collect(),
        negate: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_collected_in_order() {
        let p = is_null("name").or(gte("age", 18).and(in_list("id", ["a"])));
        assert_eq!(p.fields(), vec!["name", "age", "id"]);
    }

    #[test]
    fn display_names_the_expression() {
        let p = is_null("name").or(gte("age", 18));
        assert_eq!(p.to_string(), "(name == null) || (age >= 18)");
        assert_eq!(contains("name", "x").to_string(), "name.contains(\"x\")");
        assert_eq!(
            not_in("id", [Some("a"), None]).to_string(),
            "id not in [\"a\", null]"
        );
    }

    #[test]
    fn all_folds_left() {
        assert!(PredicateNode::all(Vec::new()).is_none());
        let folded = PredicateNode::all([eq("a", 1), eq("b", 2), eq("c", 3)]).unwrap();
        assert_eq!(folded, and(and(eq("a", 1), eq("b", 2)), eq("c", 3)));
    }

    #[test]
    fn flip_mirrors_ordering_ops() {
        assert_eq!(CompareOp::Lt.flip(), CompareOp::Gt);
        assert_eq!(CompareOp::Gte.flip(), CompareOp::Lte);
        assert_eq!(CompareOp::NotEq.flip(), CompareOp::NotEq);
    }
}
