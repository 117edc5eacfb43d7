//! Document-store rendering of lowered predicates.
//!
//! Filters use the Mongo query operator vocabulary (`$eq`, `$in`, `$regex`,
//! `$and`, ...). Values are embedded as typed JSON members; there is no text
//! to inject into.

use super::{Clause, Guard, Lowered};
use crate::metadata::FieldDescriptor;
use crate::predicate::{CompareOp, LogicalOp, TextMatchKind};
use serde_json::{Map, Value as Json, json};

pub(crate) fn render(lowered: &Lowered<'_>) -> Json {
    match lowered {
        Lowered::Logical { op, left, right } => {
            let key = match op {
                LogicalOp::And => "$and",
                LogicalOp::Or => "$or",
            };
            member(key, json!([render(left), render(right)]))
        }
        Lowered::Clause(clause) => render_clause(clause),
    }
}

fn render_clause(clause: &Clause<'_>) -> Json {
    match clause {
        Clause::Always(truth) => json!({ "$expr": truth }),
        Clause::Null { field, negate } => null_check(field, *negate),
        Clause::Compare {
            field,
            op,
            value,
            guard,
        } => {
            let core = member(field.raw_column, member(operator(*op), value.to_json()));
            guarded(field, *guard, core)
        }
        Clause::In {
            field,
            values,
            negate,
            guard,
        } => {
            let op = if *negate { "$nin" } else { "$in" };
            let list: Vec<Json> = values.iter().map(|v| v.to_json()).collect();
            let core = member(field.raw_column, member(op, Json::Array(list)));
            guarded(field, *guard, core)
        }
        Clause::Like {
            field,
            pattern,
            kind,
            negate,
            guard,
        } => {
            let escaped = regex::escape(pattern);
            let regex = match kind {
                TextMatchKind::Contains => escaped,
                TextMatchKind::StartsWith => format!("^{escaped}"),
                TextMatchKind::EndsWith => format!("{escaped}$"),
            };
            let mut condition = member("$regex", Json::String(regex));
            if *negate {
                condition = member("$not", condition);
            }
            guarded(field, *guard, member(field.raw_column, condition))
        }
    }
}

fn member(key: &str, value: Json) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_string(), value);
    Json::Object(map)
}

fn operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "$eq",
        CompareOp::NotEq => "$ne",
        CompareOp::Gt => "$gt",
        CompareOp::Gte => "$gte",
        CompareOp::Lt => "$lt",
        CompareOp::Lte => "$lte",
    }
}

fn null_check(field: &FieldDescriptor, negate: bool) -> Json {
    if negate {
        member(field.raw_column, json!({ "$ne": null }))
    } else {
        member(field.raw_column, Json::Null)
    }
}

fn guarded(field: &FieldDescriptor, guard: Guard, core: Json) -> Json {
    match guard {
        Guard::None => core,
        Guard::OrNull => json!({ "$or": [null_check(field, false), core] }),
        Guard::AndNotNull => json!({ "$and": [null_check(field, true), core] }),
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile_document;
    use crate::dialect::DocumentStore;
    use crate::entity::{EntityDescriptor, FieldDef};
    use crate::metadata::TableDescriptor;
    use crate::predicate::*;
    use crate::value::{Value, ValueType};
    use serde_json::json;

    fn users() -> TableDescriptor {
        let desc = EntityDescriptor::new(
            "User",
            "users",
            vec![
                FieldDef::new("id", "_id", true, ValueType::Text, false),
                FieldDef::new("name", "name", false, ValueType::Text, true),
                FieldDef::new("age", "age", false, ValueType::Int, false),
            ],
        );
        TableDescriptor::build(desc, &DocumentStore).unwrap()
    }

    #[test]
    fn null_or_adult() {
        let table = users();
        let filter = compile_document(&is_null("name").or(gte("age", 18)), &table).unwrap();
        assert_eq!(
            filter,
            json!({ "$or": [{ "name": null }, { "age": { "$gte": 18 } }] })
        );
    }

    #[test]
    fn null_guards_match_relational_semantics() {
        let table = users();
        assert_eq!(
            compile_document(&ne("name", "x"), &table).unwrap(),
            json!({ "$or": [{ "name": null }, { "name": { "$ne": "x" } }] })
        );
        assert_eq!(
            compile_document(&lt("age", 3), &table).unwrap(),
            json!({ "$and": [{ "age": { "$ne": null } }, { "age": { "$lt": 3 } }] })
        );
        assert_eq!(
            compile_document(&gt("age", Value::Null), &table).unwrap(),
            json!({ "$expr": false })
        );
    }

    #[test]
    fn membership_uses_mapped_column() {
        let table = users();
        let none: [&str; 0] = [];
        assert_eq!(
            compile_document(&in_list("id", none), &table).unwrap(),
            json!({ "$expr": false })
        );
        assert_eq!(
            compile_document(&in_list("id", [None, Some("a")]), &table).unwrap(),
            json!({ "$or": [{ "_id": null }, { "_id": { "$in": ["a"] } }] })
        );
        assert_eq!(
            compile_document(&not_in("id", none), &table).unwrap(),
            json!({ "$expr": true })
        );
    }

    #[test]
    fn text_match_is_an_escaped_regex() {
        let table = users();
        assert_eq!(
            compile_document(&starts_with("name", "a.b"), &table).unwrap(),
            json!({ "name": { "$regex": "^a\\.b" } })
        );
        assert_eq!(
            compile_document(&not_contains("name", "x"), &table).unwrap(),
            json!({ "$or": [{ "name": null }, { "name": { "$not": { "$regex": "x" } } }] })
        );
        assert_eq!(
            compile_document(&contains("name", ""), &table).unwrap(),
            json!({ "name": { "$ne": null } })
        );
    }
}
