//! Document-store dialect.
//!
//! Emits [`DocumentCommand`]s whose filters are native query documents rather
//! than statement text. Identifiers are document keys and need no quoting.

use super::{
    CountPlan, DeletePlan, Dialect, DialectKind, InsertPlan, SelectPlan, Statement, UpdatePlan,
};
use crate::compiler;
use crate::error::{OrmError, OrmResult};
use crate::metadata::TableDescriptor;
use crate::predicate::PredicateNode;
use serde::Serialize;
use serde_json::{Map, Value as Json};

/// A document-store command, serialised with an `"op"` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DocumentCommand {
    Find {
        collection: String,
        filter: Json,
        projection: Vec<String>,
        sort: Vec<DocumentSort>,
        #[serde(skip_serializing_if = "Option::is_none")]
        skip: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u64>,
    },
    Count {
        collection: String,
        filter: Json,
    },
    Update {
        collection: String,
        filter: Json,
        set: Map<String, Json>,
    },
    Delete {
        collection: String,
        filter: Json,
    },
    Insert {
        collection: String,
        document: Map<String, Json>,
    },
}

impl DocumentCommand {
    pub fn collection(&self) -> &str {
        match self {
            DocumentCommand::Find { collection, .. }
            | DocumentCommand::Count { collection, .. }
            | DocumentCommand::Update { collection, .. }
            | DocumentCommand::Delete { collection, .. }
            | DocumentCommand::Insert { collection, .. } => collection,
        }
    }
}

/// One sort key; `direction` is `1` ascending, `-1` descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSort {
    pub field: String,
    pub direction: i8,
}

/// Mongo-style document store.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentStore;

fn filter_document(filter: Option<&PredicateNode>, table: &TableDescriptor) -> OrmResult<Json> {
    match filter {
        Some(node) => compiler::compile_document(node, table),
        None => Ok(Json::Object(Map::new())),
    }
}

impl Dialect for DocumentStore {
    fn kind(&self) -> DialectKind {
        DialectKind::Document
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.to_string()
    }

    fn compile_select(&self, plan: &SelectPlan<'_>) -> OrmResult<Statement> {
        if plan.columns.is_empty() {
            return Err(OrmError::configuration(format!(
                "find on '{}' has an empty projection",
                plan.table.entity()
            )));
        }
        Ok(Statement::Document(DocumentCommand::Find {
            collection: plan.table.raw_table().to_string(),
            filter: filter_document(plan.filter, plan.table)?,
            projection: plan.columns.iter().map(|f| f.raw_column.to_string()).collect(),
            sort: plan
                .order
                .iter()
                .map(|k| DocumentSort {
                    field: k.field.raw_column.to_string(),
                    direction: if k.ascending { 1 } else { -1 },
                })
                .collect(),
            skip: plan.skip,
            limit: plan.take,
        }))
    }

    fn compile_count(&self, plan: &CountPlan<'_>) -> OrmResult<Statement> {
        Ok(Statement::Document(DocumentCommand::Count {
            collection: plan.table.raw_table().to_string(),
            filter: filter_document(plan.filter, plan.table)?,
        }))
    }

    fn compile_update(&self, plan: &UpdatePlan<'_>) -> OrmResult<Statement> {
        if plan.assignments.is_empty() {
            return Err(OrmError::unconditional(format!(
                "update on '{}' has no assignments",
                plan.table.entity()
            )));
        }
        let set = plan
            .assignments
            .iter()
            .map(|(field, value)| (field.raw_column.to_string(), value.to_json()))
            .collect();
        Ok(Statement::Document(DocumentCommand::Update {
            collection: plan.table.raw_table().to_string(),
            filter: compiler::compile_document(plan.filter, plan.table)?,
            set,
        }))
    }

    fn compile_delete(&self, plan: &DeletePlan<'_>) -> OrmResult<Statement> {
        Ok(Statement::Document(DocumentCommand::Delete {
            collection: plan.table.raw_table().to_string(),
            filter: compiler::compile_document(plan.filter, plan.table)?,
        }))
    }

    fn compile_insert(&self, plan: &InsertPlan<'_>) -> OrmResult<Statement> {
        let document = plan
            .values
            .iter()
            .map(|(field, value)| (field.raw_column.to_string(), value.to_json()))
            .collect();
        Ok(Statement::Document(DocumentCommand::Insert {
            collection: plan.table.raw_table().to_string(),
            document,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SortKey;
    use crate::entity::{EntityDescriptor, FieldDef};
    use crate::predicate::eq;
    use crate::value::ValueType;
    use serde_json::json;

    #[test]
    fn find_serialises_with_op_tag() {
        let table = TableDescriptor::build(
            EntityDescriptor::new(
                "Event",
                "events",
                vec![
                    FieldDef::new("id", "_id", true, ValueType::Uuid, false),
                    FieldDef::new("kind", "kind", false, ValueType::Text, false),
                ],
            ),
            &DocumentStore,
        )
        .unwrap();
        let filter = eq("kind", "click");
        let plan = SelectPlan {
            table: &table,
            filter: Some(&filter),
            columns: table.fields().iter().collect(),
            order: vec![SortKey {
                field: table.field("kind").unwrap(),
                ascending: false,
            }],
            skip: None,
            take: Some(10),
        };
        let statement = DocumentStore.compile_select(&plan).unwrap();
        assert_eq!(statement.as_document().unwrap().collection(), "events");
        assert_eq!(
            serde_json::to_value(&statement).unwrap(),
            json!({
                "op": "find",
                "collection": "events",
                "filter": { "kind": { "$eq": "click" } },
                "projection": ["_id", "kind"],
                "sort": [{ "field": "kind", "direction": -1 }],
                "limit": 10
            })
        );
        assert!(statement.params().is_empty());
    }
}
