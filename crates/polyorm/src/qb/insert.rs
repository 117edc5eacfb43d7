//! Whole-entity writes: INSERT, and save (replace by primary key).

use crate::dialect::{DeletePlan, Dialect, InsertPlan, Statement};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::metadata::TableDescriptor;
use crate::predicate;
use crate::value::Value;

/// Every mapped field's value, in declaration order. Columns missing from
/// the record are written as null.
fn field_values<E: Entity>(table: &TableDescriptor, entity: &E) -> Vec<Value> {
    let mut record = entity.to_record();
    table
        .fields()
        .iter()
        .map(|f| record.take(f.raw_column).unwrap_or(Value::Null))
        .collect()
}

pub(crate) fn insert_statement<E: Entity>(
    table: &TableDescriptor,
    dialect: &dyn Dialect,
    entity: &E,
) -> OrmResult<Statement> {
    let values = field_values(table, entity);
    let plan = InsertPlan {
        table,
        values: table.fields().iter().zip(values.iter()).collect(),
    };
    dialect.compile_insert(&plan)
}

/// Delete-by-primary-key followed by insert. Run both in one transaction.
pub(crate) fn save_statements<E: Entity>(
    table: &TableDescriptor,
    dialect: &dyn Dialect,
    entity: &E,
) -> OrmResult<[Statement; 2]> {
    let values = field_values(table, entity);
    let key = table.primary_key();
    let key_value = table
        .fields()
        .iter()
        .zip(values.iter())
        .find(|(f, _)| f.is_primary_key)
        .map(|(_, v)| v.clone())
        .unwrap_or(Value::Null);
    if key_value.is_null() {
        return Err(OrmError::unconditional(format!(
            "save on '{}' requires a value for primary key '{}'",
            table.entity(),
            key.property
        )));
    }

    let by_key = predicate::eq(key.property, key_value);
    let delete = dialect.compile_delete(&DeletePlan {
        table,
        filter: &by_key,
    })?;
    let insert = dialect.compile_insert(&InsertPlan {
        table,
        values: table.fields().iter().zip(values.iter()).collect(),
    })?;
    Ok([delete, insert])
}
