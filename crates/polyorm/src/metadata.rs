//! Cached, dialect-specific table metadata.
//!
//! A [`TableDescriptor`] is built from an entity's [`EntityDescriptor`] the
//! first time the `(entity, dialect)` pair is used and lives for the rest of
//! the process. Reads after the first build are a single atomic load.

use crate::dialect::{Dialect, DialectKind};
use crate::entity::{Entity, EntityDescriptor};
use crate::error::{OrmError, OrmResult};
use crate::predicate::PredicateNode;
use crate::value::ValueType;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// A mapped property with its dialect-quoted column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub property: &'static str,
    /// Quoted column name, ready to splice into statement text.
    pub column: String,
    /// Unquoted column name, as it appears in records.
    pub raw_column: &'static str,
    pub value_type: ValueType,
    pub nullable: bool,
    pub is_primary_key: bool,
}

/// Immutable table mapping for one entity under one dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    entity: &'static str,
    dialect: DialectKind,
    table: String,
    raw_table: &'static str,
    fields: Vec<FieldDescriptor>,
    primary_key: usize,
}

impl TableDescriptor {
    /// Validate and quote an entity mapping for `dialect`.
    ///
    /// Fails with [`OrmError::Configuration`] unless exactly one field is the
    /// primary key and property names are unique.
    pub fn build(descriptor: EntityDescriptor, dialect: &dyn Dialect) -> OrmResult<Self> {
        let EntityDescriptor {
            name,
            table,
            fields,
        } = descriptor;

        if fields.is_empty() {
            return Err(OrmError::configuration(format!(
                "entity '{name}' declares no fields"
            )));
        }

        let keys: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.primary_key)
            .map(|(i, _)| i)
            .collect();
        let primary_key = match keys.as_slice() {
            [single] => *single,
            [] => {
                return Err(OrmError::configuration(format!(
                    "entity '{name}' declares no primary key"
                )));
            }
            many => {
                let names: Vec<&str> = many.iter().map(|&i| fields[i].property).collect();
                return Err(OrmError::configuration(format!(
                    "entity '{name}' declares {} primary keys ({}); exactly one is supported",
                    many.len(),
                    names.join(", ")
                )));
            }
        };

        for (i, f) in fields.iter().enumerate() {
            if fields[..i].iter().any(|prev| prev.property == f.property) {
                return Err(OrmError::configuration(format!(
                    "entity '{name}' maps property '{}' twice",
                    f.property
                )));
            }
        }

        let fields = fields
            .into_iter()
            .map(|f| FieldDescriptor {
                property: f.property,
                column: dialect.quote_identifier(f.column),
                raw_column: f.column,
                value_type: f.value_type,
                nullable: f.nullable,
                is_primary_key: f.primary_key,
            })
            .collect();

        Ok(Self {
            entity: name,
            dialect: dialect.kind(),
            table: dialect.quote_identifier(table),
            raw_table: table,
            fields,
            primary_key,
        })
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn dialect(&self) -> DialectKind {
        self.dialect
    }

    /// Quoted table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Unquoted table (or collection) name.
    pub fn raw_table(&self) -> &'static str {
        self.raw_table
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.fields[self.primary_key]
    }

    /// Resolve a property name.
    pub fn field(&self, property: &str) -> OrmResult<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.property == property)
            .ok_or_else(|| OrmError::field_not_found(self.entity, property))
    }

    /// Quoted column for a property name.
    pub fn column(&self, property: &str) -> OrmResult<&str> {
        self.field(property).map(|f| f.column.as_str())
    }

    /// Resolve a field by its unquoted column name.
    pub fn field_by_column(&self, raw_column: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.raw_column == raw_column)
    }

    /// Check that every property referenced by `predicate` is mapped.
    pub fn validate(&self, predicate: &PredicateNode) -> OrmResult<()> {
        for name in predicate.fields() {
            self.field(name)?;
        }
        Ok(())
    }
}

/// Per-entity cache slot, one cell per [`DialectKind`].
///
/// Cells are written at most once. Builders racing on a cold cell serialise
/// on `init`; the loser of the race re-checks and reuses the winner's value.
#[derive(Debug)]
pub struct MetadataSlot {
    cells: [OnceLock<Arc<TableDescriptor>>; DialectKind::COUNT],
    init: Mutex<()>,
}

impl MetadataSlot {
    pub const fn new() -> Self {
        Self {
            cells: [const { OnceLock::new() }; DialectKind::COUNT],
            init: Mutex::new(()),
        }
    }

    fn cell(&self, kind: DialectKind) -> &OnceLock<Arc<TableDescriptor>> {
        &self.cells[kind.index()]
    }
}

impl Default for MetadataSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Get (building on first use) the descriptor for `E` under `dialect`.
///
/// Build failures are not cached; they are deterministic and resurface on
/// every call.
pub fn descriptor<E: Entity>(dialect: &dyn Dialect) -> OrmResult<Arc<TableDescriptor>> {
    let slot = E::metadata_slot();
    let cell = slot.cell(dialect.kind());
    if let Some(found) = cell.get() {
        return Ok(Arc::clone(found));
    }

    let _guard = slot.init.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(found) = cell.get() {
        return Ok(Arc::clone(found));
    }

    let built = Arc::new(TableDescriptor::build(E::describe(), dialect)?);
    tracing::trace!(
        target: "polyorm.metadata",
        entity = built.entity(),
        dialect = ?built.dialect(),
        table = built.table(),
        fields = built.fields().len(),
        "built table descriptor"
    );
    Ok(Arc::clone(cell.get_or_init(|| built)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DocumentStore, Postgres, SqlServer};
    use crate::entity::FieldDef;
    use crate::record::Record;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Account;

    impl Entity for Account {
        fn describe() -> EntityDescriptor {
            EntityDescriptor::new(
                "Account",
                "accounts",
                vec![
                    FieldDef::new("id", "id", true, ValueType::Int, false),
                    FieldDef::new("order", "order", false, ValueType::Text, true),
                ],
            )
        }

        fn from_record(_record: Record) -> OrmResult<Self> {
            Ok(Account)
        }

        fn to_record(&self) -> Record {
            Record::new()
        }

        fn metadata_slot() -> &'static MetadataSlot {
            static SLOT: MetadataSlot = MetadataSlot::new();
            &SLOT
        }
    }

    static LEDGER_DESCRIBES: AtomicUsize = AtomicUsize::new(0);

    struct Ledger;

    impl Entity for Ledger {
        fn describe() -> EntityDescriptor {
            LEDGER_DESCRIBES.fetch_add(1, Ordering::SeqCst);
            EntityDescriptor::new(
                "Ledger",
                "ledgers",
                vec![FieldDef::new("id", "id", true, ValueType::Uuid, false)],
            )
        }

        fn from_record(_record: Record) -> OrmResult<Self> {
            Ok(Ledger)
        }

        fn to_record(&self) -> Record {
            Record::new()
        }

        fn metadata_slot() -> &'static MetadataSlot {
            static SLOT: MetadataSlot = MetadataSlot::new();
            &SLOT
        }
    }

    #[test]
    fn reserved_words_are_quoted_per_dialect() {
        let pg = TableDescriptor::build(Account::describe(), &Postgres).unwrap();
        assert_eq!(pg.column("order").unwrap(), "\"order\"");
        let mssql = TableDescriptor::build(Account::describe(), &SqlServer).unwrap();
        assert_eq!(mssql.column("order").unwrap(), "[order]");
        assert_eq!(mssql.table(), "[accounts]");
        let doc = TableDescriptor::build(Account::describe(), &DocumentStore).unwrap();
        assert_eq!(doc.column("order").unwrap(), "order");
    }

    #[test]
    fn unknown_property_names_entity() {
        let pg = TableDescriptor::build(Account::describe(), &Postgres).unwrap();
        let err = pg.field("balance").unwrap_err();
        assert_eq!(err.to_string(), "Field 'balance' not found on entity 'Account'");
    }

    #[test]
    fn primary_key_must_be_unique() {
        let none = EntityDescriptor::new(
            "NoKey",
            "t",
            vec![FieldDef::new("a", "a", false, ValueType::Int, false)],
        );
        assert!(matches!(
            TableDescriptor::build(none, &Postgres),
            Err(OrmError::Configuration(_))
        ));

        let two = EntityDescriptor::new(
            "TwoKeys",
            "t",
            vec![
                FieldDef::new("a", "a", true, ValueType::Int, false),
                FieldDef::new("b", "b", true, ValueType::Int, false),
            ],
        );
        let err = TableDescriptor::build(two, &Postgres).unwrap_err();
        assert!(err.to_string().contains("2 primary keys (a, b)"));
    }

    #[test]
    fn concurrent_first_access_builds_once() {
        let handles: Vec<_> = (0..16)
            .map(|_| std::thread::spawn(|| descriptor::<Ledger>(&Postgres).unwrap()))
            .collect();
        let built: Vec<Arc<TableDescriptor>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for d in &built[1..] {
            assert!(Arc::ptr_eq(&built[0], d));
        }
        assert_eq!(LEDGER_DESCRIBES.load(Ordering::SeqCst), 1);

        // Another dialect gets its own cell.
        let doc = descriptor::<Ledger>(&DocumentStore).unwrap();
        assert_eq!(doc.table(), "ledgers");
        assert_eq!(LEDGER_DESCRIBES.load(Ordering::SeqCst), 2);
    }
}
