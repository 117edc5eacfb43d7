//! Entity mapping trait and the descriptor it supplies.

use crate::error::OrmResult;
use crate::metadata::MetadataSlot;
use crate::record::Record;
use crate::value::ValueType;

/// One mapped property as declared by the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Rust-side property name used in predicates, sort keys and projections.
    pub property: &'static str,
    /// Unquoted storage column name.
    pub column: &'static str,
    pub primary_key: bool,
    pub value_type: ValueType,
    pub nullable: bool,
}

impl FieldDef {
    pub const fn new(
        property: &'static str,
        column: &'static str,
        primary_key: bool,
        value_type: ValueType,
        nullable: bool,
    ) -> Self {
        Self {
            property,
            column,
            primary_key,
            value_type,
            nullable,
        }
    }
}

/// Unquoted table mapping for an entity type, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity type name, used in diagnostics.
    pub name: &'static str,
    pub table: &'static str,
    pub fields: Vec<FieldDef>,
}

impl EntityDescriptor {
    pub fn new(name: &'static str, table: &'static str, fields: Vec<FieldDef>) -> Self {
        Self {
            name,
            table,
            fields,
        }
    }
}

/// A record type stored in a table or collection.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(polyorm::Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: String,
///     name: Option<String>,
///     age: i32,
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// Supply the table mapping. Called once per dialect, then cached.
    fn describe() -> EntityDescriptor;

    /// Materialise an entity from a fetched record (keys are unquoted columns).
    fn from_record(record: Record) -> OrmResult<Self>;

    /// Flatten the entity into a record keyed by unquoted column names.
    fn to_record(&self) -> Record;

    /// Per-type cache slot for built table descriptors.
    ///
    /// Implementations return a `static`:
    ///
    /// ```ignore
    /// fn metadata_slot() -> &'static MetadataSlot {
    ///     static SLOT: MetadataSlot = MetadataSlot::new();
    ///     &SLOT
    /// }
    /// ```
    fn metadata_slot() -> &'static MetadataSlot;
}
