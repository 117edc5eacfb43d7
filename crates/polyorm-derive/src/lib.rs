//! Derive macros for polyorm
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive the `Entity` mapping for a struct.
///
/// # Example
///
/// ```ignore
/// use polyorm::Entity;
///
/// #[derive(Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: String,
///     #[orm(column = "display_name")]
///     name: Option<String>,
///     age: i32,
///     #[orm(skip)]
///     cached_label: String,
/// }
/// ```
///
/// # Generated
///
/// - `describe()` - table name plus one field entry per mapped field
/// - `from_record()` / `to_record()` - conversion keyed by column name
/// - `metadata_slot()` - a per-type `static` cache slot
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the snake_case struct name)
/// - `#[orm(id)]` - Mark field as primary key (defaults to a field named `id`)
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Leave the field unmapped; it is filled with `Default::default()`
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
