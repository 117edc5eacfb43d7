//! # polyorm
//!
//! A multi-backend data access layer.
//!
//! ## Features
//!
//! - **Predicates as data**: filters are [`PredicateNode`] trees built with
//!   small functions (`eq`, `gte`, `in_list`, `contains`, ...)
//! - **Null-aware compilation**: `!=`, `<`, `NOT IN` and `NOT LIKE` treat null
//!   columns the same way on every backend
//! - **Parameterized output**: constants are always bound, never spliced into text
//! - **Several backends**: PostgreSQL, MySQL, SQLite and SQL Server share one
//!   SQL translator; a document-store dialect emits Mongo-style filter documents
//! - **Safe defaults**: update, delete and full list reads require a filter
//! - **Cached metadata**: entity mappings are validated and quoted once per
//!   `(type, dialect)` pair
//!
//! ## Usage
//!
//! ```ignore
//! use polyorm::prelude::*;
//!
//! #[derive(Entity)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     id: String,
//!     name: Option<String>,
//!     age: i32,
//! }
//!
//! let db = Db::new(PgExecutor::connect("postgres://localhost/app")?);
//!
//! let adults = db
//!     .as_queryable::<User>()
//!     .filter(is_null("name").or(gte("age", 18)))
//!     .order_by("age")
//!     .take(10)
//!     .to_list()
//!     .await?;
//! ```

extern crate self as polyorm;

pub mod compiler;
pub mod cursor;
pub mod db;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod param;
pub mod predicate;
pub mod prelude;
pub mod qb;
pub mod record;
pub mod value;

pub use compiler::{CompiledClause, compile_document, compile_sql};
pub use db::Db;
pub use dialect::{
    Dialect, DialectKind, DocumentCommand, DocumentStore, MySql, Postgres, SqlDialect, SqlServer,
    SqlStatement, Sqlite, Statement,
};
pub use entity::{Entity, EntityDescriptor, FieldDef};
pub use error::{OrmError, OrmResult};
pub use executor::{ExecContext, ExecMode, ExecutorConfig, PgExecutor, StatementExecutor, StatementKind};
pub use metadata::{FieldDescriptor, MetadataSlot, TableDescriptor};
pub use param::{Param, ParamMap};
pub use predicate::PredicateNode;
pub use qb::{DeleteBuilder, Page, QueryBuilder, UpdateBuilder};
pub use record::Record;
pub use value::{FieldType, FromValue, Value, ValueType};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_tls};

#[cfg(feature = "derive")]
pub use polyorm_derive::Entity;
