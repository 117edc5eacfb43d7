//! Convenient imports for typical `polyorm` usage.
//!
//! ```ignore
//! use polyorm::prelude::*;
//! ```

pub use crate::predicate::{
    and, contains, ends_with, eq, gt, gte, in_list, is_not_null, is_null, lt, lte, ne,
    not_contains, not_ends_with, not_in, not_starts_with, or, starts_with,
};
pub use crate::{
    Db, Entity, OrmError, OrmResult, Page, PgExecutor, PredicateNode, StatementExecutor, Value,
};

#[cfg(feature = "pool")]
pub use crate::create_pool;
