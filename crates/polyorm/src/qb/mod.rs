//! Entity builders.
//!
//! Every builder resolves its entity's [`TableDescriptor`](crate::TableDescriptor)
//! on construction, accumulates state through consuming `self -> Self`
//! methods, and compiles synchronously in a terminal method. Executing the
//! compiled statement is the only await point.
//!
//! ```ignore
//! use polyorm::prelude::*;
//!
//! let db = Db::new(executor);
//!
//! let page = db
//!     .as_queryable::<User>()
//!     .filter(in_list("id", ["a", "b"]))
//!     .take(10)
//!     .to_result()
//!     .await?;
//!
//! db.as_updatable::<User>()
//!     .set("age", 30)
//!     .filter(eq("id", "a"))
//!     .update()
//!     .await?;
//!
//! db.as_deletable::<User>()
//!     .filter(is_null("name"))
//!     .delete()
//!     .await?;
//! ```

mod delete;
pub(crate) mod insert;
mod scope;
mod select;
mod update;


pub use delete::DeleteBuilder;
pub use select::{Page, QueryBuilder};
pub use update::UpdateBuilder;
