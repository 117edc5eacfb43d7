//! Query, page, update and delete against PostgreSQL.
//!
//! Run with: cargo run --example postgres -p polyorm
//!
//! Expects DATABASE_URL and an existing table:
//! CREATE TABLE users (id TEXT PRIMARY KEY, name TEXT, age INT4 NOT NULL);

use polyorm::prelude::*;
use polyorm::{ExecutorConfig, PgExecutor};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Entity)]
#[orm(table = "users")]
struct User {
    #[orm(id)]
    id: String,
    name: Option<String>,
    age: i32,
}

#[tokio::main]
async fn main() -> OrmResult<()> {
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| OrmError::configuration("DATABASE_URL must be set"))?;

    let executor = PgExecutor::connect(&database_url)?.with_config(
        ExecutorConfig::new()
            .with_query_timeout(Duration::from_secs(5))
            .with_slow_query_threshold(Duration::from_millis(200)),
    );
    let db = Db::new(executor);

    for (id, name, age) in [("a", Some("ann"), 31), ("b", None, 17), ("c", Some("cy"), 45)] {
        db.save(&User {
            id: id.into(),
            name: name.map(Into::into),
            age,
        })
        .await?;
    }

    let adults_or_unnamed = db
        .as_queryable::<User>()
        .filter(is_null("name").or(gte("age", 18)))
        .order_by("age")
        .take(2)
        .to_result()
        .await?;
    println!("page 1: {:?}", adults_or_unnamed.items);

    let rest = db
        .as_queryable::<User>()
        .filter(is_null("name").or(gte("age", 18)))
        .order_by("age")
        .skip_cursor(&adults_or_unnamed.next_cursor)
        .take(2)
        .to_list()
        .await?;
    println!("page 2: {rest:?}");

    let renamed = db
        .as_updatable::<User>()
        .set("name", "bee")
        .filter(eq("id", "b"))
        .update()
        .await?;
    println!("renamed {renamed} row(s)");

    let count = db
        .as_queryable::<User>()
        .filter(not_contains("name", "e"))
        .count()
        .await?;
    println!("names without an 'e' (or no name): {count}");

    let removed = db
        .as_deletable::<User>()
        .filter(in_list("id", ["a", "b", "c"]))
        .delete()
        .await?;
    println!("removed {removed} row(s)");
    Ok(())
}
