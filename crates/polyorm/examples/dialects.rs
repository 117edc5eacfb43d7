//! Compile one predicate for every backend, without a database.
//!
//! Run with: cargo run --example dialects -p polyorm

use polyorm::metadata::descriptor;
use polyorm::prelude::*;
use polyorm::{DocumentStore, MySql, Postgres, SqlDialect, SqlServer, Sqlite, compile_document, compile_sql};

#[derive(Debug, Entity)]
#[orm(table = "users")]
#[allow(dead_code)]
struct User {
    #[orm(id)]
    id: String,
    name: Option<String>,
    age: i32,
}

fn show<D: SqlDialect + 'static>(label: &str, dialect: D, filter: &PredicateNode) -> OrmResult<()> {
    let table = descriptor::<User>(&dialect)?;
    let compiled = compile_sql(filter, &table, &dialect)?;
    println!("{label:<10} {}", compiled.text);
    for param in &compiled.params {
        println!("{:<10}   {} = {:?}", "", param.name, param.value);
    }
    Ok(())
}

fn main() -> OrmResult<()> {
    let filter = is_null("name")
        .or(gte("age", 18))
        .and(not_in("id", [Some("root"), None]))
        .and(not_contains("name", "50%"));

    println!("filter: {filter}\n");
    show("postgres", Postgres, &filter)?;
    show("mysql", MySql, &filter)?;
    show("sqlite", Sqlite, &filter)?;
    show("sqlserver", SqlServer, &filter)?;

    let table = descriptor::<User>(&DocumentStore)?;
    let document = compile_document(&filter, &table)?;
    println!("{:<10} {document}", "document");
    Ok(())
}
