//! Relational backend dialects.

use super::DialectKind;
use super::sql::SqlDialect;

/// PostgreSQL: `"ident"`, `$n` placeholders, `LIMIT n OFFSET m`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl SqlDialect for Postgres {
    const KIND: DialectKind = DialectKind::Postgres;

    fn identifier_quotes(&self) -> (char, char) {
        ('"', '"')
    }

    fn placeholder(&self, _name: &str, position: usize) -> String {
        format!("${position}")
    }

    fn limit_offset(&self, skip: Option<u64>, take: Option<u64>) -> Option<String> {
        match (skip, take) {
            (None, None) => None,
            (None, Some(take)) => Some(format!("LIMIT {take}")),
            (Some(skip), None) => Some(format!("OFFSET {skip}")),
            (Some(skip), Some(take)) => Some(format!("LIMIT {take} OFFSET {skip}")),
        }
    }
}

/// MySQL / MariaDB: backtick quoting, positional `?` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl SqlDialect for MySql {
    const KIND: DialectKind = DialectKind::MySql;

    fn identifier_quotes(&self) -> (char, char) {
        ('`', '`')
    }

    fn placeholder(&self, _name: &str, _position: usize) -> String {
        "?".to_string()
    }

    fn limit_offset(&self, skip: Option<u64>, take: Option<u64>) -> Option<String> {
        match (skip, take) {
            (None, None) => None,
            (None, Some(take)) => Some(format!("LIMIT {take}")),
            // OFFSET is only valid after LIMIT.
            (Some(skip), None) => Some(format!("LIMIT {} OFFSET {skip}", u64::MAX)),
            (Some(skip), Some(take)) => Some(format!("LIMIT {take} OFFSET {skip}")),
        }
    }

    // Backslash is already the default LIKE escape, and `'\'` is an
    // unterminated literal under the default sql_mode.
    fn like_escape_clause(&self) -> &'static str {
        ""
    }
}

/// SQLite: `"ident"`, named `:Parameter1` placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl SqlDialect for Sqlite {
    const KIND: DialectKind = DialectKind::Sqlite;

    fn identifier_quotes(&self) -> (char, char) {
        ('"', '"')
    }

    fn placeholder(&self, name: &str, _position: usize) -> String {
        format!(":{name}")
    }

    fn limit_offset(&self, skip: Option<u64>, take: Option<u64>) -> Option<String> {
        match (skip, take) {
            (None, None) => None,
            (None, Some(take)) => Some(format!("LIMIT {take}")),
            (Some(skip), None) => Some(format!("LIMIT -1 OFFSET {skip}")),
            (Some(skip), Some(take)) => Some(format!("LIMIT {take} OFFSET {skip}")),
        }
    }
}

/// SQL Server: `[ident]`, `@Parameter1` placeholders, OFFSET/FETCH paging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl SqlDialect for SqlServer {
    const KIND: DialectKind = DialectKind::SqlServer;

    fn identifier_quotes(&self) -> (char, char) {
        ('[', ']')
    }

    fn placeholder(&self, name: &str, _position: usize) -> String {
        format!("@{name}")
    }

    fn limit_offset(&self, skip: Option<u64>, take: Option<u64>) -> Option<String> {
        if skip.is_none() && take.is_none() {
            return None;
        }
        let mut out = format!("OFFSET {} ROWS", skip.unwrap_or(0));
        if let Some(take) = take {
            out.push_str(&format!(" FETCH NEXT {take} ROWS ONLY"));
        }
        Some(out)
    }

    fn paging_requires_order(&self) -> bool {
        true
    }

    // FETCH NEXT requires a positive count.
    fn rejects_zero_fetch(&self) -> bool {
        true
    }

    // Wildcards are escaped with character classes; no ESCAPE clause needed.
    fn escape_like(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '[' => out.push_str("[[]"),
                '%' => out.push_str("[%]"),
                '_' => out.push_str("[_]"),
                other => out.push(other),
            }
        }
        out
    }

    fn like_escape_clause(&self) -> &'static str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn identifiers_are_quoted_and_escaped() {
        assert_eq!(Postgres.quote_identifier("order"), "\"order\"");
        assert_eq!(Postgres.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(MySql.quote_identifier("group"), "`group`");
        assert_eq!(SqlServer.quote_identifier("x]y"), "[x]]y]");
    }

    #[test]
    fn paging_without_take_stays_valid() {
        assert_eq!(MySql.limit_offset(Some(5), None).unwrap(), "LIMIT 18446744073709551615 OFFSET 5");
        assert_eq!(Sqlite.limit_offset(Some(5), None).unwrap(), "LIMIT -1 OFFSET 5");
        assert_eq!(SqlServer.limit_offset(None, Some(3)).unwrap(), "OFFSET 0 ROWS FETCH NEXT 3 ROWS ONLY");
        assert_eq!(Postgres.limit_offset(None, None), None);
    }

    #[test]
    fn like_escaping_per_dialect() {
        assert_eq!(Postgres.escape_like(r"50%_a\b"), r"50\%\_a\\b");
        assert_eq!(SqlServer.escape_like("50%_[x]"), "50[%][_][[]x]");
    }
}
