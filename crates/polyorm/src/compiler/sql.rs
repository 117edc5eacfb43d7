//! Relational rendering of lowered predicates.

use super::{Clause, Guard, Lowered};
use crate::dialect::SqlDialect;
use crate::metadata::FieldDescriptor;
use crate::param::ParamMap;
use crate::predicate::{CompareOp, LogicalOp, TextMatchKind};
use crate::value::Value;

/// Render a lowered predicate. Parameters are registered in text order.
pub(crate) fn render<D: SqlDialect>(
    lowered: &Lowered<'_>,
    dialect: &D,
    params: &mut ParamMap,
    prefix: &str,
) -> String {
    match lowered {
        Lowered::Logical { op, left, right } => {
            let left = render(left, dialect, params, prefix);
            let right = render(right, dialect, params, prefix);
            let op = match op {
                LogicalOp::And => "AND",
                LogicalOp::Or => "OR",
            };
            format!("({left}) {op} ({right})")
        }
        Lowered::Clause(clause) => render_clause(clause, dialect, params, prefix),
    }
}

fn render_clause<D: SqlDialect>(
    clause: &Clause<'_>,
    dialect: &D,
    params: &mut ParamMap,
    prefix: &str,
) -> String {
    let mut bind = |value: Value| {
        let (name, position) = params.push(prefix, value);
        dialect.placeholder(&name, position)
    };

    match clause {
        Clause::Always(true) => dialect.always_true().to_string(),
        Clause::Always(false) => dialect.always_false().to_string(),
        Clause::Null { field, negate } => null_check(field, *negate),
        Clause::Compare {
            field,
            op,
            value,
            guard,
        } => {
            let core = format!("{} {} {}", field.column, operator(*op), bind((*value).clone()));
            guarded(field, *guard, core)
        }
        Clause::In {
            field,
            values,
            negate,
            guard,
        } => {
            let list: Vec<String> = values.iter().map(|v| bind((*v).clone())).collect();
            let not = if *negate { "NOT " } else { "" };
            let core = format!("{} {not}IN ({})", field.column, list.join(", "));
            guarded(field, *guard, core)
        }
        Clause::Like {
            field,
            pattern,
            kind,
            negate,
            guard,
        } => {
            let escaped = dialect.escape_like(pattern);
            let pattern = match kind {
                TextMatchKind::Contains => format!("%{escaped}%"),
                TextMatchKind::StartsWith => format!("{escaped}%"),
                TextMatchKind::EndsWith => format!("%{escaped}"),
            };
            let not = if *negate { "NOT " } else { "" };
            let core = format!(
                "{} {not}LIKE {}{}",
                field.column,
                bind(Value::Text(pattern)),
                dialect.like_escape_clause()
            );
            guarded(field, *guard, core)
        }
    }
}

fn operator(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::NotEq => "<>",
        CompareOp::Gt => ">",
        CompareOp::Gte => ">=",
        CompareOp::Lt => "<",
        CompareOp::Lte => "<=",
    }
}

fn null_check(field: &FieldDescriptor, negate: bool) -> String {
    if negate {
        format!("{} IS NOT NULL", field.column)
    } else {
        format!("{} IS NULL", field.column)
    }
}

fn guarded(field: &FieldDescriptor, guard: Guard, core: String) -> String {
    match guard {
        Guard::None => core,
        Guard::OrNull => format!("{} OR {core}", null_check(field, false)),
        Guard::AndNotNull => format!("{} AND {core}", null_check(field, true)),
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile_sql;
    use crate::dialect::{MySql, Postgres, SqlServer, Sqlite};
    use crate::entity::{EntityDescriptor, FieldDef};
    use crate::error::OrmError;
    use crate::metadata::TableDescriptor;
    use crate::predicate::*;
    use crate::value::{Value, ValueType};

    fn users(dialect: &dyn crate::dialect::Dialect) -> TableDescriptor {
        let desc = EntityDescriptor::new(
            "User",
            "users",
            vec![
                FieldDef::new("Id", "Id", true, ValueType::Text, false),
                FieldDef::new("Name", "Name", false, ValueType::Text, true),
                FieldDef::new("Age", "Age", false, ValueType::Int, false),
            ],
        );
        TableDescriptor::build(desc, dialect).unwrap()
    }

    #[test]
    fn null_or_adult() {
        let table = users(&Sqlite);
        let out = compile_sql(&is_null("Name").or(gte("Age", 18)), &table, &Sqlite).unwrap();
        assert_eq!(out.text, "(\"Name\" IS NULL) OR (\"Age\" >= :Parameter1)");
        assert_eq!(out.params.len(), 1);
        assert_eq!(out.params.get("Parameter1"), Some(&Value::Int(18)));
    }

    #[test]
    fn comparison_null_table() {
        let table = users(&Postgres);
        let cases = [
            (eq("Name", Value::Null), "\"Name\" IS NULL"),
            (ne("Name", Value::Null), "\"Name\" IS NOT NULL"),
            (gt("Age", Value::Null), "1=0"),
            (gte("Age", Value::Null), "1=0"),
            (lt("Age", Value::Null), "1=0"),
            (lte("Age", Value::Null), "1=0"),
            (eq("Name", "x"), "\"Name\" = $1"),
            (ne("Name", "x"), "\"Name\" IS NULL OR \"Name\" <> $1"),
            (gt("Age", 1), "\"Age\" > $1"),
            (lt("Age", 1), "\"Age\" IS NOT NULL AND \"Age\" < $1"),
            (lte("Age", 1), "\"Age\" IS NOT NULL AND \"Age\" <= $1"),
        ];
        for (node, expected) in cases {
            assert_eq!(compile_sql(&node, &table, &Postgres).unwrap().text, expected, "{node}");
        }
    }

    #[test]
    fn constant_on_left_is_flipped() {
        let table = users(&Postgres);
        let node = compare(CompareOp::Lt, constant(5), field("Age"));
        let out = compile_sql(&node, &table, &Postgres).unwrap();
        assert_eq!(out.text, "\"Age\" > $1");
    }

    #[test]
    fn field_to_field_is_unsupported() {
        let table = users(&Postgres);
        let node = compare(CompareOp::Eq, field("Name"), field("Id"));
        let err = compile_sql(&node, &table, &Postgres).unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedPredicate(ref m) if m.contains("Name == Id")));

        let node = compare(CompareOp::Eq, constant(1), constant(1));
        assert!(matches!(
            compile_sql(&node, &table, &Postgres),
            Err(OrmError::UnsupportedPredicate(_))
        ));
    }

    #[test]
    fn membership_table() {
        let table = users(&Sqlite);
        let compile = |node| compile_sql(&node, &table, &Sqlite).unwrap().text;
        let none: [&str; 0] = [];
        assert_eq!(compile(in_list("Id", none)), "1=0");
        assert_eq!(compile(not_in("Id", none)), "1=1");
        assert_eq!(compile(in_list("Id", [None::<&str>])), "\"Id\" IS NULL");
        assert_eq!(compile(not_in("Id", [None::<&str>])), "\"Id\" IS NOT NULL");
        assert_eq!(
            compile(in_list("Id", ["a", "b"])),
            "\"Id\" IN (:Parameter1, :Parameter2)"
        );
        assert_eq!(
            compile(not_in("Id", ["a"])),
            "\"Id\" IS NULL OR \"Id\" NOT IN (:Parameter1)"
        );
        assert_eq!(
            compile(in_list("Id", [None, Some("a"), Some("b")])),
            "\"Id\" IS NULL OR \"Id\" IN (:Parameter1, :Parameter2)"
        );
        assert_eq!(
            compile(not_in("Id", [Some("a"), None])),
            "\"Id\" IS NOT NULL AND \"Id\" NOT IN (:Parameter1)"
        );
    }

    #[test]
    fn membership_values_bind_in_order() {
        let table = users(&Postgres);
        let out = compile_sql(&in_list("Id", ["a", "b"]), &table, &Postgres).unwrap();
        assert_eq!(out.text, "\"Id\" IN ($1, $2)");
        let values: Vec<_> = out.params.values().cloned().collect();
        assert_eq!(values, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn text_match_table() {
        let table = users(&Postgres);
        let compile = |node| compile_sql(&node, &table, &Postgres).unwrap();
        assert_eq!(compile(contains("Name", None::<&str>)).text, "1=0");
        assert_eq!(compile(not_contains("Name", None::<&str>)).text, "1=0");
        assert_eq!(compile(contains("Name", "")).text, "\"Name\" IS NOT NULL");
        assert_eq!(compile(not_starts_with("Name", "")).text, "\"Name\" IS NULL");

        let out = compile(contains("Name", "50%_off"));
        assert_eq!(out.text, "\"Name\" LIKE $1 ESCAPE '\\'");
        assert_eq!(out.params.get("Parameter1"), Some(&Value::from("%50\\%\\_off%")));

        let out = compile(not_ends_with("Name", "x"));
        assert_eq!(out.text, "\"Name\" IS NULL OR \"Name\" NOT LIKE $1 ESCAPE '\\'");
        assert_eq!(out.params.get("Parameter1"), Some(&Value::from("%x")));
    }

    #[test]
    fn text_match_escaping_follows_dialect() {
        let table = users(&SqlServer);
        let out = compile_sql(&starts_with("Name", "a_b"), &table, &SqlServer).unwrap();
        assert_eq!(out.text, "[Name] LIKE @Parameter1");
        assert_eq!(out.params.get("Parameter1"), Some(&Value::from("a[_]b%")));

        let table = users(&MySql);
        let out = compile_sql(&starts_with("Name", "a_b"), &table, &MySql).unwrap();
        assert_eq!(out.text, "`Name` LIKE ?");
    }

    #[test]
    fn text_match_rejects_non_text() {
        let table = users(&Postgres);
        let err = compile_sql(&contains("Age", "1"), &table, &Postgres).unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedPredicate(_)));
        let err = compile_sql(&contains("Name", 5), &table, &Postgres).unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedPredicate(_)));
    }

    #[test]
    fn parameters_number_across_the_whole_tree() {
        let table = users(&SqlServer);
        let node = eq("Name", "a").and(gt("Age", 1).or(in_list("Id", ["x", "y"])));
        let out = compile_sql(&node, &table, &SqlServer).unwrap();
        assert_eq!(
            out.text,
            "([Name] = @Parameter1) AND (([Age] > @Parameter2) OR ([Id] IN (@Parameter3, @Parameter4)))"
        );
        assert_eq!(out.params.len(), 4);
    }

    #[test]
    fn compilation_is_deterministic() {
        let table = users(&Postgres);
        let node = ne("Name", "a").or(not_in("Id", [Some("x"), None]));
        let a = compile_sql(&node, &table, &Postgres).unwrap();
        let b = compile_sql(&node, &table, &Postgres).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_field_fails() {
        let table = users(&Postgres);
        let err = compile_sql(&eq("Email", "x"), &table, &Postgres).unwrap_err();
        assert!(err.is_field_not_found());
    }
}
