//! Named parameter storage for compiled statements.

use crate::value::Value;
use serde::Serialize;
use tokio_postgres::types::ToSql;

/// Default prefix for filter parameters (`Parameter1`, `Parameter2`, ...).
pub const FILTER_PREFIX: &str = "Parameter";

/// Prefix for UPDATE assignment parameters, disjoint from [`FILTER_PREFIX`].
pub const ASSIGNMENT_PREFIX: &str = "U_Parameter";

/// One bound parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    pub value: Value,
}

/// An ordered name → value map.
///
/// Parameters keep the order in which they were registered, which is also the
/// order their placeholders appear in the statement text. Positional
/// backends (`$n`, `?`) rely on that.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamMap {
    params: Vec<Param>,
    /// Next suffix per prefix. Statements use one or two prefixes.
    #[serde(skip)]
    counters: Vec<(String, usize)>,
}

impl ParamMap {
    /// Create a new empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value under a fresh name built from `prefix`.
    ///
    /// Returns the generated name and the value's 1-based position.
    pub fn push(&mut self, prefix: &str, value: Value) -> (String, usize) {
        let seq = match self.counters.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, n)) => {
                *n += 1;
                *n
            }
            None => {
                self.counters.push((prefix.to_string(), 1));
                1
            }
        };
        let name = format!("{prefix}{seq}");
        self.params.push(Param {
            name: name.clone(),
            value,
        });
        (name, self.params.len())
    }

    /// Merge the parameters of several statements for diagnostics, naming
    /// each `{statement}.{name}` with 1-based statement numbers.
    pub(crate) fn snapshot<'a>(maps: impl IntoIterator<Item = &'a ParamMap>) -> Self {
        let params = maps
            .into_iter()
            .enumerate()
            .flat_map(|(i, map)| {
                map.params.iter().map(move |p| Param {
                    name: format!("{}.{}", i + 1, p.name),
                    value: p.value.clone(),
                })
            })
            .collect();
        Self {
            params,
            counters: Vec::new(),
        }
    }

    /// Look up a value by parameter name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// Values in registration order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.params.iter().map(|p| &p.value)
    }

    /// Get all values as references for tokio-postgres.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| &p.value as &(dyn ToSql + Sync))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ParamMap {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_sequential_per_prefix() {
        let mut params = ParamMap::new();
        assert_eq!(params.push(FILTER_PREFIX, Value::Int(1)), ("Parameter1".into(), 1));
        assert_eq!(
            params.push(ASSIGNMENT_PREFIX, Value::Int(2)),
            ("U_Parameter1".into(), 2)
        );
        assert_eq!(params.push(FILTER_PREFIX, Value::Int(3)), ("Parameter2".into(), 3));
        assert_eq!(params.get("U_Parameter1"), Some(&Value::Int(2)));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn long_lists_number_sequentially() {
        let mut params = ParamMap::new();
        for i in 0..5000 {
            params.push(FILTER_PREFIX, Value::Int(i));
        }
        let (name, position) = params.push("P", Value::Null);
        assert_eq!((name.as_str(), position), ("P1", 5001));
        let (name, position) = params.push(FILTER_PREFIX, Value::Null);
        assert_eq!((name.as_str(), position), ("Parameter5001", 5002));
        assert_eq!(params.get("Parameter5000"), Some(&Value::Int(4999)));
    }

    #[test]
    fn snapshot_keeps_every_statement() {
        let mut delete = ParamMap::new();
        delete.push(FILTER_PREFIX, Value::from("a"));
        let mut insert = ParamMap::new();
        insert.push(FILTER_PREFIX, Value::from("a"));
        insert.push(FILTER_PREFIX, Value::Int(3));

        let merged = ParamMap::snapshot([&delete, &insert]);
        let names: Vec<&str> = merged.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["1.Parameter1", "2.Parameter1", "2.Parameter2"]);
        assert_eq!(merged.get("2.Parameter2"), Some(&Value::Int(3)));
    }
}
