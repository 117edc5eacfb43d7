//! Backend-neutral rows.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};

/// An ordered set of `(column, value)` pairs.
///
/// Executors return records keyed by the unquoted column name; entities are
/// materialised from them through [`Entity::from_record`](crate::Entity::from_record).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Set a column, replacing an existing value of the same name.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Remove and return a column's value.
    pub fn take(&mut self, column: &str) -> Option<Value> {
        let pos = self.columns.iter().position(|(c, _)| c == column)?;
        Some(self.columns.remove(pos).1)
    }

    /// Decode a column; a missing column is an error.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .cloned()
            .ok_or_else(|| OrmError::decode(column, "column not present in record"))?;
        T::from_value(value).map_err(|msg| OrmError::decode(column, msg))
    }

    /// Decode and remove a column; a missing column yields `T::default()`.
    ///
    /// Projections that leave out a column materialise the field with its default.
    pub fn take_or_default<T: FromValue + Default>(&mut self, column: &str) -> OrmResult<T> {
        match self.take(column) {
            Some(value) => T::from_value(value).map_err(|msg| OrmError::decode(column, msg)),
            None => Ok(T::default()),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (c, v) in iter {
            record.push(c, v);
        }
        record
    }
}
