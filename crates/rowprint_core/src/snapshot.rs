//! Record snapshots and keys.

use std::fmt;

use rowprint_codec::Value;
use serde::{Deserialize, Serialize};

/// The persisted state of one row at a point in time.
///
/// A snapshot is an ordered list of `(column name, value)` pairs. Order is
/// significant: fingerprints are computed over the pairs in sequence, so
/// snapshots of one record type must always list columns in the type's
/// canonical order. [`RecordSchema::snapshot`](crate::RecordSchema::snapshot)
/// builds snapshots that satisfy this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    entries: Vec<(String, Value)>,
}

impl RecordSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot from pairs, keeping their order.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Appends a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Looks up a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Returns a copy with one column's value replaced.
    ///
    /// Returns `None` if the column is not present.
    #[must_use]
    pub fn with_value(&self, name: &str, value: impl Into<Value>) -> Option<Self> {
        let position = self.entries.iter().position(|(column, _)| column == name)?;
        let mut next = self.clone();
        next.entries[position].1 = value.into();
        Some(next)
    }

    /// Iterates over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot has no columns.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity of a record: the values of its key columns, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey(Vec<Value>);

impl RecordKey {
    /// Creates a key from its component values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Returns the key components.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl From<Value> for RecordKey {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl From<i64> for RecordKey {
    fn from(n: i64) -> Self {
        Self::from(Value::Integer(n))
    }
}

impl From<i32> for RecordKey {
    fn from(n: i32) -> Self {
        Self::from(Value::from(n))
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        Self::from(Value::from(s))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order() {
        let snapshot = RecordSnapshot::from_pairs([("B", 2), ("A", 1)]);
        let names: Vec<&str> = snapshot.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(snapshot.get("A"), Some(&Value::Integer(1)));
        assert_eq!(snapshot.get("C"), None);
    }

    #[test]
    fn with_value_replaces_in_place() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.push("Id", 1);
        snapshot.push("Name", "Widgets");

        let renamed = snapshot.with_value("Name", "Gadgets").unwrap();
        assert_eq!(renamed.get("Name"), Some(&Value::from("Gadgets")));
        assert_eq!(snapshot.get("Name"), Some(&Value::from("Widgets")));
        assert_eq!(renamed.len(), 2);
        assert!(snapshot.with_value("Missing", 0).is_none());
    }

    #[test]
    fn key_display() {
        assert_eq!(RecordKey::from(7).to_string(), "7");
        let composite = RecordKey::new(vec![Value::from("Canada"), Value::from("Ottawa")]);
        assert_eq!(composite.to_string(), "Canada/Ottawa");
    }
}
