//! # Field Tables
//!
//! Builder for tool-facing JSON objects. Each spec type lists its fields through
//! [`FieldMap`], naming every field with the name Terraform expects.
//!
//! Two insertion modes exist:
//! - [`FieldMap::field`] drops zero values (empty strings, `false`, `0`, empty
//!   lists and maps, `null`)
//! - [`FieldMap::always`] keeps the value whatever it is, for flags the provider
//!   needs to see explicitly
//!
//! Keys are held in a `BTreeMap` and copied into the JSON object in sorted order,
//! so the serialized output is sorted regardless of how `serde_json::Map` is
//! backed.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct FieldMap {
    fields: BTreeMap<&'static str, Value>,
}

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, omitting it when the value is a zero value
    #[must_use]
    pub fn field(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !is_zero(&value) {
            self.fields.insert(name, value);
        }
        self
    }

    /// Add a field that is emitted even when zero
    #[must_use]
    pub fn always(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    pub fn into_value(self) -> Value {
        let mut object = Map::new();
        for (name, value) in self.fields {
            object.insert(name.to_string(), value);
        }
        Value::Object(object)
    }
}

/// Build a sorted JSON object from string-keyed entries
pub fn sorted_object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Value
where
    K: Into<String>,
    V: Into<Value>,
{
    let sorted: BTreeMap<String, Value> = entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Value::Object(sorted.into_iter().collect())
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
