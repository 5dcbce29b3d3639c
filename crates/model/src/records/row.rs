use crate::core::value::{FieldValue, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An ordered set of named values read from one table row, document or file line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowData {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values.iter().find(|f| f.name == field)
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Overwrites `field` in place, or appends it at the end.
    pub fn set(&mut self, field: &str, value: Value) {
        match self.field_values.iter_mut().find(|f| f.name == field) {
            Some(existing) => existing.value = value,
            None => self.field_values.push(FieldValue::new(field, value)),
        }
    }

    pub fn retain(&mut self, columns: &HashSet<&str>) {
        self.field_values
            .retain(|f| columns.contains(f.name.as_str()));
    }

    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.field_values
            .iter()
            .map(|f| (f.name.clone(), f.value.to_json()))
            .collect()
    }

    pub fn from_json(entity: &str, map: serde_json::Map<String, serde_json::Value>) -> Self {
        let field_values = map
            .into_iter()
            .map(|(name, json)| FieldValue::new(name, Value::from_json(json)))
            .collect();
        RowData::new(entity, field_values)
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> RowData {
        RowData::new(
            "people",
            vec![
                FieldValue::new("name", Value::from("Alice")),
                FieldValue::new("age", Value::from("30")),
            ],
        )
    }

    #[test]
    fn json_keeps_field_order() {
        let rendered = serde_json::to_string(&row().to_json()).unwrap();
        assert_eq!(rendered, r#"{"name":"Alice","age":"30"}"#);
    }

    #[test]
    fn set_overwrites_then_appends() {
        let mut row = row();
        row.set("age", Value::Int(31));
        row.set("region", Value::from("us-east"));
        assert_eq!(
            serde_json::Value::Object(row.to_json()),
            json!({"name": "Alice", "age": 31, "region": "us-east"})
        );
    }

    #[test]
    fn missing_field_is_null() {
        assert_eq!(row().get_value("email"), Value::Null);
    }
}
