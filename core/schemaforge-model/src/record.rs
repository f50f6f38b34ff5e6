use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::shape::ID_FIELD;

/// A persisted instance of a compiled entity.
///
/// `values` holds one entry per declared field of the storage shape; the
/// identifier is kept apart because it is assigned by the engine, never
/// supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub values: Map<String, Value>,
}

impl Record {
    pub fn new(id: Uuid, values: Map<String, Value>) -> Self {
        Self { id, values }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// The flat JSON object form: `{"id": ..., <field>: <value>, ...}`.
    pub fn to_json(&self) -> Value {
        let mut object = self.values.clone();
        object.insert(ID_FIELD.into(), Value::String(self.id.hyphenated().to_string()));
        Value::Object(object)
    }
}
