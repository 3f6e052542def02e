use std::collections::HashMap;

use fastnbt::Value;
use serde::{Deserialize, Serialize};

/// A structured NBT record. Block entities cross the provider boundary as
/// bare compounds; entities wrap one.
pub type Compound = HashMap<String, Value>;

/// A saved entity: an NBT compound with at least an `id`.
///
/// The provider does not know entity types. It stores whatever the engine
/// hands it and returns it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Compound);

impl Entity {
    pub fn new(id: &str) -> Self {
        let mut data = Compound::new();
        data.insert("id".to_string(), Value::String(id.to_string()));
        Self(data)
    }

    pub fn id(&self) -> Option<&str> {
        match self.0.get("id") {
            Some(Value::String(id)) => Some(id),
            _ => None,
        }
    }

    /// Position from the `Pos` list (three doubles), if present and well formed.
    pub fn position(&self) -> Option<[f64; 3]> {
        let Some(Value::List(pos)) = self.0.get("Pos") else {
            return None;
        };
        match pos.as_slice() {
            [Value::Double(x), Value::Double(y), Value::Double(z)] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    pub fn with_position(mut self, [x, y, z]: [f64; 3]) -> Self {
        self.0.insert(
            "Pos".to_string(),
            Value::List(vec![Value::Double(x), Value::Double(y), Value::Double(z)]),
        );
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.0.insert(key.to_string(), value)
    }

    pub fn as_compound(&self) -> &Compound {
        &self.0
    }

    pub fn into_compound(self) -> Compound {
        self.0
    }
}

impl From<Compound> for Entity {
    fn from(data: Compound) -> Self {
        Self(data)
    }
}
