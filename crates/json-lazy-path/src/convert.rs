//! Conversion between nodes and `serde_json::Value`.

use std::collections::HashSet;

use serde_json::{Map, Number, Value};

use crate::arena::Arena;
use crate::error::{EvalError, ValueError};
use crate::types::*;

impl Arena {
    /// Copy a serde value into the arena. Numbers that fit `i64` become
    /// integers; the rest become reals.
    pub fn import_json(&mut self, value: &Value) -> Result<NodeId, ValueError> {
        match value {
            Value::Null => Ok(self.null()),
            Value::Bool(b) => Ok(self.boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(self.integer(i)),
                None => {
                    let real: Real = n.to_string().parse()?;
                    Ok(self.real(real))
                }
            },
            Value::String(s) => Ok(self.string(s.as_str())),
            Value::Array(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    ids.push(self.import_json(item)?);
                }
                Ok(self.array(ids))
            }
            Value::Object(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, item) in map {
                    entries.push((key.clone(), self.import_json(item)?));
                }
                self.object(entries)
            }
        }
    }

    /// Convert a fully resolved, acyclic node into a serde value.
    pub fn export_json(&self, id: NodeId) -> Result<Value, EvalError> {
        let mut on_path = HashSet::new();
        self.export_node(id, &mut on_path)
    }

    fn export_node(&self, id: NodeId, on_path: &mut HashSet<NodeId>) -> Result<Value, EvalError> {
        let value = match self.get(id) {
            Node::Null => Value::Null,
            Node::Boolean(b) => Value::Bool(*b),
            Node::Integer(i) => Value::Number((*i).into()),
            Node::Real(r) => {
                let wide = r.text().parse::<f64>().unwrap_or(r.value() as f64);
                Number::from_f64(wide).map_or(Value::Null, Value::Number)
            }
            Node::String(s) => Value::String(s.clone()),
            Node::Array(a) => {
                if !on_path.insert(id) {
                    return Err(EvalError::CyclicStructure);
                }
                let mut items = Vec::with_capacity(a.len());
                for &item in a.items() {
                    items.push(self.export_node(item, on_path)?);
                }
                on_path.remove(&id);
                Value::Array(items)
            }
            Node::Object(o) => {
                if !on_path.insert(id) {
                    return Err(EvalError::CyclicStructure);
                }
                let mut map = Map::new();
                for (key, item) in o.entries() {
                    map.insert(key.to_string(), self.export_node(item, on_path)?);
                }
                on_path.remove(&id);
                Value::Object(map)
            }
            Node::Reference(_) | Node::Set(_) | Node::Function(_) => {
                return Err(EvalError::Unresolved)
            }
        };
        Ok(value)
    }
}
