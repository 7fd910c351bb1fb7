//! Durable agent memory.
//!
//! A JSON tree addressed by path segments. Everything the agent persists
//! across ticks lives here: creep working state, room enemy windows,
//! ratchet floors, the spawn-name sequence. Readers get neutral defaults
//! for absent keys; writers auto-create intermediate objects. The tree is
//! injected into every component rather than reached through a global, so
//! tests hand each unit exactly the memory it should see.

use serde_json::{json, Map, Value};

/// Path-addressed durable store.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    root: Value,
}

impl Memory {
    pub fn new() -> Self {
        Self { root: json!({}) }
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Raw value at `path`, if present.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let mut cur = &self.root;
        for seg in path {
            cur = cur.as_object()?.get(*seg)?;
        }
        Some(cur)
    }

    pub fn get_u64(&self, path: &[&str]) -> u64 {
        self.get(path).and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn get_u32(&self, path: &[&str]) -> u32 {
        self.get_u64(path) as u32
    }

    pub fn get_bool(&self, path: &[&str]) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_str(&self, path: &[&str]) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Deserialize the value at `path`, if present and well-formed.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, path: &[&str]) -> Option<T> {
        serde_json::from_value(self.get(path)?.clone()).ok()
    }

    /// Set `path` to `value`, creating intermediate objects as needed.
    /// Intermediate non-objects are overwritten.
    pub fn set(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            self.root = value;
            return;
        };
        let mut cur = &mut self.root;
        for seg in parents {
            if !cur.is_object() {
                *cur = json!({});
            }
            let obj = match cur.as_object_mut() {
                Some(obj) => obj,
                None => return,
            };
            cur = obj.entry(seg.to_string()).or_insert_with(|| json!({}));
        }
        if !cur.is_object() {
            *cur = json!({});
        }
        if let Some(obj) = cur.as_object_mut() {
            obj.insert(last.to_string(), value);
        }
    }

    pub fn set_u64(&mut self, path: &[&str], value: u64) {
        self.set(path, json!(value));
    }

    pub fn set_bool(&mut self, path: &[&str], value: bool) {
        self.set(path, json!(value));
    }

    pub fn set_str(&mut self, path: &[&str], value: &str) {
        self.set(path, json!(value));
    }

    /// Remove the value at `path`. Missing paths are a no-op.
    pub fn delete(&mut self, path: &[&str]) {
        let Some((last, parents)) = path.split_last() else {
            self.root = json!({});
            return;
        };
        let mut cur = &mut self.root;
        for seg in parents {
            match cur.as_object_mut().and_then(|o| o.get_mut(*seg)) {
                Some(next) => cur = next,
                None => return,
            }
        }
        if let Some(obj) = cur.as_object_mut() {
            obj.remove(*last);
        }
    }

    /// Keys of the object at `path` (empty when absent or not an object).
    pub fn keys(&self, path: &[&str]) -> Vec<String> {
        self.get(path)
            .and_then(Value::as_object)
            .map(Map::keys)
            .map(|keys| keys.cloned().collect())
            .unwrap_or_default()
    }
}
