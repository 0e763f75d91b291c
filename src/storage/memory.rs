use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyValueStore;

/// In-memory store for tests.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().expect("store lock").get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) {
        self.values.lock().expect("store lock").insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.lock().expect("store lock").remove(key);
    }
}
