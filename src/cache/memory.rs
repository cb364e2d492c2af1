use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use super::{CacheStore, Category, Result};

/// In-process cache. Nothing touches the disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<(Category, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, category: Category, key: &str) -> bool {
        self.entries
            .borrow()
            .contains_key(&(category, key.to_string()))
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, category: Category, key: &str) -> Result<Option<Value>> {
        Ok(self
            .entries
            .borrow()
            .get(&(category, key.to_string()))
            .cloned())
    }

    fn put(&self, category: Category, key: &str, value: &Value) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert((category, key.to_string()), value.clone());
        Ok(())
    }
}
