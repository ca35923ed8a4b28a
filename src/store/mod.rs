//! String-keyed slots backing the ledger.
//!
//! Every backend offers synchronous get/set with no transactional guarantees
//! across keys; the ledger only ever uses one slot.

use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::Result;

mod file;
mod sqlite;

pub use file::JsonFileStore;
pub use sqlite::SqliteStore;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.write().insert(key.to_string(), value.to_string());
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        match self.slots.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        match self.slots.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use uuid::Uuid;

    /// Fresh path under the system temp dir; the caller removes it.
    pub fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("readtimer-test-{}", Uuid::new_v4()))
            .join(name)
    }
}
