//! Key-value settings collaborator.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use common::StoreError;

/// Byte-valued settings owned by the embedding application.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

/// In-memory [`SettingsStore`].
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value);
        Ok(())
    }
}
