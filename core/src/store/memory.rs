//! In-memory BadgeStore used by tests and ephemeral sessions.

use super::{BadgeStore, StoreKey};
use crate::error::{BadgeError, BadgeResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<(String, StoreKey), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> BadgeResult<MutexGuard<'_, HashMap<(String, StoreKey), String>>> {
        self.values.lock().map_err(|_| BadgeError::StoreUnavailable {
            reason: "memory store lock poisoned".into(),
        })
    }

    /// Number of stored values across all identities (for tests).
    pub fn value_count(&self) -> BadgeResult<usize> {
        Ok(self.values()?.len())
    }
}

impl BadgeStore for MemoryStore {
    fn get(&self, identity: &str, key: StoreKey) -> BadgeResult<Option<String>> {
        Ok(self.values()?.get(&(identity.to_string(), key)).cloned())
    }

    fn set(&self, identity: &str, key: StoreKey, value: &str) -> BadgeResult<()> {
        self.values()?
            .insert((identity.to_string(), key), value.to_string());
        Ok(())
    }

    fn reset_all(&self, identity: &str) -> BadgeResult<()> {
        let mut values = self.values()?;
        for key in StoreKey::ALL {
            values.remove(&(identity.to_string(), key));
        }
        Ok(())
    }
}
