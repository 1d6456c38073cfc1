//! Per-invocation memoization
//!
//! Every cache in the engine is a [Memo] owned by an object that lives for a
//! single calculation. Values are computed outside the lock, so two callers
//! racing on the same miss may both compute; the first insert wins and both
//! observe the same stored value.

use crate::error::{GitverError, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

pub struct Memo<K, V> {
    name: &'static str,
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(name: &'static str) -> Self {
        Memo {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned(&self) -> GitverError {
        GitverError::structural(format!("The {} cache was poisoned by a panic", self.name))
    }

    pub fn get(&self, key: &K) -> Result<Option<Arc<V>>> {
        let entries = self.entries.read().map_err(|_| self.poisoned())?;
        Ok(entries.get(key).cloned())
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    pub fn get_or_try_insert_with<F>(&self, key: &K, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(value) = self.get(key)? {
            return Ok(value);
        }

        tracing::debug!(cache = self.name, key = ?key, "Cache miss");
        let value = Arc::new(compute()?);

        let mut entries = self.entries.write().map_err(|_| self.poisoned())?;
        Ok(entries.entry(key.clone()).or_insert(value).clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
