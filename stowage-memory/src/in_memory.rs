// Copyright 2026 stowage Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt::Debug, sync::Arc, time::SystemTime};

use hashbrown::HashMap;
use parking_lot::RwLock;
use stowage_common::{
    code::Weighter,
    entry::Entry,
    error::{Error, Result},
    expiry::Expiry,
    store::{MemoryBacked, Store},
};

use crate::config::InMemoryConfig;

struct Inner<T> {
    entries: HashMap<String, Entry<T>>,
    usage: usize,
}

impl<T> Inner<T> {
    fn remove(&mut self, key: &str) -> Option<Entry<T>> {
        let entry = self.entries.remove(key)?;
        self.usage -= entry.estimated_size();
        Some(entry)
    }

    fn retain(&mut self, mut keep: impl FnMut(&Entry<T>) -> bool) -> usize {
        let before = self.entries.len();
        let mut freed = 0;
        self.entries.retain(|_, entry| {
            let keep = keep(entry);
            if !keep {
                freed += entry.estimated_size();
            }
            keep
        });
        self.usage -= freed;
        before - self.entries.len()
    }
}

/// A plain map of entries held in memory.
///
/// Count and cost limits are reported but never enforced. Use [`AutoPurgingStore`](crate::AutoPurgingStore) for a
/// bounded tier.
pub struct InMemoryStore<T> {
    inner: RwLock<Inner<T>>,
    config: InMemoryConfig,
    weighter: Arc<dyn Weighter<T>>,
}

impl<T> Debug for InMemoryStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("InMemoryStore")
            .field("config", &self.config)
            .field("entries", &inner.entries.len())
            .field("usage", &inner.usage)
            .finish()
    }
}

impl<T: 'static> InMemoryStore<T> {
    /// Create an empty store. Objects are weighed by `size_of::<T>()` unless a weighter is set.
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                usage: 0,
            }),
            config,
            weighter: Arc::new(|_: &T| std::mem::size_of::<T>()),
        }
    }

    /// Set the weighter used to estimate the byte size of objects.
    pub fn with_weighter(mut self, weighter: impl Weighter<T>) -> Self {
        self.weighter = Arc::new(weighter);
        self
    }

    /// The config of the store.
    pub fn config(&self) -> &InMemoryConfig {
        &self.config
    }

    /// Advisory entry count limit.
    pub fn count_limit(&self) -> usize {
        self.config.count_limit
    }

    /// Advisory total cost limit in bytes.
    pub fn total_cost_limit(&self) -> usize {
        self.config.total_cost_limit
    }

    /// Count of stored entries, including expired ones.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Returns `true` if the store holds no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Store<T> for InMemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn entry(&self, key: &str) -> Result<Entry<T>> {
        self.inner.read().entries.get(key).cloned().ok_or_else(|| Error::not_found(key))
    }

    fn set_object(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()> {
        let size = (self.weighter)(&object);
        let entry = Entry::new(object, expiry.unwrap_or(self.config.expiry), size);

        let mut inner = self.inner.write();
        inner.remove(key);
        inner.usage += size;
        inner.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove_object(&self, key: &str) -> Result<()> {
        self.inner.write().remove(key);
        Ok(())
    }

    fn remove_all(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.usage = 0;
        Ok(())
    }

    fn remove_expired_objects(&self) -> Result<()> {
        let now = SystemTime::now();
        let removed = self.inner.write().retain(|entry| !entry.is_expired_at(now));
        tracing::trace!("[in-memory store]: removed {removed} expired entries");
        Ok(())
    }

    fn remove_stored_objects_since(&self, date: SystemTime) -> Result<()> {
        self.inner.write().retain(|entry| entry.expiry().date() < date);
        Ok(())
    }

    fn remove_object_if_expired(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.entries.get(key).is_some_and(|entry| entry.is_expired()) {
            inner.remove(key);
        }
        Ok(())
    }
}

impl<T> MemoryBacked for InMemoryStore<T> {
    fn memory_capacity(&self) -> usize {
        self.config.total_cost_limit
    }

    fn current_memory_usage(&self) -> usize {
        self.inner.read().usage
    }
}
