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

use std::{collections::BTreeMap, fmt::Debug, sync::Arc, time::SystemTime};

use hashbrown::HashMap;
use parking_lot::Mutex;
use stowage_common::{
    code::Weighter,
    entry::Entry,
    error::{Error, Result},
    expiry::Expiry,
    store::{MemoryBacked, Store},
};

use crate::config::AutoPurgingConfig;

struct Slot<T> {
    entry: Entry<T>,
    tick: u64,
}

/// Entries plus their recency order.
///
/// Every read or write of a key moves it to a fresh tick, so the smallest tick in `order` is always the
/// least-recently-used key. Ticks never repeat, which keeps insertion order among untouched keys.
struct Lru<T> {
    slots: HashMap<String, Slot<T>>,
    order: BTreeMap<u64, String>,
    tick: u64,
    usage: usize,
}

impl<T> Lru<T> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str) -> Option<&Entry<T>> {
        let tick = self.next_tick();
        let slot = self.slots.get_mut(key)?;
        let key = self.order.remove(&slot.tick)?;
        slot.tick = tick;
        self.order.insert(tick, key);
        Some(&slot.entry)
    }

    fn insert(&mut self, key: &str, entry: Entry<T>) {
        self.remove(key);
        let tick = self.next_tick();
        self.usage += entry.estimated_size();
        self.order.insert(tick, key.to_string());
        self.slots.insert(key.to_string(), Slot { entry, tick });
    }

    fn remove(&mut self, key: &str) -> Option<Entry<T>> {
        let slot = self.slots.remove(key)?;
        self.order.remove(&slot.tick);
        self.usage -= slot.entry.estimated_size();
        Some(slot.entry)
    }

    fn retain(&mut self, mut keep: impl FnMut(&Entry<T>) -> bool) -> usize {
        let order = &mut self.order;
        let mut freed = 0;
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            let keep = keep(&slot.entry);
            if !keep {
                order.remove(&slot.tick);
                freed += slot.entry.estimated_size();
            }
            keep
        });
        self.usage -= freed;
        before - self.slots.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.order.clear();
        self.usage = 0;
    }

    /// Evict least-recently-used entries until the usage is no more than `target`.
    ///
    /// The most recent entry is never evicted.
    fn purge(&mut self, target: usize) -> Vec<String> {
        let mut evicted = vec![];
        while self.usage > target && self.order.len() > 1 {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            if let Some(slot) = self.slots.remove(&key) {
                self.usage -= slot.entry.estimated_size();
            }
            evicted.push(key);
        }
        evicted
    }
}

/// A memory tier that evicts least-recently-used entries once its usage crosses the configured capacity.
///
/// A purge runs after every write that leaves the usage above `memory_capacity` and reduces it to
/// `preferred_memory_usage_after_purge`.
pub struct AutoPurgingStore<T> {
    lru: Mutex<Lru<T>>,
    config: AutoPurgingConfig,
    weighter: Arc<dyn Weighter<T>>,
}

impl<T> Debug for AutoPurgingStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lru = self.lru.lock();
        f.debug_struct("AutoPurgingStore")
            .field("config", &self.config)
            .field("entries", &lru.slots.len())
            .field("usage", &lru.usage)
            .finish()
    }
}

impl<T: 'static> AutoPurgingStore<T> {
    /// Create an empty store.
    ///
    /// Returns a config error if `preferred_memory_usage_after_purge` is not below a non-zero `memory_capacity`.
    pub fn new(config: AutoPurgingConfig) -> Result<Self> {
        if config.memory_capacity > 0 && config.preferred_memory_usage_after_purge >= config.memory_capacity {
            return Err(Error::config("preferred memory usage after purge must be less than memory capacity")
                .with_context("memory_capacity", config.memory_capacity)
                .with_context("preferred_memory_usage_after_purge", config.preferred_memory_usage_after_purge));
        }

        Ok(Self {
            lru: Mutex::new(Lru {
                slots: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
                usage: 0,
            }),
            config,
            weighter: Arc::new(|_: &T| std::mem::size_of::<T>()),
        })
    }

    /// Set the weighter used to estimate the byte size of objects.
    pub fn with_weighter(mut self, weighter: impl Weighter<T>) -> Self {
        self.weighter = Arc::new(weighter);
        self
    }

    /// The config of the store.
    pub fn config(&self) -> &AutoPurgingConfig {
        &self.config
    }

    /// Count of stored entries, including expired ones.
    pub fn len(&self) -> usize {
        self.lru.lock().slots.len()
    }

    /// Returns `true` if the store holds no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry of the tier. Called by the host when the process is under memory pressure.
    pub fn handle_memory_pressure(&self) {
        let mut lru = self.lru.lock();
        tracing::info!(
            "[auto-purging store]: memory pressure, drop {} entries, {} bytes",
            lru.slots.len(),
            lru.usage
        );
        lru.clear();
    }

    fn purge_target(&self) -> usize {
        match self.config.memory_capacity {
            0 => 0,
            _ => self.config.preferred_memory_usage_after_purge,
        }
    }
}

impl<T> Store<T> for AutoPurgingStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn entry(&self, key: &str) -> Result<Entry<T>> {
        self.lru.lock().touch(key).cloned().ok_or_else(|| Error::not_found(key))
    }

    fn set_object(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()> {
        let size = (self.weighter)(&object);
        let entry = Entry::new(object, expiry.unwrap_or(self.config.expiry), size);

        let mut lru = self.lru.lock();
        lru.insert(key, entry);
        if lru.usage > self.config.memory_capacity {
            let evicted = lru.purge(self.purge_target());
            tracing::trace!(
                "[auto-purging store]: purged {} entries, usage: {}, evicted: {evicted:?}",
                evicted.len(),
                lru.usage
            );
        }
        Ok(())
    }

    fn remove_object(&self, key: &str) -> Result<()> {
        self.lru.lock().remove(key);
        Ok(())
    }

    // Recency is not updated by existence checks.
    fn exists_object(&self, key: &str) -> bool {
        self.lru.lock().slots.contains_key(key)
    }

    fn is_expired_object(&self, key: &str) -> bool {
        match self.lru.lock().slots.get(key) {
            Some(slot) => slot.entry.is_expired(),
            None => true,
        }
    }

    fn remove_all(&self) -> Result<()> {
        self.lru.lock().clear();
        Ok(())
    }

    fn remove_expired_objects(&self) -> Result<()> {
        let now = SystemTime::now();
        let removed = self.lru.lock().retain(|entry| !entry.is_expired_at(now));
        tracing::trace!("[auto-purging store]: removed {removed} expired entries");
        Ok(())
    }

    fn remove_stored_objects_since(&self, date: SystemTime) -> Result<()> {
        self.lru.lock().retain(|entry| entry.expiry().date() < date);
        Ok(())
    }

    fn remove_object_if_expired(&self, key: &str) -> Result<()> {
        let mut lru = self.lru.lock();
        if lru.slots.get(key).is_some_and(|slot| slot.entry.is_expired()) {
            lru.remove(key);
        }
        Ok(())
    }
}

impl<T> MemoryBacked for AutoPurgingStore<T> {
    fn memory_capacity(&self) -> usize {
        self.config.memory_capacity
    }

    fn current_memory_usage(&self) -> usize {
        self.lru.lock().usage
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use itertools::Itertools;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use stowage_common::error::ErrorKind;

    use super::*;

    fn store(capacity: usize, preferred: usize) -> AutoPurgingStore<Vec<u8>> {
        AutoPurgingStore::new(
            AutoPurgingConfig::default()
                .with_memory_capacity(capacity)
                .with_preferred_memory_usage_after_purge(preferred),
        )
        .unwrap()
        .with_weighter(|v: &Vec<u8>| v.len())
    }

    fn keys(store: &AutoPurgingStore<Vec<u8>>) -> Vec<String> {
        store.lru.lock().order.values().cloned().collect_vec()
    }

    #[test_log::test]
    fn test_reject_preferred_not_below_capacity() {
        let config = AutoPurgingConfig::default()
            .with_memory_capacity(100)
            .with_preferred_memory_usage_after_purge(100);
        let e = AutoPurgingStore::<Vec<u8>>::new(config).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Config);

        let config = AutoPurgingConfig::default()
            .with_memory_capacity(0)
            .with_preferred_memory_usage_after_purge(100);
        assert!(AutoPurgingStore::<Vec<u8>>::new(config).is_ok());
    }

    #[test_log::test]
    fn test_zero_capacity_keeps_only_latest() {
        let store = store(0, 0);
        store.set_object(vec![0; 8], "a", None).unwrap();
        store.set_object(vec![0; 8], "b", None).unwrap();
        assert_eq!(keys(&store), vec!["b"]);
    }

    /// Survivors after A, B, C are written, A and B are read in order, and D triggers a purge.
    fn survivors(preferred: usize) -> Vec<String> {
        let store = store(35, preferred);
        for key in ["A", "B", "C"] {
            store.set_object(vec![0; 10], key, None).unwrap();
        }
        assert_eq!(store.object("A").unwrap().len(), 10);
        assert_eq!(store.object("B").unwrap().len(), 10);

        store.set_object(vec![0; 10], "D", None).unwrap();
        keys(&store).into_iter().sorted().collect_vec()
    }

    #[test_log::test]
    fn test_lru_eviction_order() {
        // C goes first, then A, then B.
        assert_eq!(survivors(30), vec!["A", "B", "D"]);
        assert_eq!(survivors(20), vec!["B", "D"]);
        assert_eq!(survivors(10), vec!["D"]);
    }

    #[test_log::test]
    fn test_insertion_order_breaks_ties() {
        let store = store(25, 10);
        store.set_object(vec![0; 10], "A", None).unwrap();
        store.set_object(vec![0; 10], "B", None).unwrap();
        store.set_object(vec![0; 10], "C", None).unwrap();
        assert_eq!(keys(&store), vec!["C"]);
    }

    #[test_log::test]
    fn test_existence_checks_do_not_refresh_recency() {
        let store = store(25, 20);
        store.set_object(vec![0; 10], "A", None).unwrap();
        store.set_object(vec![0; 10], "B", None).unwrap();
        assert!(store.exists_object("A"));
        assert!(!store.is_expired_object("A"));
        store.set_object(vec![0; 10], "C", None).unwrap();
        assert_eq!(keys(&store), vec!["B", "C"]);
    }

    #[test_log::test]
    fn test_capacity_invariant_under_random_writes() {
        const CAPACITY: usize = 1000;
        const PREFERRED: usize = 600;

        let mut rng = SmallRng::seed_from_u64(114514);
        let store = store(CAPACITY, PREFERRED);
        let mut largest = 0;

        for _ in 0..5000 {
            let key = format!("k{}", rng.random_range(0..200));
            let size = rng.random_range(1..=300);
            largest = largest.max(size);

            let replaced = store
                .lru
                .lock()
                .slots
                .get(&key)
                .map(|slot| slot.entry.estimated_size())
                .unwrap_or_default();
            let expected = store.current_memory_usage() - replaced + size;
            store.set_object(vec![0; size], &key, None).unwrap();
            let usage = store.current_memory_usage();

            assert!(usage <= CAPACITY.max(largest));
            if expected > CAPACITY {
                assert!(usage <= PREFERRED || store.len() == 1, "usage: {usage}, len: {}", store.len());
            }
            if rng.random_bool(0.3) {
                let _ = store.object(&key);
            }
        }
    }

    #[test_log::test]
    fn test_absent_key_counts_as_expired() {
        let store = store(100, 50);
        assert!(store.is_expired_object("absent"));
        store.remove_object_if_expired("absent").unwrap();

        let past = Expiry::instant(SystemTime::now() - Duration::from_secs(1));
        store.set_object(vec![1], "stale", Some(past)).unwrap();
        store.set_object(vec![2], "fresh", None).unwrap();
        assert!(store.is_expired_object("stale"));
        assert!(!store.is_expired_object("fresh"));

        store.remove_object_if_expired("stale").unwrap();
        store.remove_object_if_expired("fresh").unwrap();
        assert_eq!(keys(&store), vec!["fresh"]);
        assert_eq!(store.current_memory_usage(), 1);
    }

    #[test_log::test]
    fn test_sweeps_keep_order_consistent() {
        let store = store(100, 50);
        let past = Expiry::instant(SystemTime::now() - Duration::from_secs(1));
        store.set_object(vec![0; 4], "a", Some(past)).unwrap();
        store.set_object(vec![0; 4], "b", None).unwrap();
        store.set_object(vec![0; 4], "c", Some(past)).unwrap();

        store.remove_expired_objects().unwrap();
        assert_eq!(keys(&store), vec!["b"]);
        assert_eq!(store.current_memory_usage(), 4);

        store.remove_stored_objects_since(SystemTime::now()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.current_memory_usage(), 0);
    }

    #[test_log::test]
    fn test_handle_memory_pressure() {
        let store = store(100, 50);
        store.set_object(vec![0; 10], "a", None).unwrap();
        store.handle_memory_pressure();
        assert!(store.is_empty());
        assert_eq!(store.entry("a").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
