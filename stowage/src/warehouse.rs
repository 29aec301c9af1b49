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

use stowage_common::{
    code::{encoded_weighter, Transformer, Weighter},
    entry::Entry,
    error::{Error, Result},
    expiry::Expiry,
    store::{DiskBacked, MemoryBacked, Store},
};
use stowage_memory::{AutoPurgingConfig, AutoPurgingStore};
use stowage_storage::{DiskConfig, DiskStore};

use crate::{accessor::Accessor, hybrid::HybridStore};

/// The tiers behind a [`Warehouse`].
pub type WarehouseStore<T> = HybridStore<AutoPurgingStore<T>, DiskStore<T>>;

/// An auto-purging memory tier over a disk tier, behind an [`Accessor`].
///
/// Capacity changes rebuild both tiers and swap them in atomically. Disk entries survive the swap when the new disk
/// config points at the same namespace, the memory tier starts empty.
pub struct Warehouse<T> {
    accessor: Accessor<WarehouseStore<T>>,
    transformer: Arc<dyn Transformer<T>>,
    weighter: Arc<dyn Weighter<T>>,
}

impl<T> Debug for Warehouse<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warehouse").field("accessor", &self.accessor).finish()
    }
}

impl<T> Warehouse<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Open a warehouse whose memory tier weighs objects by their encoded length.
    pub fn open(purging: AutoPurgingConfig, disk: DiskConfig, transformer: Arc<dyn Transformer<T>>) -> Result<Self> {
        let weighter = Arc::new(encoded_weighter(transformer.clone()));
        Self::open_with_weighter(purging, disk, transformer, weighter)
    }

    /// Open a warehouse with a custom memory weighter.
    pub fn open_with_weighter(
        purging: AutoPurgingConfig,
        disk: DiskConfig,
        transformer: Arc<dyn Transformer<T>>,
        weighter: Arc<dyn Weighter<T>>,
    ) -> Result<Self> {
        let store = Self::build(purging, disk, &transformer, &weighter)?;
        Ok(Self {
            accessor: Accessor::new(store),
            transformer,
            weighter,
        })
    }

    fn build(
        purging: AutoPurgingConfig,
        disk: DiskConfig,
        transformer: &Arc<dyn Transformer<T>>,
        weighter: &Arc<dyn Weighter<T>>,
    ) -> Result<WarehouseStore<T>> {
        let memory = Self::build_memory(purging, weighter)?;
        let disk = DiskStore::open(disk, transformer.clone())?;
        Ok(HybridStore::new(memory, disk))
    }

    fn build_memory(purging: AutoPurgingConfig, weighter: &Arc<dyn Weighter<T>>) -> Result<AutoPurgingStore<T>> {
        let weighter = weighter.clone();
        Ok(AutoPurgingStore::new(purging)?.with_weighter(move |object: &T| weighter(object)))
    }

    /// Rebuild both tiers with the new configs and swap them in.
    ///
    /// The disk tier is opened under the exclusive guard, so the namespace is never owned by two live stores while
    /// an operation runs. The current tiers stay in place if either new tier cannot be built.
    pub fn update_cache_capacity(&self, purging: AutoPurgingConfig, disk: DiskConfig) -> Result<()> {
        let memory_capacity = purging.memory_capacity;
        let disk_capacity = disk.max_size;
        let memory = Self::build_memory(purging, &self.weighter)?;
        let old = self.accessor.try_replace_storage(|_| {
            let disk = DiskStore::open(disk, self.transformer.clone())?;
            Ok::<_, Error>(HybridStore::new(memory, disk))
        })?;
        drop(old);
        tracing::info!(
            "[warehouse]: cache capacity updated, memory: {memory_capacity} bytes, disk: {disk_capacity} bytes"
        );
        Ok(())
    }

    /// Write the object to the memory tier only.
    pub fn set_object_in_memory(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()> {
        self.accessor.write(|s| s.memory().set_object(object, key, expiry))
    }

    /// Drop the memory tier. Disk entries are kept.
    pub fn handle_memory_pressure(&self) {
        self.accessor.write(|s| s.memory().handle_memory_pressure())
    }

    /// The config of the current memory tier.
    pub fn memory_config(&self) -> AutoPurgingConfig {
        self.accessor.read(|s| s.memory().config().clone())
    }

    /// The config of the current disk tier.
    pub fn disk_config(&self) -> DiskConfig {
        self.accessor.read(|s| s.disk().config().clone())
    }

    /// The accessor that guards the tiers.
    pub fn accessor(&self) -> &Accessor<WarehouseStore<T>> {
        &self.accessor
    }
}

impl<T> Store<T> for Warehouse<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn entry(&self, key: &str) -> Result<Entry<T>> {
        self.accessor.entry(key)
    }

    fn set_object(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()> {
        self.accessor.set_object(object, key, expiry)
    }

    fn remove_object(&self, key: &str) -> Result<()> {
        self.accessor.remove_object(key)
    }

    fn exists_object(&self, key: &str) -> bool {
        self.accessor.exists_object(key)
    }

    fn is_expired_object(&self, key: &str) -> bool {
        self.accessor.is_expired_object(key)
    }

    fn remove_all(&self) -> Result<()> {
        self.accessor.remove_all()
    }

    fn remove_expired_objects(&self) -> Result<()> {
        self.accessor.remove_expired_objects()
    }

    fn remove_stored_objects_since(&self, date: SystemTime) -> Result<()> {
        self.accessor.remove_stored_objects_since(date)
    }

    fn remove_object_if_expired(&self, key: &str) -> Result<()> {
        self.accessor.remove_object_if_expired(key)
    }
}

impl<T> MemoryBacked for Warehouse<T> {
    fn memory_capacity(&self) -> usize {
        self.accessor.memory_capacity()
    }

    fn current_memory_usage(&self) -> usize {
        self.accessor.current_memory_usage()
    }
}

impl<T> DiskBacked for Warehouse<T> {
    fn disk_capacity(&self) -> u64 {
        self.accessor.disk_capacity()
    }

    fn current_disk_usage(&self) -> u64 {
        self.accessor.current_disk_usage()
    }
}

#[cfg(test)]
mod tests {
    use stowage_common::{code::BincodeTransformer, error::ErrorKind};

    use super::*;

    fn configs(dir: &std::path::Path, memory: usize, disk: u64) -> (AutoPurgingConfig, DiskConfig) {
        (
            AutoPurgingConfig::default()
                .with_memory_capacity(memory)
                .with_preferred_memory_usage_after_purge(memory * 7 / 10),
            DiskConfig::new("warehouse").with_root(dir).with_max_size(disk),
        )
    }

    fn open(dir: &std::path::Path) -> Warehouse<String> {
        let (purging, disk) = configs(dir, 1 << 20, 1 << 24);
        Warehouse::open(purging, disk, Arc::new(BincodeTransformer::<String>::new())).unwrap()
    }

    #[test_log::test]
    fn test_memory_weighs_encoded_length() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = open(dir.path());
        warehouse.set_object("x".repeat(10), "k", None).unwrap();
        assert_eq!(warehouse.current_memory_usage(), 8 + 10);
    }

    #[test_log::test]
    fn test_update_capacity_keeps_disk_entries() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = open(dir.path());
        warehouse.set_object("v".to_string(), "k", None).unwrap();

        let (purging, disk) = configs(dir.path(), 1 << 10, 1 << 20);
        warehouse.update_cache_capacity(purging, disk).unwrap();
        assert_eq!(warehouse.memory_capacity(), 1 << 10);
        assert_eq!(warehouse.disk_capacity(), 1 << 20);

        // The new memory tier starts empty and is repopulated from disk.
        assert_eq!(warehouse.current_memory_usage(), 0);
        assert_eq!(warehouse.object("k").unwrap(), "v");
        assert!(warehouse.current_memory_usage() > 0);
    }

    #[test_log::test]
    fn test_rejected_update_keeps_current_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = open(dir.path());

        let (purging, disk) = configs(dir.path(), 100, 1 << 20);
        let e = warehouse
            .update_cache_capacity(purging.with_preferred_memory_usage_after_purge(100), disk)
            .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Config);
        assert_eq!(warehouse.memory_capacity(), 1 << 20);
    }

    #[test_log::test]
    fn test_update_capacity_while_writing() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = Arc::new(open(dir.path()));
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let writer = {
            let warehouse = warehouse.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut i = 0;
                while !done.load(std::sync::atomic::Ordering::SeqCst) {
                    warehouse.set_object("x".repeat(4096), &format!("k{}", i % 500), None).unwrap();
                    i += 1;
                }
                i
            })
        };

        for round in 0..300 {
            let (purging, disk) = configs(dir.path(), 1 << 20, (1 << 24) + round);
            warehouse.update_cache_capacity(purging, disk).unwrap();
        }
        done.store(true, std::sync::atomic::Ordering::SeqCst);
        let writes = writer.join().unwrap();

        // Usage tracked by the current tier matches the files on disk.
        let real = std::fs::read_dir(warehouse.disk_config().dir())
            .unwrap()
            .map(|e| e.unwrap().metadata().unwrap().len())
            .sum::<u64>();
        assert_eq!(warehouse.current_disk_usage(), real);
        for i in 0..writes.min(500) {
            assert_eq!(warehouse.object(&format!("k{i}")).unwrap(), "x".repeat(4096));
        }
    }

    #[test_log::test]
    fn test_memory_only_write_and_pressure() {
        let dir = tempfile::tempdir().unwrap();
        let warehouse = open(dir.path());

        warehouse.set_object_in_memory("m".to_string(), "m", None).unwrap();
        assert_eq!(warehouse.object("m").unwrap(), "m");
        assert_eq!(warehouse.current_disk_usage(), 0);

        warehouse.handle_memory_pressure();
        assert_eq!(warehouse.entry("m").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
