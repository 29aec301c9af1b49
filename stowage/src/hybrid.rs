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

use std::time::SystemTime;

use stowage_common::{
    entry::Entry,
    error::Result,
    expiry::Expiry,
    store::{DiskBacked, MemoryBacked, Store},
};

/// Composes a memory tier and a disk tier behind one [`Store`].
///
/// The disk tier is the source of truth. Writes go to disk first and then to memory. Reads prefer memory and fall
/// back to disk, repopulating memory on a disk hit. Removals and sweeps run on both tiers and report the disk error
/// first.
#[derive(Debug)]
pub struct HybridStore<M, D> {
    memory: M,
    disk: D,
}

impl<M, D> HybridStore<M, D> {
    /// Compose the two tiers.
    pub fn new(memory: M, disk: D) -> Self {
        Self { memory, disk }
    }

    /// The memory tier.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// The disk tier.
    pub fn disk(&self) -> &D {
        &self.disk
    }

    /// Decompose into the two tiers.
    pub fn into_parts(self) -> (M, D) {
        (self.memory, self.disk)
    }
}

impl<T, M, D> Store<T> for HybridStore<M, D>
where
    T: Clone + Send + Sync + 'static,
    M: Store<T>,
    D: Store<T>,
{
    fn entry(&self, key: &str) -> Result<Entry<T>> {
        match self.memory.entry(key) {
            Ok(entry) => return Ok(entry),
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!("[hybrid store]: memory tier read failed, fallback to disk, key: {key}, error: {e}"),
        }

        let entry = self.disk.entry(key)?;
        if let Err(e) = self
            .memory
            .set_object(entry.object().clone(), key, Some(*entry.expiry()))
        {
            tracing::warn!("[hybrid store]: repopulate memory tier failed, key: {key}, error: {e}");
        }
        Ok(entry)
    }

    fn set_object(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()> {
        self.disk.set_object(object.clone(), key, expiry)?;
        self.memory.set_object(object, key, expiry)
    }

    fn remove_object(&self, key: &str) -> Result<()> {
        let memory = self.memory.remove_object(key);
        let disk = self.disk.remove_object(key);
        disk.and(memory)
    }

    fn exists_object(&self, key: &str) -> bool {
        self.memory.exists_object(key) || self.disk.exists_object(key)
    }

    fn is_expired_object(&self, key: &str) -> bool {
        match self.memory.exists_object(key) {
            true => self.memory.is_expired_object(key),
            false => self.disk.is_expired_object(key),
        }
    }

    fn remove_all(&self) -> Result<()> {
        let memory = self.memory.remove_all();
        let disk = self.disk.remove_all();
        disk.and(memory)
    }

    fn remove_expired_objects(&self) -> Result<()> {
        let memory = self.memory.remove_expired_objects();
        let disk = self.disk.remove_expired_objects();
        disk.and(memory)
    }

    fn remove_stored_objects_since(&self, date: SystemTime) -> Result<()> {
        let memory = self.memory.remove_stored_objects_since(date);
        let disk = self.disk.remove_stored_objects_since(date);
        disk.and(memory)
    }

    fn remove_object_if_expired(&self, key: &str) -> Result<()> {
        let memory = self.memory.remove_object_if_expired(key);
        let disk = self.disk.remove_object_if_expired(key);
        disk.and(memory)
    }
}

impl<M: MemoryBacked, D> MemoryBacked for HybridStore<M, D> {
    fn memory_capacity(&self) -> usize {
        self.memory.memory_capacity()
    }

    fn current_memory_usage(&self) -> usize {
        self.memory.current_memory_usage()
    }
}

impl<M, D: DiskBacked> DiskBacked for HybridStore<M, D> {
    fn disk_capacity(&self) -> u64 {
        self.disk.disk_capacity()
    }

    fn current_disk_usage(&self) -> u64 {
        self.disk.current_disk_usage()
    }
}
