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

use parking_lot::RwLock;
use stowage_common::{
    entry::Entry,
    error::Result,
    expiry::Expiry,
    store::{DiskBacked, MemoryBacked, Store},
};

/// Single-writer, multi-reader access to a store.
///
/// Reads run concurrently under a shared guard. Writes, removals, sweeps and [`Accessor::replace_storage`] run under
/// the exclusive guard. The lock is fair to writers: once a writer waits, new readers queue behind it.
///
/// Errors of the underlying store are returned unchanged.
#[derive(Debug)]
pub struct Accessor<S> {
    storage: RwLock<S>,
}

impl<S> Accessor<S> {
    /// Wrap the store.
    pub fn new(storage: S) -> Self {
        Self {
            storage: RwLock::new(storage),
        }
    }

    /// Run a read-class operation on the current store.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.storage.read())
    }

    /// Run a write-class operation on the current store.
    pub fn write<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.storage.write())
    }

    /// Swap in a new store and return the old one.
    ///
    /// Waits for in-flight operations to drain. Every operation that starts after the call returns sees the new store.
    pub fn replace_storage(&self, storage: S) -> S {
        std::mem::replace(&mut *self.storage.write(), storage)
    }

    /// Build a new store from the current one under the exclusive guard and swap it in.
    ///
    /// No other operation runs while `f` builds the new store. If `f` fails the current store stays in place.
    pub fn try_replace_storage<E>(
        &self,
        f: impl FnOnce(&S) -> std::result::Result<S, E>,
    ) -> std::result::Result<S, E> {
        let mut guard = self.storage.write();
        let storage = f(&guard)?;
        Ok(std::mem::replace(&mut *guard, storage))
    }

    /// Consume the accessor and take the store.
    pub fn into_inner(self) -> S {
        self.storage.into_inner()
    }
}

impl<T, S> Store<T> for Accessor<S>
where
    S: Store<T>,
{
    fn entry(&self, key: &str) -> Result<Entry<T>> {
        self.read(|s| s.entry(key))
    }

    fn object(&self, key: &str) -> Result<T> {
        self.read(|s| s.object(key))
    }

    fn set_object(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()> {
        self.write(|s| s.set_object(object, key, expiry))
    }

    fn remove_object(&self, key: &str) -> Result<()> {
        self.write(|s| s.remove_object(key))
    }

    fn exists_object(&self, key: &str) -> bool {
        self.read(|s| s.exists_object(key))
    }

    fn is_expired_object(&self, key: &str) -> bool {
        self.read(|s| s.is_expired_object(key))
    }

    fn remove_all(&self) -> Result<()> {
        self.write(|s| s.remove_all())
    }

    fn remove_expired_objects(&self) -> Result<()> {
        self.write(|s| s.remove_expired_objects())
    }

    fn remove_stored_objects_since(&self, date: SystemTime) -> Result<()> {
        self.write(|s| s.remove_stored_objects_since(date))
    }

    fn remove_object_if_expired(&self, key: &str) -> Result<()> {
        self.write(|s| s.remove_object_if_expired(key))
    }
}

impl<S: MemoryBacked> MemoryBacked for Accessor<S> {
    fn memory_capacity(&self) -> usize {
        self.read(|s| s.memory_capacity())
    }

    fn current_memory_usage(&self) -> usize {
        self.read(|s| s.current_memory_usage())
    }
}

impl<S: DiskBacked> DiskBacked for Accessor<S> {
    fn disk_capacity(&self) -> u64 {
        self.read(|s| s.disk_capacity())
    }

    fn current_disk_usage(&self) -> u64 {
        self.read(|s| s.current_disk_usage())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc, Barrier,
        },
        thread,
        time::Duration,
    };

    use stowage_common::error::ErrorKind;
    use stowage_memory::{InMemoryConfig, InMemoryStore};

    use super::*;

    fn accessor() -> Arc<Accessor<InMemoryStore<u64>>> {
        Arc::new(Accessor::new(InMemoryStore::new(InMemoryConfig::default())))
    }

    #[test_log::test]
    fn test_pass_through() {
        let accessor = accessor();
        accessor.set_object(1, "k", None).unwrap();
        assert_eq!(accessor.object("k").unwrap(), 1);
        assert!(accessor.exists_object("k"));
        accessor.remove_object("k").unwrap();
        assert_eq!(accessor.entry("k").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test_log::test]
    fn test_readers_share_access() {
        let accessor = accessor();
        let barrier = Arc::new(Barrier::new(4));

        // All four readers hold the shared guard at the same time, or the barrier never opens.
        let handles = (0..4)
            .map(|_| {
                let accessor = accessor.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    accessor.read(|_| {
                        barrier.wait();
                    })
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test_log::test]
    fn test_writer_is_exclusive() {
        let accessor = accessor();
        let writing = Arc::new(AtomicBool::new(false));
        let violations = Arc::new(AtomicUsize::new(0));

        let writer = {
            let accessor = accessor.clone();
            let writing = writing.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    accessor.write(|s| {
                        writing.store(true, Ordering::SeqCst);
                        s.set_object(i, "k", None).unwrap();
                        thread::sleep(Duration::from_micros(50));
                        writing.store(false, Ordering::SeqCst);
                    });
                }
            })
        };

        let readers = (0..4)
            .map(|_| {
                let accessor = accessor.clone();
                let writing = writing.clone();
                let violations = violations.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        accessor.read(|s| {
                            if writing.load(Ordering::SeqCst) {
                                violations.fetch_add(1, Ordering::SeqCst);
                            }
                            let _ = s.entry("k");
                        });
                    }
                })
            })
            .collect::<Vec<_>>();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(violations.load(Ordering::SeqCst), 0);
        assert_eq!(accessor.object("k").unwrap(), 199);
    }

    #[test_log::test]
    fn test_replace_storage() {
        let accessor = accessor();
        accessor.set_object(1, "old", None).unwrap();

        let replacement = InMemoryStore::new(InMemoryConfig::default().with_total_cost_limit(64));
        replacement.set_object(2, "new", None).unwrap();
        let old = accessor.replace_storage(replacement);

        assert_eq!(old.object("old").unwrap(), 1);
        assert!(!accessor.exists_object("old"));
        assert_eq!(accessor.object("new").unwrap(), 2);
        assert_eq!(accessor.memory_capacity(), 64);
    }

    #[test_log::test]
    fn test_try_replace_storage() {
        let accessor = accessor();
        accessor.set_object(1, "old", None).unwrap();

        let e = accessor
            .try_replace_storage(|_| Err::<InMemoryStore<u64>, _>(ErrorKind::Config))
            .unwrap_err();
        assert_eq!(e, ErrorKind::Config);
        assert_eq!(accessor.object("old").unwrap(), 1);

        let old = accessor
            .try_replace_storage(|current| {
                let replacement = InMemoryStore::new(InMemoryConfig::default());
                replacement.set_object(current.object("old")? + 1, "new", None)?;
                Ok::<_, stowage_common::error::Error>(replacement)
            })
            .unwrap();
        assert!(old.exists_object("old"));
        assert_eq!(accessor.object("new").unwrap(), 2);
    }

    #[test_log::test]
    fn test_try_replace_storage_excludes_writers() {
        let accessor = accessor();
        let building = Arc::new(AtomicBool::new(false));
        let violations = Arc::new(AtomicUsize::new(0));

        let writer = {
            let accessor = accessor.clone();
            let building = building.clone();
            let violations = violations.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    accessor.write(|s| {
                        if building.load(Ordering::SeqCst) {
                            violations.fetch_add(1, Ordering::SeqCst);
                        }
                        s.set_object(i, "k", None).unwrap();
                    });
                }
            })
        };

        for _ in 0..50 {
            accessor
                .try_replace_storage(|_| {
                    building.store(true, Ordering::SeqCst);
                    thread::sleep(Duration::from_micros(100));
                    building.store(false, Ordering::SeqCst);
                    Ok::<_, ErrorKind>(InMemoryStore::new(InMemoryConfig::default()))
                })
                .unwrap();
        }

        writer.join().unwrap();
        assert_eq!(violations.load(Ordering::SeqCst), 0);
    }
}
