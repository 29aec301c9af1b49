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

use crate::{entry::Entry, error::Result, expiry::Expiry};

/// The common storage interface implemented by every tier.
///
/// All operations take `&self`. Stores synchronize their own state so they can be shared between threads, the
/// read/write discipline across operations is imposed by the accessor that owns them.
pub trait Store<T>: Send + Sync + 'static {
    /// Get the entry of the key.
    ///
    /// Returns [`ErrorKind::NotFound`](crate::error::ErrorKind::NotFound) if the key is absent. An expired entry is
    /// still returned.
    fn entry(&self, key: &str) -> Result<Entry<T>>;

    /// Get the object of the key.
    fn object(&self, key: &str) -> Result<T> {
        self.entry(key).map(Entry::into_object)
    }

    /// Insert or overwrite the object of the key.
    ///
    /// `None` falls back to the default expiry of the store config.
    fn set_object(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()>;

    /// Remove the entry of the key.
    fn remove_object(&self, key: &str) -> Result<()>;

    /// Returns `true` if the entry of the key can be read.
    fn exists_object(&self, key: &str) -> bool {
        self.entry(key).is_ok()
    }

    /// Returns `true` if the entry of the key has expired.
    ///
    /// An entry that cannot be read counts as expired.
    fn is_expired_object(&self, key: &str) -> bool {
        match self.entry(key) {
            Ok(entry) => entry.is_expired(),
            Err(_) => true,
        }
    }

    /// Remove all entries.
    fn remove_all(&self) -> Result<()>;

    /// Remove all entries that have expired.
    fn remove_expired_objects(&self) -> Result<()>;

    /// Remove all entries whose expiry boundary is at or after `date`.
    fn remove_stored_objects_since(&self, date: SystemTime) -> Result<()>;

    /// Remove the entry of the key only if it exists and has expired.
    ///
    /// A missing key is not an error.
    fn remove_object_if_expired(&self, key: &str) -> Result<()>;
}

/// A store that reports memory usage.
pub trait MemoryBacked {
    /// The configured memory capacity in bytes.
    fn memory_capacity(&self) -> usize;

    /// The estimated memory usage in bytes of all live entries.
    fn current_memory_usage(&self) -> usize;
}

/// A store that reports disk usage.
pub trait DiskBacked {
    /// The configured disk capacity in bytes, `0` for unbounded.
    fn disk_capacity(&self) -> u64;

    /// The bytes used on disk by all entry files.
    fn current_disk_usage(&self) -> u64;
}
