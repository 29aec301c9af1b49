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

use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use stowage_common::{
    code::{BincodeTransformer, Transformer},
    error::Result,
    expiry::Expiry,
    store::{DiskBacked, MemoryBacked, Store},
};
use stowage_memory::AutoPurgingConfig;
use stowage_storage::{default_cache_root, DiskConfig, ProtectionLevel};

use crate::{
    config::UrlCacheConfig,
    delegate::{CacheDelegate, DefaultCacheDelegate},
    http::{expiration_date, names, StatusClass},
    request::{cache_key, CacheRequest},
    response::{CachedResponse, StoragePolicy},
    warehouse::Warehouse,
};

const MAX_REDIRECT_HOPS: usize = 8;

/// A purge reduces the memory tier to 70% of its capacity.
fn preferred_memory_usage(memory_capacity: usize) -> usize {
    (memory_capacity as u128 * 7 / 10) as usize
}

/// Tier configs derived from the cache capacities. Both tiers expire entries `max_cache_response_age` from now.
fn tier_configs(config: &UrlCacheConfig, memory_capacity: usize, disk: DiskConfig) -> (AutoPurgingConfig, DiskConfig) {
    let expiry = Expiry::seconds(config.max_cache_response_age);
    let purging = AutoPurgingConfig::default()
        .with_expiry(expiry)
        .with_memory_capacity(memory_capacity)
        .with_preferred_memory_usage_after_purge(preferred_memory_usage(memory_capacity));
    (purging, disk.with_expiry(expiry))
}

/// Builder of [`UrlCache`].
pub struct UrlCacheBuilder {
    name: String,
    root: PathBuf,
    memory_capacity: usize,
    disk_capacity: u64,
    protection: ProtectionLevel,
    config: UrlCacheConfig,
    transformer: Arc<dyn Transformer<CachedResponse>>,
    delegate: Arc<dyn CacheDelegate>,
}

impl Debug for UrlCacheBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlCacheBuilder")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("memory_capacity", &self.memory_capacity)
            .field("disk_capacity", &self.disk_capacity)
            .field("protection", &self.protection)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for UrlCacheBuilder {
    fn default() -> Self {
        Self::new("urlcache")
    }
}

impl UrlCacheBuilder {
    /// Default memory capacity, 30 MiB.
    pub const DEFAULT_MEMORY_CAPACITY: usize = 30 * 1024 * 1024;
    /// Default disk capacity, 150 MiB.
    pub const DEFAULT_DISK_CAPACITY: u64 = 150 * 1024 * 1024;

    /// Create a builder for the disk namespace `name` under the default cache root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: default_cache_root(),
            memory_capacity: Self::DEFAULT_MEMORY_CAPACITY,
            disk_capacity: Self::DEFAULT_DISK_CAPACITY,
            protection: ProtectionLevel::Inherit,
            config: UrlCacheConfig::default(),
            transformer: Arc::new(BincodeTransformer::<CachedResponse>::new()),
            delegate: Arc::new(DefaultCacheDelegate),
        }
    }

    /// Set the root directory of disk namespaces.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().into();
        self
    }

    /// Set the memory capacity in bytes.
    pub fn with_memory_capacity(mut self, memory_capacity: usize) -> Self {
        self.memory_capacity = memory_capacity;
        self
    }

    /// Set the disk capacity in bytes, `0` for unbounded.
    pub fn with_disk_capacity(mut self, disk_capacity: u64) -> Self {
        self.disk_capacity = disk_capacity;
        self
    }

    /// Set the protection of the disk namespace.
    pub fn with_protection(mut self, protection: ProtectionLevel) -> Self {
        self.protection = protection;
        self
    }

    /// Set the caching policy constants.
    pub fn with_config(mut self, config: UrlCacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the transformer that serializes responses.
    ///
    /// Defaults to [`BincodeTransformer`]. Use [`SealedTransformer`](stowage_common::code::SealedTransformer) for
    /// storage that rejects any bytes it did not write.
    pub fn with_transformer(mut self, transformer: impl Transformer<CachedResponse>) -> Self {
        self.transformer = Arc::new(transformer);
        self
    }

    /// Set the host delegate.
    pub fn with_delegate(mut self, delegate: impl CacheDelegate) -> Self {
        self.delegate = Arc::new(delegate);
        self
    }

    /// Open the tiers and build the cache.
    pub fn build(self) -> Result<UrlCache> {
        let disk = DiskConfig::new(self.name)
            .with_root(self.root)
            .with_max_size(self.disk_capacity)
            .with_protection(self.protection);
        let (purging, disk) = tier_configs(&self.config, self.memory_capacity, disk);
        let warehouse = Warehouse::open(purging, disk, self.transformer)?;
        Ok(UrlCache {
            warehouse,
            config: self.config,
            delegate: self.delegate,
        })
    }
}

/// An HTTP response cache over a memory tier and a disk tier.
///
/// Decides whether a response may be cached from its request policy, status, headers and storage policy, and computes
/// its expiration. Every call is best-effort: lookups turn store errors into misses, stores and removals log store
/// errors and return nothing.
pub struct UrlCache {
    warehouse: Warehouse<CachedResponse>,
    config: UrlCacheConfig,
    delegate: Arc<dyn CacheDelegate>,
}

impl Debug for UrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlCache")
            .field("warehouse", &self.warehouse)
            .field("config", &self.config)
            .finish()
    }
}

impl UrlCache {
    /// Create a builder for the disk namespace `name`.
    pub fn builder(name: impl Into<String>) -> UrlCacheBuilder {
        UrlCacheBuilder::new(name)
    }

    /// The cached response of the request.
    ///
    /// Expired responses are still returned. Only [`UrlCache::store_cached_response`] sweeps and explicit removals
    /// drop them.
    pub fn cached_response(&self, request: &CacheRequest) -> Option<CachedResponse> {
        let Some(key) = request.cache_key() else {
            tracing::debug!("[url cache]: cannot look up a request without url");
            return None;
        };
        if request.cache_policy.ignores_local_cache() {
            tracing::debug!(
                "[url cache]: cache policy {:?} bypasses the cache, key: {key}",
                request.cache_policy
            );
            return None;
        }
        self.lookup(&key, request, 0)
    }

    fn lookup(&self, key: &str, request: &CacheRequest, hops: usize) -> Option<CachedResponse> {
        let entry = match self.warehouse.entry(key) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("[url cache]: lookup missed, key: {key}, error: {e}");
                return None;
            }
        };

        if entry.is_expired() {
            if self.delegate.network_available() {
                let max_age = request
                    .headers
                    .get(names::ACCESS_CONTROL_MAX_AGE)
                    .map(str::to_string)
                    .unwrap_or_else(|| self.config.max_cache_response_age.as_secs().to_string());
                tracing::debug!("[url cache]: serve entry older than {max_age} seconds, key: {key}");
            } else {
                tracing::debug!("[url cache]: serve expired entry while offline, key: {key}");
            }
        }

        let response = entry.into_object();
        if !self.config.follow_cached_redirects || response.status != 302 {
            return Some(response);
        }

        let Some(target) = response
            .headers
            .get(names::LOCATION)
            .and_then(|location| response.url.join(location).ok())
            .as_ref()
            .and_then(cache_key)
        else {
            return Some(response);
        };
        if hops >= MAX_REDIRECT_HOPS {
            tracing::debug!("[url cache]: too many cached redirects, stop at key: {key}");
            return Some(response);
        }

        tracing::debug!("[url cache]: follow cached redirect from {key} to {target}");
        self.lookup(&target, request, hops + 1)
    }

    /// Store the response of the request if it is cacheable.
    pub fn store_cached_response(&self, response: CachedResponse, request: &CacheRequest) {
        // Requests that bypass the cache for reads bypass it for writes too.
        if request.cache_policy.ignores_local_cache() {
            return;
        }
        let Some(key) = request.cache_key() else {
            return;
        };
        let Some(class) = StatusClass::of(response.status) else {
            tracing::debug!("[url cache]: unrecognised status {}, key: {key}", response.status);
            return;
        };
        if self.delegate.should_exclude(&response) {
            tracing::debug!("[url cache]: response excluded by delegate, key: {key}");
            return;
        }

        let now = SystemTime::now();
        let expiration = expiration_date(response.status, &response.headers, &self.config, now);

        if response.storage_policy == StoragePolicy::NotAllowed {
            return;
        }
        let disk_capacity = self.warehouse.disk_capacity();
        if disk_capacity > 0 && response.data.len() as u64 >= disk_capacity {
            tracing::debug!(
                "[url cache]: body of {} bytes does not fit disk capacity {disk_capacity}, key: {key}",
                response.data.len()
            );
            return;
        }
        if !response.headers.contains(names::ETAG) {
            tracing::debug!("[url cache]: response without ETag is not cached, key: {key}");
            return;
        }
        let Some(expiration) = expiration else {
            tracing::debug!("[url cache]: headers forbid caching, key: {key}");
            return;
        };
        match expiration.duration_since(now) {
            Ok(ahead) if ahead > self.config.expiration_delay_minimum => {}
            _ => {
                tracing::debug!("[url cache]: response expires too soon, key: {key}");
                return;
            }
        }
        if class.is_error() {
            tracing::debug!("[url cache]: error status {} is not cached, key: {key}", response.status);
            return;
        }

        if self
            .warehouse
            .object(&key)
            .is_ok_and(|previous| previous.data == response.data)
        {
            tracing::trace!("[url cache]: identical response already cached, key: {key}");
            return;
        }

        let expiry = Some(Expiry::Instant(expiration));
        let res = match response.storage_policy {
            StoragePolicy::AllowedInMemoryOnly => self.warehouse.set_object_in_memory(response, &key, expiry),
            _ => self.warehouse.set_object(response, &key, expiry),
        };
        if let Err(e) = res {
            tracing::warn!("[url cache]: store response failed, key: {key}, error: {e}");
            return;
        }
        if let Err(e) = self.warehouse.remove_expired_objects() {
            tracing::warn!("[url cache]: remove expired responses failed, error: {e}");
        }
    }

    /// Remove the cached response of the request.
    pub fn remove_cached_response(&self, request: &CacheRequest) {
        let Some(key) = request.cache_key() else {
            return;
        };
        match self.warehouse.remove_object(&key) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => tracing::debug!("[url cache]: nothing to remove, key: {key}"),
            Err(e) => tracing::warn!("[url cache]: remove response failed, key: {key}, error: {e}"),
        }
    }

    /// Remove all cached responses.
    pub fn remove_all_cached_responses(&self) {
        if let Err(e) = self.warehouse.remove_all() {
            tracing::warn!("[url cache]: remove all responses failed, error: {e}");
        }
    }

    /// Remove the cached responses whose expiry boundary is at or after `date`.
    pub fn remove_cached_responses_since(&self, date: SystemTime) {
        if let Err(e) = self.warehouse.remove_stored_objects_since(date) {
            tracing::warn!("[url cache]: remove responses since {date:?} failed, error: {e}");
        }
    }

    /// Remove the cached responses since `now - min_cache_response_age`.
    pub fn clear_cached_responses_to_min_age_threshold(&self) {
        let now = SystemTime::now();
        let threshold = now
            .checked_sub(self.config.min_cache_response_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.remove_cached_responses_since(threshold);
    }

    /// Rebuild the tiers with a new memory capacity. Disk entries are kept, the memory tier starts empty.
    pub fn update_memory_capacity(&self, memory_capacity: usize) -> Result<()> {
        let (purging, disk) = tier_configs(&self.config, memory_capacity, self.warehouse.disk_config());
        self.warehouse.update_cache_capacity(purging, disk)
    }

    /// Rebuild the tiers with a new disk capacity. Disk entries are kept, the memory tier starts empty.
    pub fn update_disk_capacity(&self, disk_capacity: u64) -> Result<()> {
        let disk = self.warehouse.disk_config().with_max_size(disk_capacity);
        let (purging, disk) = tier_configs(&self.config, self.warehouse.memory_capacity(), disk);
        self.warehouse.update_cache_capacity(purging, disk)
    }

    /// Drop the memory tier. Called by the host under memory pressure.
    pub fn handle_memory_pressure(&self) {
        self.warehouse.handle_memory_pressure();
    }

    /// The memory capacity in bytes.
    pub fn memory_capacity(&self) -> usize {
        self.warehouse.memory_capacity()
    }

    /// The disk capacity in bytes.
    pub fn disk_capacity(&self) -> u64 {
        self.warehouse.disk_capacity()
    }

    /// The estimated memory usage in bytes.
    pub fn current_memory_usage(&self) -> usize {
        self.warehouse.current_memory_usage()
    }

    /// The disk usage in bytes.
    pub fn current_disk_usage(&self) -> u64 {
        self.warehouse.current_disk_usage()
    }

    /// The caching policy constants.
    pub fn config(&self) -> &UrlCacheConfig {
        &self.config
    }

    /// The underlying warehouse.
    pub fn warehouse(&self) -> &Warehouse<CachedResponse> {
        &self.warehouse
    }
}
