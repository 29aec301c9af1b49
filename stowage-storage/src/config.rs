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

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stowage_common::expiry::Expiry;

/// Name of the directory under the cache root that holds all stowage namespaces.
pub const CACHE_ROOT_DIR: &str = "stowage";

/// Access protection applied to the namespace directory and entry files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtectionLevel {
    /// Keep the permissions inherited from the process umask.
    #[default]
    Inherit,
    /// Restrict access to the owner: `0o700` for the directory and `0o600` for files on unix.
    ///
    /// No-op on other platforms.
    OwnerOnly,
}

/// The platform cache directory joined with [`CACHE_ROOT_DIR`].
///
/// `~/.cache` on Linux, `~/Library/Caches` on macOS, `%LOCALAPPDATA%` on Windows. Falls back to the system temporary
/// directory if the platform has none.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(std::env::temp_dir).join(CACHE_ROOT_DIR)
}

/// Config of [`DiskStore`](crate::DiskStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Namespace of the store. Entries live in `root/<name>/stowage.cache`.
    pub name: String,
    /// Root directory of all namespaces.
    pub root: PathBuf,
    /// Default expiry of objects set without an explicit expiry.
    pub expiry: Expiry,
    /// Capacity in bytes of all entry files, `0` for unbounded.
    pub max_size: u64,
    /// Protection applied to the directory and files.
    pub protection: ProtectionLevel,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self::new("default")
    }
}

impl DiskConfig {
    /// Name of the leaf directory holding entry files.
    pub const DIR_NAME: &'static str = "stowage.cache";

    /// Create a config for the namespace under the default cache root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: default_cache_root(),
            expiry: Expiry::Never,
            max_size: 0,
            protection: ProtectionLevel::Inherit,
        }
    }

    /// Set the root directory.
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().into();
        self
    }

    /// Set the default expiry.
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Set the capacity in bytes, `0` for unbounded.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the protection level.
    pub fn with_protection(mut self, protection: ProtectionLevel) -> Self {
        self.protection = protection;
        self
    }

    /// The directory that holds the entry files of the namespace.
    pub fn dir(&self) -> PathBuf {
        self.root.join(&self.name).join(Self::DIR_NAME)
    }
}
