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

use serde::{Deserialize, Serialize};
use stowage_common::expiry::Expiry;

/// Config of [`InMemoryStore`](crate::InMemoryStore).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Default expiry of objects set without an explicit expiry.
    pub expiry: Expiry,
    /// Advisory limit of the entry count, `0` for unlimited.
    pub count_limit: usize,
    /// Advisory limit of the total estimated bytes, `0` for unlimited.
    pub total_cost_limit: usize,
}

impl InMemoryConfig {
    /// Set the default expiry.
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Set the advisory entry count limit.
    pub fn with_count_limit(mut self, count_limit: usize) -> Self {
        self.count_limit = count_limit;
        self
    }

    /// Set the advisory total cost limit in bytes.
    pub fn with_total_cost_limit(mut self, total_cost_limit: usize) -> Self {
        self.total_cost_limit = total_cost_limit;
        self
    }
}

/// Config of [`AutoPurgingStore`](crate::AutoPurgingStore).
///
/// Once the estimated usage exceeds `memory_capacity`, least-recently-used entries are evicted until the usage is no
/// more than `preferred_memory_usage_after_purge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoPurgingConfig {
    /// Default expiry of objects set without an explicit expiry.
    pub expiry: Expiry,
    /// Usage in bytes that triggers a purge.
    pub memory_capacity: usize,
    /// Usage in bytes a purge reduces to.
    pub preferred_memory_usage_after_purge: usize,
}

impl Default for AutoPurgingConfig {
    fn default() -> Self {
        Self {
            expiry: Expiry::Never,
            memory_capacity: 100 * 1024 * 1024,
            preferred_memory_usage_after_purge: 60 * 1024 * 1024,
        }
    }
}

impl AutoPurgingConfig {
    /// Set the default expiry.
    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Set the memory capacity in bytes.
    pub fn with_memory_capacity(mut self, memory_capacity: usize) -> Self {
        self.memory_capacity = memory_capacity;
        self
    }

    /// Set the usage in bytes a purge reduces to.
    pub fn with_preferred_memory_usage_after_purge(mut self, preferred: usize) -> Self {
        self.preferred_memory_usage_after_purge = preferred;
        self
    }
}
