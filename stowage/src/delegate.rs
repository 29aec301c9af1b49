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

use crate::response::CachedResponse;

/// Host hooks consulted by [`UrlCache`](crate::UrlCache).
pub trait CacheDelegate: Send + Sync + 'static {
    /// Whether the network is reachable. Assumed reachable by default.
    fn network_available(&self) -> bool {
        true
    }

    /// Whether the response must not be cached. Nothing is excluded by default.
    fn should_exclude(&self, response: &CachedResponse) -> bool {
        let _ = response;
        false
    }
}

/// A delegate with the default behavior.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCacheDelegate;

impl CacheDelegate for DefaultCacheDelegate {}
