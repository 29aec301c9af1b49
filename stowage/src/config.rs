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

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Time constants of the [`UrlCache`](crate::UrlCache) caching policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlCacheConfig {
    /// Responses stored within this age are removed by
    /// [`UrlCache::clear_cached_responses_to_min_age_threshold`](crate::UrlCache::clear_cached_responses_to_min_age_threshold).
    pub min_cache_response_age: Duration,
    /// Default lifetime of cache tiers.
    pub max_cache_response_age: Duration,
    /// Lifetime of a response whose headers give no expiration hint.
    pub expiration_delay_default: Duration,
    /// Responses expiring sooner than this are not stored.
    pub expiration_delay_minimum: Duration,
    /// Fraction of the `Last-Modified` age used as the heuristic lifetime.
    pub last_modification_fraction: f64,
    /// Resolve a cached `302` through the cache entry of its `Location`.
    pub follow_cached_redirects: bool,
}

impl Default for UrlCacheConfig {
    fn default() -> Self {
        Self {
            min_cache_response_age: Duration::from_secs(604800),
            max_cache_response_age: Duration::from_secs(259200),
            expiration_delay_default: Duration::from_secs(5 * 60 * 60),
            expiration_delay_minimum: Duration::from_secs(5 * 60),
            last_modification_fraction: 0.1,
            follow_cached_redirects: false,
        }
    }
}

impl UrlCacheConfig {
    /// Set the min cache response age.
    pub fn with_min_cache_response_age(mut self, age: Duration) -> Self {
        self.min_cache_response_age = age;
        self
    }

    /// Set the max cache response age.
    pub fn with_max_cache_response_age(mut self, age: Duration) -> Self {
        self.max_cache_response_age = age;
        self
    }

    /// Set the default expiration delay.
    pub fn with_expiration_delay_default(mut self, delay: Duration) -> Self {
        self.expiration_delay_default = delay;
        self
    }

    /// Set the minimum expiration delay.
    pub fn with_expiration_delay_minimum(mut self, delay: Duration) -> Self {
        self.expiration_delay_minimum = delay;
        self
    }

    /// Set the last modification fraction.
    ///
    /// # Panics
    ///
    /// Panics if the fraction is negative or not finite.
    pub fn with_last_modification_fraction(mut self, fraction: f64) -> Self {
        assert!(
            fraction.is_finite() && fraction >= 0.0,
            "last modification fraction must be finite and non-negative, given: {fraction}"
        );
        self.last_modification_fraction = fraction;
        self
    }

    /// Set whether cached redirects are followed.
    pub fn with_follow_cached_redirects(mut self, follow: bool) -> Self {
        self.follow_cached_redirects = follow;
        self
    }
}
