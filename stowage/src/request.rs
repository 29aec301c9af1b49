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

use url::Url;

use crate::http::Headers;

/// How a request wants the cache to be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestCachePolicy {
    /// Follow the caching logic of the protocol.
    #[default]
    UseProtocolCachePolicy,
    /// Load from the origin, ignoring cached data.
    ReloadIgnoringLocalCacheData,
    /// Load from the origin, ignoring local and intermediate caches.
    ReloadIgnoringLocalAndRemoteCacheData,
    /// Use cached data regardless of age, load from the origin otherwise.
    ReturnCacheDataElseLoad,
    /// Use cached data regardless of age, never load from the origin.
    ReturnCacheDataDontLoad,
    /// Revalidate cached data with the origin before use.
    ReloadRevalidatingCacheData,
}

impl RequestCachePolicy {
    /// Returns `true` if the policy bypasses the local cache.
    ///
    /// Such requests neither read from nor write to the cache.
    pub fn ignores_local_cache(&self) -> bool {
        matches!(
            self,
            Self::ReloadIgnoringLocalCacheData | Self::ReloadIgnoringLocalAndRemoteCacheData
        )
    }
}

/// The request side of a cache lookup or store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRequest {
    /// The request URL.
    pub url: Option<Url>,
    /// The cache policy of the request.
    pub cache_policy: RequestCachePolicy,
    /// The request headers.
    pub headers: Headers,
}

impl CacheRequest {
    /// Create a request for the URL with the default cache policy.
    pub fn new(url: Url) -> Self {
        Self {
            url: Some(url),
            ..Default::default()
        }
    }

    /// Set the cache policy.
    pub fn with_cache_policy(mut self, cache_policy: RequestCachePolicy) -> Self {
        self.cache_policy = cache_policy;
        self
    }

    /// Set a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The cache key of the request: the absolute URL without its fragment.
    pub fn cache_key(&self) -> Option<String> {
        self.url.as_ref().and_then(cache_key)
    }
}

/// The cache key of a URL: the absolute URL without its fragment, `None` if that is empty.
pub fn cache_key(url: &Url) -> Option<String> {
    let mut url = url.clone();
    url.set_fragment(None);
    let key = String::from(url);
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_strips_fragment() {
        let request = CacheRequest::new(Url::parse("https://example.com/a/b.png?w=100#top").unwrap());
        assert_eq!(request.cache_key().as_deref(), Some("https://example.com/a/b.png?w=100"));
        assert_eq!(CacheRequest::default().cache_key(), None);
    }

    #[test]
    fn test_bypassing_policies() {
        assert!(RequestCachePolicy::ReloadIgnoringLocalCacheData.ignores_local_cache());
        assert!(RequestCachePolicy::ReloadIgnoringLocalAndRemoteCacheData.ignores_local_cache());
        assert!(!RequestCachePolicy::UseProtocolCachePolicy.ignores_local_cache());
        assert!(!RequestCachePolicy::ReturnCacheDataDontLoad.ignores_local_cache());
    }
}
