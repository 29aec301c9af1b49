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
use url::Url;

use crate::http::Headers;

/// Where a response may be cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoragePolicy {
    /// Memory and disk.
    #[default]
    Allowed,
    /// Memory only.
    AllowedInMemoryOnly,
    /// Not cached.
    NotAllowed,
}

/// A response together with its body, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// The URL the response was received from.
    pub url: Url,
    /// The HTTP status code.
    pub status: u16,
    /// The response headers.
    pub headers: Headers,
    /// The response body.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// Where the response may be cached.
    pub storage_policy: StoragePolicy,
}

impl CachedResponse {
    /// Create a response whose storage is [`StoragePolicy::Allowed`].
    pub fn new(url: Url, status: u16, headers: Headers, data: impl Into<Vec<u8>>) -> Self {
        Self {
            url,
            status,
            headers,
            data: data.into(),
            storage_policy: StoragePolicy::Allowed,
        }
    }

    /// Set the storage policy.
    pub fn with_storage_policy(mut self, storage_policy: StoragePolicy) -> Self {
        self.storage_policy = storage_policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use stowage_common::code::{BincodeTransformer, JsonTransformer, SealedTransformer, Transformer};

    use super::*;

    fn response() -> CachedResponse {
        CachedResponse::new(
            Url::parse("https://example.com/image.jpg").unwrap(),
            200,
            [("ETag", "\"abc\""), ("Cache-Control", "max-age=600")].into_iter().collect(),
            vec![0xff, 0xd8, 0xff, 0xe0],
        )
        .with_storage_policy(StoragePolicy::AllowedInMemoryOnly)
    }

    #[test_log::test]
    fn test_transformers_preserve_response() {
        let transformers: Vec<Box<dyn Transformer<CachedResponse>>> = vec![
            Box::new(BincodeTransformer::<CachedResponse>::new()),
            Box::new(JsonTransformer::<CachedResponse>::new()),
            Box::new(SealedTransformer::<CachedResponse>::new()),
        ];
        for transformer in transformers {
            let buf = transformer.encode(&response()).unwrap();
            assert_eq!(transformer.decode(&buf).unwrap(), response());
        }
    }
}
