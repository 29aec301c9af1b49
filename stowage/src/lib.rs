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

//! stowage is a hybrid HTTP response cache.
//!
//! Objects live in a memory tier over a disk tier. [`UrlCache`] sits on top and decides, from the request policy and
//! the response headers, which responses are stored and for how long.
//!
//! ```no_run
//! use stowage::{CacheRequest, CachedResponse, Headers, UrlCache};
//! use url::Url;
//!
//! let cache = UrlCache::builder("images").build().unwrap();
//!
//! let url = Url::parse("https://example.com/a.png").unwrap();
//! let headers = Headers::new().with("ETag", "\"v1\"").with("Cache-Control", "max-age=3600");
//! let request = CacheRequest::new(url.clone());
//! cache.store_cached_response(CachedResponse::new(url, 200, headers, b"png".to_vec()), &request);
//!
//! assert!(cache.cached_response(&request).is_some());
//! ```

pub use stowage_common as common;
pub use stowage_memory as memory;
pub use stowage_storage as storage;

mod accessor;
mod config;
mod delegate;
pub mod http;
mod hybrid;
mod request;
mod response;
mod url_cache;
mod warehouse;

mod prelude;
pub use prelude::*;
