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

//! Shared components of stowage: the error type, expiry policy, entry, transformers and the store traits.

/// Error type and kinds.
pub mod error;
/// Expiration policy of stored objects.
pub mod expiry;
/// Stored object with its metadata.
pub mod entry;
/// Encoding strategies and weighters.
pub mod code;
/// Storage interfaces shared by all tiers.
pub mod store;
