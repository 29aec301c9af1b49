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

//! Memory tiers of stowage.
//!
//! [`InMemoryStore`] is a plain map that only reports its limits. [`AutoPurgingStore`] keeps its usage bounded by
//! evicting least-recently-used entries.

mod auto_purging;
mod config;
mod in_memory;

mod prelude;
pub use prelude::*;
