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

use std::time::SystemTime;

use crate::expiry::Expiry;

/// A stored object together with its expiry and estimated byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<T> {
    object: T,
    expiry: Expiry,
    estimated_size: usize,
}

impl<T> Entry<T> {
    /// Create a new entry.
    pub fn new(object: T, expiry: Expiry, estimated_size: usize) -> Self {
        Self {
            object,
            expiry,
            estimated_size,
        }
    }

    /// The stored object.
    pub fn object(&self) -> &T {
        &self.object
    }

    /// The expiry of the entry.
    pub fn expiry(&self) -> &Expiry {
        &self.expiry
    }

    /// The estimated byte size of the entry.
    pub fn estimated_size(&self) -> usize {
        self.estimated_size
    }

    /// Returns `true` if the entry has expired now.
    pub fn is_expired(&self) -> bool {
        self.expiry.is_expired()
    }

    /// Returns `true` if the entry has expired at `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expiry.is_expired_at(now)
    }

    /// Consume the entry and take the object.
    pub fn into_object(self) -> T {
        self.object
    }

    /// Consume the entry and take its parts.
    pub fn into_parts(self) -> (T, Expiry, usize) {
        (self.object, self.expiry, self.estimated_size)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn test_entry_expiry() {
        let at = UNIX_EPOCH + Duration::from_secs(100);
        let entry = Entry::new("value".to_string(), Expiry::instant(at), 5);

        assert_eq!(entry.object(), "value");
        assert_eq!(entry.estimated_size(), 5);
        assert!(!entry.is_expired_at(at));
        assert!(entry.is_expired_at(at + Duration::from_secs(1)));
        assert!(entry.is_expired());

        let (object, expiry, size) = entry.into_parts();
        assert_eq!((object.as_str(), expiry, size), ("value", Expiry::Instant(at), 5));
    }

    #[test]
    fn test_entry_never_expires() {
        let entry = Entry::new(vec![1u8, 2, 3], Expiry::Never, 3);
        assert!(!entry.is_expired());
        assert_eq!(entry.into_object(), vec![1, 2, 3]);
    }
}
