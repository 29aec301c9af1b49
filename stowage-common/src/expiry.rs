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

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A far future instant standing in for "never" wherever a concrete timestamp is required (e.g. file mtime).
///
/// 68 years after the unix epoch, which still fits a signed 32-bit `time_t`.
pub const DISTANT_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 68);

/// Expiration policy of a stored object.
///
/// `Seconds` is anchored at construction time, so an entry's deadline is fixed when it is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expiry {
    /// The object never expires.
    #[default]
    Never,
    /// The object expires at the given instant.
    Instant(SystemTime),
    /// The object expires `duration` after `anchored_at`.
    Seconds {
        /// Lifetime of the object.
        duration: Duration,
        /// The instant the lifetime is counted from.
        anchored_at: SystemTime,
    },
}

impl Expiry {
    /// Expire at the given instant.
    pub fn instant(at: SystemTime) -> Self {
        Self::Instant(at)
    }

    /// Expire `duration` from now. The current time is captured here.
    pub fn seconds(duration: Duration) -> Self {
        Self::seconds_from(duration, SystemTime::now())
    }

    /// Expire `duration` after `anchor`.
    pub fn seconds_from(duration: Duration, anchor: SystemTime) -> Self {
        Self::Seconds {
            duration,
            anchored_at: anchor,
        }
    }

    /// Expire at the given number of seconds since the unix epoch.
    pub fn seconds_from_1970(secs: u64) -> Self {
        Self::Instant(UNIX_EPOCH + Duration::from_secs(secs))
    }

    /// The absolute deadline, `None` for [`Expiry::Never`].
    pub fn deadline(&self) -> Option<SystemTime> {
        match self {
            Self::Never => None,
            Self::Instant(at) => Some(*at),
            Self::Seconds { duration, anchored_at } => Some(
                anchored_at
                    .checked_add(*duration)
                    .unwrap_or(UNIX_EPOCH + DISTANT_FUTURE),
            ),
        }
    }

    /// The deadline, or [`DISTANT_FUTURE`] for [`Expiry::Never`].
    pub fn date(&self) -> SystemTime {
        self.deadline().unwrap_or(UNIX_EPOCH + DISTANT_FUTURE)
    }

    /// Returns `true` if the deadline has passed at the time of the call.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Returns `true` if the deadline has passed at `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        match self.deadline() {
            None => false,
            Some(deadline) => now > deadline,
        }
    }

    /// Resolve to the absolute form. `Never` stays `Never`.
    pub fn resolve(&self) -> Self {
        match self.deadline() {
            None => Self::Never,
            Some(at) => Self::Instant(at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never() {
        let expiry = Expiry::Never;
        assert!(!expiry.is_expired());
        assert!(!expiry.is_expired_at(UNIX_EPOCH + DISTANT_FUTURE * 2));
        assert_eq!(expiry.deadline(), None);
        assert_eq!(expiry.date(), UNIX_EPOCH + DISTANT_FUTURE);
    }

    #[test]
    fn test_instant_is_monotonic() {
        let at = UNIX_EPOCH + Duration::from_secs(1_000_000);
        let expiry = Expiry::instant(at);

        assert!(!expiry.is_expired_at(at - Duration::from_secs(1)));
        assert!(!expiry.is_expired_at(at));

        let first = at + Duration::from_millis(1);
        assert!(expiry.is_expired_at(first));
        for step in [1, 10, 3600, 86400 * 365] {
            assert!(expiry.is_expired_at(first + Duration::from_secs(step)));
        }
    }

    #[test]
    fn test_seconds_is_anchored_at_construction() {
        let anchor = UNIX_EPOCH + Duration::from_secs(5_000);
        let expiry = Expiry::seconds_from(Duration::from_secs(60), anchor);

        assert_eq!(expiry.deadline(), Some(anchor + Duration::from_secs(60)));
        // A later clock reading does not move the deadline.
        assert!(!expiry.is_expired_at(anchor + Duration::from_secs(59)));
        assert!(expiry.is_expired_at(anchor + Duration::from_secs(61)));
        assert_eq!(expiry.resolve(), Expiry::Instant(anchor + Duration::from_secs(60)));
    }

    #[test]
    fn test_seconds_from_now() {
        let before = SystemTime::now();
        let expiry = Expiry::seconds(Duration::from_secs(3600));
        let deadline = expiry.deadline().unwrap();
        assert!(deadline >= before + Duration::from_secs(3600));
        assert!(!expiry.is_expired());

        let past = Expiry::seconds_from(Duration::from_secs(1), before - Duration::from_secs(10));
        assert!(past.is_expired());
    }

    #[test]
    fn test_seconds_from_1970() {
        let expiry = Expiry::seconds_from_1970(86400);
        assert_eq!(expiry.date(), UNIX_EPOCH + Duration::from_secs(86400));
        assert!(expiry.is_expired());
    }
}
