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

use std::time::{Duration, SystemTime};

use super::{
    date::parse_http_date,
    headers::{names, CacheControl, Headers},
};
use crate::config::UrlCacheConfig;

/// Compute when a response expires from its status and headers, or `None` if it must not be cached.
///
/// The first matching rule wins:
///
/// 1. `Pragma: no-cache` is not cacheable.
/// 2. `Cache-Control: no-store` is not cacheable.
/// 3. `Cache-Control: max-age=N` expires `N` seconds after the response date, not cacheable if `N <= 0`.
/// 4. `Expires` maps its distance from the response date onto the local clock, not cacheable if it is not ahead of
///    the response date or cannot be parsed.
/// 5. `302` and `307` are not cacheable.
/// 6. `Last-Modified` expires after `last_modification_fraction` of the document age, not cacheable if the age is not
///    positive.
/// 7. Otherwise expires `expiration_delay_default` from now.
///
/// The response date is the `Date` header, or `now` if absent or unparseable.
pub fn expiration_date(
    status: u16,
    headers: &Headers,
    config: &UrlCacheConfig,
    now: SystemTime,
) -> Option<SystemTime> {
    if headers
        .get(names::PRAGMA)
        .is_some_and(|pragma| pragma.to_ascii_lowercase().contains("no-cache"))
    {
        return None;
    }

    let response_date = headers
        .get(names::DATE)
        .and_then(|date| parse_http_date(date, now))
        .unwrap_or(now);

    if let Some(cc) = headers.get(names::CACHE_CONTROL).map(CacheControl::parse) {
        if cc.no_store {
            return None;
        }
        if let Some(max_age) = cc.max_age {
            return match max_age > 0 {
                true => response_date.checked_add(Duration::from_secs(max_age as u64)),
                false => None,
            };
        }
    }

    if let Some(expires) = headers.get(names::EXPIRES) {
        let expires = parse_http_date(expires, now)?;
        return match expires.duration_since(response_date) {
            Ok(ahead) if !ahead.is_zero() => now.checked_add(ahead),
            _ => None,
        };
    }

    if matches!(status, 302 | 307) {
        return None;
    }

    if let Some(last_modified) = headers
        .get(names::LAST_MODIFIED)
        .and_then(|date| parse_http_date(date, now))
    {
        return match response_date.duration_since(last_modified) {
            Ok(age) if !age.is_zero() => {
                let lifetime = Duration::try_from_secs_f64(age.as_secs_f64() * config.last_modification_fraction).ok()?;
                now.checked_add(lifetime)
            }
            _ => None,
        };
    }

    now.checked_add(config.expiration_delay_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::date::format_http_date;

    fn expiration(status: u16, headers: &[(&str, &str)], now: SystemTime) -> Option<SystemTime> {
        let headers = headers.iter().copied().collect();
        expiration_date(status, &headers, &UrlCacheConfig::default(), now)
    }

    #[test]
    fn test_pragma_and_no_store() {
        let now = SystemTime::now();
        assert_eq!(expiration(200, &[("Pragma", "No-Cache"), ("Cache-Control", "max-age=60")], now), None);
        assert_eq!(expiration(200, &[("Cache-Control", "no-store, max-age=60")], now), None);
    }

    #[test]
    fn test_max_age_takes_precedence_over_expires() {
        let now = SystemTime::now();
        let date = format_http_date(now);
        let expires = format_http_date(now + Duration::from_secs(86400));
        let response_date = parse_http_date(&date, now).unwrap();

        let headers = [("Date", date.as_str()), ("Cache-Control", "max-age=100"), ("Expires", expires.as_str())];
        assert_eq!(expiration(200, &headers, now), Some(response_date + Duration::from_secs(100)));

        let headers = [("Date", date.as_str()), ("Cache-Control", "max-age=0"), ("Expires", expires.as_str())];
        assert_eq!(expiration(200, &headers, now), None);
    }

    #[test]
    fn test_max_age_without_date_uses_now() {
        let now = SystemTime::now();
        assert_eq!(
            expiration(200, &[("Cache-Control", "public, max-age=60")], now),
            Some(now + Duration::from_secs(60))
        );
    }

    #[test]
    fn test_expires_maps_skew_onto_local_clock() {
        let now = SystemTime::now();
        // The server clock runs a day behind.
        let server_now = now - Duration::from_secs(86400);
        let headers = [
            ("Date", format_http_date(server_now)),
            ("Expires", format_http_date(server_now + Duration::from_secs(3600))),
        ];
        let headers = headers.iter().map(|(n, v)| (*n, v.as_str())).collect::<Vec<_>>();
        assert_eq!(expiration(200, &headers, now), Some(now + Duration::from_secs(3600)));

        let headers = [("Date", format_http_date(now)), ("Expires", format_http_date(now))];
        let headers = headers.iter().map(|(n, v)| (*n, v.as_str())).collect::<Vec<_>>();
        assert_eq!(expiration(200, &headers, now), None);

        assert_eq!(expiration(200, &[("Expires", "0")], now), None);
    }

    #[test]
    fn test_redirects_without_directives() {
        let now = SystemTime::now();
        assert_eq!(expiration(302, &[], now), None);
        assert_eq!(expiration(307, &[("Last-Modified", "Tue, 01 Jan 2019 00:00:00 GMT")], now), None);
        assert!(expiration(302, &[("Cache-Control", "max-age=60")], now).is_some());
        assert!(expiration(301, &[], now).is_some());
    }

    #[test]
    fn test_last_modified_heuristic() {
        let now = SystemTime::now();
        let headers = [
            ("Last-Modified", "Tue, 01 Jan 2019 00:00:00 GMT"),
            ("Date", "Tue, 01 Jan 2019 01:00:00 GMT"),
        ];
        assert_eq!(expiration(200, &headers, now), Some(now + Duration::from_secs(360)));

        let headers = [
            ("Last-Modified", "Tue, 01 Jan 2019 01:00:00 GMT"),
            ("Date", "Tue, 01 Jan 2019 01:00:00 GMT"),
        ];
        assert_eq!(expiration(200, &headers, now), None);
    }

    #[test]
    fn test_fallback_delay() {
        let now = SystemTime::now();
        assert_eq!(expiration(200, &[("ETag", "\"x\"")], now), Some(now + Duration::from_secs(5 * 3600)));
    }
}
