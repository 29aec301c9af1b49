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

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};

const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";
const ASCTIME: &str = "%a %b %e %H:%M:%S %Y";

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse an HTTP-date.
///
/// Tries RFC 1123 (`Sun, 06 Nov 1994 08:49:37 GMT`), then RFC 850 (`Sunday, 06-Nov-94 08:49:37 GMT`), then asctime
/// (`Sun Nov  6 08:49:37 1994`). `now` resolves the two-digit year of RFC 850.
pub fn parse_http_date(value: &str, now: SystemTime) -> Option<SystemTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, RFC1123)
        .ok()
        .or_else(|| parse_rfc850(value, now))
        .or_else(|| NaiveDateTime::parse_from_str(value, ASCTIME).ok())
        .map(|naive| SystemTime::from(naive.and_utc()))
}

/// Format as an RFC 1123 HTTP-date.
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format(RFC1123).to_string()
}

fn parse_rfc850(value: &str, now: SystemTime) -> Option<NaiveDateTime> {
    let (weekday, rest) = value.split_once(", ")?;
    weekday.parse::<Weekday>().ok()?;

    let rest = rest.strip_suffix(" GMT")?;
    let (date, time) = rest.split_once(' ')?;

    let mut parts = date.split('-');
    let day = parts.next()?.parse::<u32>().ok()?;
    let month = parts.next()?.to_ascii_lowercase();
    let month = MONTHS.iter().position(|m| *m == month)? as u32 + 1;
    let yy = parts.next()?;
    if yy.len() != 2 || parts.next().is_some() {
        return None;
    }
    let yy = yy.parse::<i32>().ok()?;

    let year = resolve_two_digit_year(yy, DateTime::<Utc>::from(now).year());
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    Some(date.and_time(time))
}

/// A two-digit year is the nearest year ending in those digits that is not more than 50 years in the future.
fn resolve_two_digit_year(yy: i32, current: i32) -> i32 {
    let base = current - 49;
    base + (yy - base).rem_euclid(100)
}
