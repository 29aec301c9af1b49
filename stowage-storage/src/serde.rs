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

use std::time::{Duration, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use stowage_common::{
    error::{Error, ErrorKind, Result},
    expiry::Expiry,
};

const ENTRY_MAGIC: u32 = 0x57_0A_6E_02;

const EXPIRY_NEVER: u8 = 0;
const EXPIRY_INSTANT: u8 = 1;

/// Header of an entry file, followed by the key bytes and the encoded object.
///
/// ```plain
/// | magic (4B) | expiry tag (1B) | secs (8B) | nanos (4B) | key len (4B) | key | payload |
/// ```
///
/// The expiry is always stored resolved to an absolute instant.
#[derive(Debug, PartialEq, Eq)]
pub struct EntryHeader {
    pub expiry: Expiry,
    pub key_len: u32,
}

impl EntryHeader {
    pub const fn serialized_len() -> usize {
        4 + 1 + 8 + 4 + 4
    }

    pub fn write(&self, mut buf: impl BufMut) {
        buf.put_u32(ENTRY_MAGIC);
        match self.expiry.deadline() {
            None => {
                buf.put_u8(EXPIRY_NEVER);
                buf.put_u64(0);
                buf.put_u32(0);
            }
            Some(at) => {
                let since = at.duration_since(UNIX_EPOCH).unwrap_or_default();
                buf.put_u8(EXPIRY_INSTANT);
                buf.put_u64(since.as_secs());
                buf.put_u32(since.subsec_nanos());
            }
        }
        buf.put_u32(self.key_len);
    }

    pub fn read(mut buf: impl Buf) -> Result<Self> {
        if buf.remaining() < Self::serialized_len() {
            return Err(Error::new(ErrorKind::MalformedAttributes, "entry header is truncated")
                .with_context("len", buf.remaining()));
        }

        let magic = buf.get_u32();
        if magic != ENTRY_MAGIC {
            return Err(Error::new(ErrorKind::MalformedAttributes, "entry header magic mismatch")
                .with_context("expected", ENTRY_MAGIC)
                .with_context("get", magic));
        }

        let tag = buf.get_u8();
        let secs = buf.get_u64();
        let nanos = buf.get_u32();
        let key_len = buf.get_u32();

        tracing::trace!("[disk store]: read entry header, expiry tag: {tag}, secs: {secs}, nanos: {nanos}, key len: {key_len}");

        let expiry = match tag {
            EXPIRY_NEVER => Expiry::Never,
            EXPIRY_INSTANT if nanos < 1_000_000_000 => UNIX_EPOCH
                .checked_add(Duration::new(secs, nanos))
                .map(Expiry::Instant)
                .ok_or_else(|| {
                    Error::new(ErrorKind::MalformedAttributes, "entry expiry out of range").with_context("secs", secs)
                })?,
            _ => {
                return Err(Error::new(ErrorKind::MalformedAttributes, "entry expiry is invalid")
                    .with_context("tag", tag)
                    .with_context("nanos", nanos))
            }
        };

        Ok(Self { expiry, key_len })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    #[test_log::test]
    fn test_entry_header_serde() {
        let header = EntryHeader {
            expiry: Expiry::Instant(UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789)),
            key_len: 42,
        };
        let mut buf = vec![];
        header.write(&mut buf);
        assert_eq!(buf.len(), EntryHeader::serialized_len());
        assert_eq!(EntryHeader::read(&buf[..]).unwrap(), header);

        let header = EntryHeader {
            expiry: Expiry::Never,
            key_len: 0,
        };
        let mut buf = vec![];
        header.write(&mut buf);
        assert_eq!(EntryHeader::read(&buf[..]).unwrap(), header);
    }

    #[test_log::test]
    fn test_entry_header_resolves_relative_expiry() {
        let anchor = SystemTime::now();
        let header = EntryHeader {
            expiry: Expiry::seconds_from(Duration::from_secs(60), anchor),
            key_len: 1,
        };
        let mut buf = vec![];
        header.write(&mut buf);
        let read = EntryHeader::read(&buf[..]).unwrap();
        assert_eq!(read.expiry.deadline(), Some(anchor + Duration::from_secs(60)));
    }

    #[test_log::test]
    fn test_entry_header_malformed() {
        let e = EntryHeader::read(&[0u8; 4][..]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MalformedAttributes);

        let e = EntryHeader::read(&[0u8; 21][..]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::MalformedAttributes);
        assert_eq!(e.message(), "entry header magic mismatch");

        let mut buf = vec![];
        EntryHeader {
            expiry: Expiry::Never,
            key_len: 0,
        }
        .write(&mut buf);
        buf[4] = 7;
        let e = EntryHeader::read(&buf[..]).unwrap_err();
        assert_eq!(e.message(), "entry expiry is invalid");
    }
}
