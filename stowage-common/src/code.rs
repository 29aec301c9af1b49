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

use std::{any::type_name, fmt::Debug, hash::Hasher, marker::PhantomData, sync::Arc};

use bytes::{Buf, BufMut};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use twox_hash::XxHash64;

use crate::error::{Error, ErrorKind, Result};

/// Encode an object into bytes and decode it back.
///
/// A transformer is created once when a store is built and shared by every operation of that store.
pub trait Transformer<T>: Send + Sync + 'static {
    /// Encode the object into bytes.
    fn encode(&self, object: &T) -> Result<Vec<u8>>;

    /// Decode the object from bytes.
    fn decode(&self, buf: &[u8]) -> Result<T>;
}

impl<T, TR> Transformer<T> for Arc<TR>
where
    TR: Transformer<T> + ?Sized,
{
    fn encode(&self, object: &T) -> Result<Vec<u8>> {
        self.as_ref().encode(object)
    }

    fn decode(&self, buf: &[u8]) -> Result<T> {
        self.as_ref().decode(buf)
    }
}

/// Estimate the memory weight of an object.
pub trait Weighter<T>: Fn(&T) -> usize + Send + Sync + 'static {}
impl<T, F> Weighter<T> for F where F: Fn(&T) -> usize + Send + Sync + 'static {}

/// Weigh objects by the length of their encoded form.
///
/// Falls back to `size_of::<T>()` if the object cannot be encoded.
pub fn encoded_weighter<T: 'static>(transformer: Arc<dyn Transformer<T>>) -> impl Weighter<T> {
    move |object: &T| match transformer.encode(object) {
        Ok(buf) => buf.len(),
        Err(e) => {
            tracing::warn!("[weighter]: weigh by encoded length failed, fallback to type size, error: {e}");
            std::mem::size_of::<T>()
        }
    }
}

/// xxHash64 checksums over byte slices.
#[derive(Debug)]
pub struct Checksummer;

impl Checksummer {
    /// Checksum with seed `0`.
    pub fn checksum64(buf: &[u8]) -> u64 {
        Self::checksum64_with_seed(buf, 0)
    }

    /// Checksum with the given seed.
    pub fn checksum64_with_seed(buf: &[u8], seed: u64) -> u64 {
        let mut hasher = XxHash64::with_seed(seed);
        hasher.write(buf);
        hasher.finish()
    }
}

/// Plain binary transformer backed by `bincode`.
pub struct BincodeTransformer<T>(PhantomData<fn() -> T>);

impl<T> Debug for BincodeTransformer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BincodeTransformer").field(&type_name::<T>()).finish()
    }
}

impl<T> Default for BincodeTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BincodeTransformer<T> {
    /// Create a bincode transformer.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Transformer<T> for BincodeTransformer<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, object: &T) -> Result<Vec<u8>> {
        bincode::serialize(object).map_err(Error::encoding)
    }

    fn decode(&self, buf: &[u8]) -> Result<T> {
        bincode::deserialize(buf).map_err(Error::decoding)
    }
}

#[derive(Serialize)]
struct WrapperRef<'a, T> {
    object: &'a T,
}

#[derive(Deserialize)]
struct Wrapper<T> {
    object: T,
}

/// Human readable transformer backed by `serde_json`.
///
/// The object is wrapped as `{"object": ...}` so scalar values are valid documents.
pub struct JsonTransformer<T>(PhantomData<fn() -> T>);

impl<T> Debug for JsonTransformer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("JsonTransformer").field(&type_name::<T>()).finish()
    }
}

impl<T> Default for JsonTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonTransformer<T> {
    /// Create a json transformer.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Transformer<T> for JsonTransformer<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, object: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(&WrapperRef { object }).map_err(Error::encoding)
    }

    fn decode(&self, buf: &[u8]) -> Result<T> {
        serde_json::from_slice::<Wrapper<T>>(buf)
            .map(|wrapper| wrapper.object)
            .map_err(Error::decoding)
    }
}

const SEALED_MAGIC: u32 = 0x57_0A_6E_01;

/// Secure transformer.
///
/// The bincode payload is sealed with a header carrying a magic, a tag of the stored type, the payload length and an
/// xxHash64 checksum. Decoding refuses any buffer that was not sealed by a transformer of the same type, and any
/// buffer whose payload was altered.
pub struct SealedTransformer<T> {
    type_tag: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Debug for SealedTransformer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedTransformer")
            .field("type", &type_name::<T>())
            .field("type_tag", &self.type_tag)
            .finish()
    }
}

impl<T> Default for SealedTransformer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SealedTransformer<T> {
    const HEADER_LEN: usize = 4 + 8 + 4 + 8;

    /// Create a sealed transformer.
    pub fn new() -> Self {
        Self {
            type_tag: Checksummer::checksum64(type_name::<T>().as_bytes()),
            _marker: PhantomData,
        }
    }
}

impl<T> Transformer<T> for SealedTransformer<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn encode(&self, object: &T) -> Result<Vec<u8>> {
        let payload = bincode::serialize(object).map_err(Error::encoding)?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            Error::new(ErrorKind::Encoding, "payload too large to seal").with_context("len", payload.len())
        })?;

        let mut buf = Vec::with_capacity(Self::HEADER_LEN + payload.len());
        buf.put_u32(SEALED_MAGIC);
        buf.put_u64(self.type_tag);
        buf.put_u32(len);
        buf.put_u64(Checksummer::checksum64(&payload));
        buf.put_slice(&payload);
        Ok(buf)
    }

    fn decode(&self, mut buf: &[u8]) -> Result<T> {
        if buf.len() < Self::HEADER_LEN {
            return Err(Error::new(ErrorKind::Decoding, "sealed buffer is truncated").with_context("len", buf.len()));
        }

        let magic = buf.get_u32();
        if magic != SEALED_MAGIC {
            return Err(Error::new(ErrorKind::Decoding, "sealed buffer magic mismatch")
                .with_context("expected", SEALED_MAGIC)
                .with_context("get", magic));
        }

        let type_tag = buf.get_u64();
        if type_tag != self.type_tag {
            return Err(Error::new(ErrorKind::Decoding, "sealed buffer holds another type")
                .with_context("expected", type_name::<T>()));
        }

        let len = buf.get_u32() as usize;
        let checksum = buf.get_u64();
        if buf.len() != len {
            return Err(Error::new(ErrorKind::Decoding, "sealed payload length mismatch")
                .with_context("expected", len)
                .with_context("get", buf.len()));
        }

        let get = Checksummer::checksum64(buf);
        if get != checksum {
            return Err(Error::new(ErrorKind::Decoding, "sealed payload checksum mismatch")
                .with_context("expected", checksum)
                .with_context("get", get));
        }

        bincode::deserialize(buf).map_err(Error::decoding)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        url: String,
        status: u16,
        headers: BTreeMap<String, String>,
        data: Vec<u8>,
    }

    fn payload() -> Payload {
        Payload {
            url: "https://res.example.com/image/upload/sample.jpg".to_string(),
            status: 200,
            headers: [("ETag".to_string(), "\"abc\"".to_string())].into_iter().collect(),
            data: vec![0xff, 0xd8, 0xff, 0xe0, 0, 1, 2, 3],
        }
    }

    fn check_round_trip(transformer: &dyn Transformer<Payload>) {
        let object = payload();
        let buf = transformer.encode(&object).unwrap();
        assert_eq!(transformer.decode(&buf).unwrap(), object);
    }

    #[test_log::test]
    fn test_round_trip() {
        check_round_trip(&BincodeTransformer::<Payload>::new());
        check_round_trip(&JsonTransformer::<Payload>::new());
        check_round_trip(&SealedTransformer::<Payload>::new());
    }

    #[test_log::test]
    fn test_json_wraps_object() {
        let transformer = JsonTransformer::<u64>::new();
        let buf = transformer.encode(&42).unwrap();
        assert_eq!(std::str::from_utf8(&buf).unwrap(), r#"{"object":42}"#);
        assert_eq!(transformer.decode(br#"{"object":7}"#).unwrap(), 7);
        assert_eq!(transformer.decode(b"7").unwrap_err().kind(), ErrorKind::Decoding);
    }

    #[test_log::test]
    fn test_bincode_rejects_garbage() {
        let transformer = BincodeTransformer::<Payload>::new();
        let e = transformer.decode(&[1, 2, 3]).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decoding);
    }

    #[test_log::test]
    fn test_sealed_rejects_tampering() {
        let transformer = SealedTransformer::<Payload>::new();
        let mut buf = transformer.encode(&payload()).unwrap();

        let last = buf.len() - 1;
        buf[last] ^= 0x01;
        let e = transformer.decode(&buf).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Decoding);
        assert_eq!(e.message(), "sealed payload checksum mismatch");

        let e = transformer.decode(&buf[..10]).unwrap_err();
        assert_eq!(e.message(), "sealed buffer is truncated");
    }

    #[test_log::test]
    fn test_sealed_rejects_plain_and_foreign_buffers() {
        let sealed = SealedTransformer::<Payload>::new();

        let plain = BincodeTransformer::<Payload>::new().encode(&payload()).unwrap();
        assert_eq!(sealed.decode(&plain).unwrap_err().kind(), ErrorKind::Decoding);

        let foreign = SealedTransformer::<String>::new().encode(&"text".to_string()).unwrap();
        let e = sealed.decode(&foreign).unwrap_err();
        assert_eq!(e.message(), "sealed buffer holds another type");
    }

    #[test_log::test]
    fn test_encoded_weighter() {
        let transformer: Arc<dyn Transformer<Vec<u8>>> = Arc::new(BincodeTransformer::<Vec<u8>>::new());
        let weighter = encoded_weighter(transformer);
        // bincode prefixes sequences with a u64 length.
        assert_eq!(weighter(&vec![0u8; 100]), 108);
    }
}
