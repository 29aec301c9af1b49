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

use std::{
    fmt::Debug,
    fs::{self, File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use itertools::Itertools;
use parking_lot::Mutex;
use stowage_common::{
    code::{Checksummer, Transformer},
    entry::Entry,
    error::{Error, ErrorKind, Result},
    expiry::Expiry,
    store::{DiskBacked, Store},
};

use crate::{
    config::{DiskConfig, ProtectionLevel},
    serde::EntryHeader,
};

const PARTIAL_PREFIX: char = '.';
const PARTIAL_SUFFIX: &str = ".partial";

const DIR_MODE: u32 = 0o700;
const FILE_MODE: u32 = 0o600;

#[derive(Debug)]
struct FileMeta {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

/// A disk tier that stores one file per entry in a namespace directory.
///
/// Each file holds an [`EntryHeader`], the key and the encoded object. The modification time of each file is set to
/// the expiry boundary of its entry.
///
/// The store assumes it is the only writer of its namespace directory.
pub struct DiskStore<T> {
    dir: PathBuf,
    config: DiskConfig,
    transformer: Arc<dyn Transformer<T>>,

    /// Bytes of all entry files. Writers hold the lock for the whole file operation.
    usage: Mutex<u64>,
}

impl<T> Debug for DiskStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStore")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .field("usage", &*self.usage.lock())
            .finish()
    }
}

impl<T: 'static> DiskStore<T> {
    /// Open the namespace directory of the config, creating it if absent.
    pub fn open(config: DiskConfig, transformer: Arc<dyn Transformer<T>>) -> Result<Self> {
        let dir = config.dir();
        fs::create_dir_all(&dir).map_err(|e| Error::io_error(e).with_context("dir", dir.display()))?;
        protect(&dir, config.protection, DIR_MODE)?;

        clean_partial_files(&dir)?;
        let usage = scan(&dir)?.iter().map(|file| file.len).sum();

        tracing::info!(
            "[disk store]: open namespace {} at {}, usage: {usage} bytes, capacity: {} bytes",
            config.name,
            dir.display(),
            config.max_size
        );

        Ok(Self {
            dir,
            config,
            transformer,
            usage: Mutex::new(usage),
        })
    }

    /// The namespace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The config of the store.
    pub fn config(&self) -> &DiskConfig {
        &self.config
    }

    /// The path of the entry file of the key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }

    fn write_file(&self, path: &Path, buf: &[u8], modified: SystemTime) -> Result<()> {
        let Some(name) = path.file_name() else {
            return Err(Error::new(ErrorKind::Io, "entry path has no file name").with_context("path", path.display()));
        };
        let partial = self
            .dir
            .join(format!("{PARTIAL_PREFIX}{}{PARTIAL_SUFFIX}", name.to_string_lossy()));

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&partial)?;
        file.write_all(buf)?;
        file.set_modified(modified)?;
        drop(file);

        protect(&partial, self.config.protection, FILE_MODE)?;
        fs::rename(&partial, path)?;
        Ok(())
    }

    /// Evict files in ascending modification time until the usage fits the capacity.
    fn evict(&self, usage: &mut u64) -> Result<()> {
        let files = scan(&self.dir)?;
        *usage = files.iter().map(|file| file.len).sum();

        let mut evicted = 0;
        for file in files.into_iter().sorted_by_key(|file| file.modified) {
            if *usage <= self.config.max_size {
                break;
            }
            remove_file_if_exists(&file.path)?;
            *usage = usage.saturating_sub(file.len);
            evicted += 1;
        }

        tracing::debug!(
            "[disk store]: evicted {evicted} files, usage: {usage} bytes, capacity: {} bytes",
            self.config.max_size
        );
        Ok(())
    }

    /// Remove every file the predicate selects. The usage becomes the total length of the kept files.
    fn sweep(&self, mut select: impl FnMut(&FileMeta) -> bool) -> Result<usize> {
        let mut usage = self.usage.lock();
        let mut removed = 0;
        let mut kept = 0;
        for file in scan(&self.dir)? {
            if select(&file) {
                remove_file_if_exists(&file.path)?;
                removed += 1;
            } else {
                kept += file.len;
            }
        }
        *usage = kept;
        Ok(removed)
    }

    /// Read the header of the entry file of the key without decoding the object.
    fn read_expiry(&self, key: &str) -> Result<(Expiry, u64)> {
        let buf = fs::read(self.path(key)).map_err(|e| Error::io_error(e).with_context("key", key))?;
        let (expiry, _) = unseal(&buf, key)?;
        Ok((expiry, buf.len() as u64))
    }
}

impl<T> Store<T> for DiskStore<T>
where
    T: Send + Sync + 'static,
{
    fn entry(&self, key: &str) -> Result<Entry<T>> {
        let buf = fs::read(self.path(key)).map_err(|e| Error::io_error(e).with_context("key", key))?;
        let (expiry, payload) = unseal(&buf, key)?;
        let object = self
            .transformer
            .decode(payload)
            .map_err(|e| e.with_context("key", key))?;
        Ok(Entry::new(object, expiry, buf.len()))
    }

    fn set_object(&self, object: T, key: &str, expiry: Option<Expiry>) -> Result<()> {
        let expiry = expiry.unwrap_or(self.config.expiry).resolve();
        let payload = self.transformer.encode(&object)?;
        let key_len = u32::try_from(key.len())
            .map_err(|_| Error::new(ErrorKind::Encoding, "key is too long").with_context("len", key.len()))?;

        let mut buf = Vec::with_capacity(EntryHeader::serialized_len() + key.len() + payload.len());
        EntryHeader { expiry, key_len }.write(&mut buf);
        buf.extend_from_slice(key.as_bytes());
        buf.extend_from_slice(&payload);

        let path = self.path(key);
        let mut usage = self.usage.lock();
        let replaced = match fs::metadata(&path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        self.write_file(&path, &buf, expiry.date())
            .map_err(|e| e.with_context("key", key))?;
        *usage = usage.saturating_sub(replaced) + buf.len() as u64;

        tracing::trace!(
            "[disk store]: write entry, key: {key}, file: {}, len: {}",
            path.display(),
            buf.len()
        );

        if self.config.max_size > 0 && *usage > self.config.max_size {
            self.evict(&mut usage)?;
        }
        Ok(())
    }

    fn remove_object(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        let mut usage = self.usage.lock();
        let len = fs::metadata(&path)
            .map_err(|e| Error::io_error(e).with_context("key", key))?
            .len();
        fs::remove_file(&path).map_err(|e| Error::io_error(e).with_context("key", key))?;
        *usage = usage.saturating_sub(len);
        Ok(())
    }

    fn is_expired_object(&self, key: &str) -> bool {
        match self.read_expiry(key) {
            Ok((expiry, _)) => expiry.is_expired(),
            Err(_) => true,
        }
    }

    fn remove_all(&self) -> Result<()> {
        let mut usage = self.usage.lock();
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&self.dir)?;
        protect(&self.dir, self.config.protection, DIR_MODE)?;
        *usage = 0;
        Ok(())
    }

    fn remove_expired_objects(&self) -> Result<()> {
        let now = SystemTime::now();
        let removed = self.sweep(|file| match read_header(&file.path) {
            Ok(header) => header.expiry.is_expired_at(now),
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                tracing::warn!(
                    "[disk store]: remove unreadable entry file {}, error: {e}",
                    file.path.display()
                );
                true
            }
        })?;
        tracing::debug!("[disk store]: removed {removed} expired entries");
        Ok(())
    }

    fn remove_stored_objects_since(&self, date: SystemTime) -> Result<()> {
        let removed = self.sweep(|file| file.modified >= date)?;
        tracing::debug!("[disk store]: removed {removed} entries stored since {date:?}");
        Ok(())
    }

    fn remove_object_if_expired(&self, key: &str) -> Result<()> {
        let mut usage = self.usage.lock();
        let (expiry, len) = match self.read_expiry(key) {
            Ok(v) => v,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        if expiry.is_expired() {
            remove_file_if_exists(&self.path(key))?;
            *usage = usage.saturating_sub(len);
        }
        Ok(())
    }
}

impl<T> DiskBacked for DiskStore<T> {
    fn disk_capacity(&self) -> u64 {
        self.config.max_size
    }

    fn current_disk_usage(&self) -> u64 {
        *self.usage.lock()
    }
}

/// 128-bit hex digest of the key, followed by the extension of the key's path if it has a short alphanumeric one.
fn file_name(key: &str) -> String {
    let hi = Checksummer::checksum64_with_seed(key.as_bytes(), 0);
    let lo = Checksummer::checksum64_with_seed(key.as_bytes(), 1);
    match extension(key) {
        Some(ext) => format!("{hi:016x}{lo:016x}.{ext}"),
        None => format!("{hi:016x}{lo:016x}"),
    }
}

fn extension(key: &str) -> Option<&str> {
    let path = match key.split_once("://") {
        Some((_, rest)) => rest.split_once('/')?.1,
        None => key,
    };
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or(path);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = segment.rsplit_once('.')?;
    let valid = !stem.is_empty() && !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}

/// Split an entry file into its expiry and payload, checking that it belongs to the key.
fn unseal<'a>(buf: &'a [u8], key: &str) -> Result<(Expiry, &'a [u8])> {
    let header = EntryHeader::read(buf).map_err(|e| e.with_context("key", key))?;
    let rest = &buf[EntryHeader::serialized_len()..];
    let key_len = header.key_len as usize;
    if rest.len() < key_len {
        return Err(Error::new(ErrorKind::MalformedAttributes, "entry key is truncated")
            .with_context("key", key)
            .with_context("key_len", key_len));
    }

    let (stored, payload) = rest.split_at(key_len);
    if stored != key.as_bytes() {
        // Digest collision with another key.
        return Err(Error::not_found(key).with_context("stored", String::from_utf8_lossy(stored)));
    }
    Ok((header.expiry, payload))
}

fn read_header(path: &Path) -> Result<EntryHeader> {
    let mut buf = [0u8; EntryHeader::serialized_len()];
    let mut file = File::open(path)?;
    match file.read_exact(&mut buf) {
        Ok(()) => EntryHeader::read(&buf[..]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(Error::new(ErrorKind::MalformedAttributes, "entry header is truncated")
                .with_context("path", path.display()))
        }
        Err(e) => Err(e.into()),
    }
}

fn is_partial(name: &str) -> bool {
    name.starts_with(PARTIAL_PREFIX)
}

fn scan(dir: &Path) -> Result<Vec<FileMeta>> {
    let mut files = vec![];
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if is_partial(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            continue;
        }
        files.push(FileMeta {
            path: entry.path(),
            len: metadata.len(),
            modified: metadata.modified()?,
        });
    }
    Ok(files)
}

fn clean_partial_files(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if is_partial(&name) && name.ends_with(PARTIAL_SUFFIX) {
            tracing::debug!("[disk store]: remove partial file {name}");
            remove_file_if_exists(&entry.path())?;
        }
    }
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn protect(path: &Path, protection: ProtectionLevel, mode: u32) -> Result<()> {
    match protection {
        ProtectionLevel::Inherit => Ok(()),
        #[cfg(unix)]
        ProtectionLevel::OwnerOnly => {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(mode))
                .map_err(|e| Error::io_error(e).with_context("path", path.display()))
        }
        #[cfg(not(unix))]
        ProtectionLevel::OwnerOnly => {
            let _ = (path, mode);
            Ok(())
        }
    }
}
