//! Content-addressed memoization of pipeline results.
//!
//! A [`Fingerprint`] is a SHA-256 digest over the ordered file set (names and bytes). Any
//! change to a file's name, content, the set's membership or its order produces a different
//! fingerprint, so stale entries are never served.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use sha2::{Digest, Sha256};

use crate::types::DataSet;

use super::raw::RawFile;

/// Digest identifying an ordered set of input files.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint of `files` alone.
    pub fn of_files(files: &[RawFile]) -> Self {
        Self::of_files_tagged(files, "")
    }

    /// Fingerprint of `files` plus a tag describing decode options that change the result.
    pub fn of_files_tagged(files: &[RawFile], tag: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((tag.len() as u64).to_le_bytes());
        hasher.update(tag.as_bytes());
        hasher.update((files.len() as u64).to_le_bytes());
        for file in files {
            hasher.update((file.name.len() as u64).to_le_bytes());
            hasher.update(file.name.as_bytes());
            hasher.update((file.content.len() as u64).to_le_bytes());
            hasher.update(&file.content);
        }
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Storage for processed tables, keyed by input fingerprint.
///
/// Implementations must be safe to share between threads; concurrent callers may read and
/// write the same cache.
pub trait ProcessCache: Send + Sync {
    /// Look up a previously stored table.
    fn get(&self, key: &Fingerprint) -> Option<Arc<DataSet>>;

    /// Store a table, replacing any previous entry for `key`.
    fn insert(&self, key: Fingerprint, table: Arc<DataSet>);

    /// Remove one entry. Returns `true` if it was present.
    fn invalidate(&self, key: &Fingerprint) -> bool;

    /// Remove every entry.
    fn clear(&self);

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// `true` if nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local [`ProcessCache`] guarded by a reader/writer lock.
///
/// Entries live until removed: there is no size bound and no eviction policy. Callers that
/// process many distinct file sets own eviction through [`ProcessCache::invalidate`] and
/// [`ProcessCache::clear`].
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<Fingerprint, Arc<DataSet>>>,
}

impl InMemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are immutable `Arc`s, so a panic while holding the lock cannot leave the map
    // half-updated; recover from poisoning instead of propagating it.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Fingerprint, Arc<DataSet>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Fingerprint, Arc<DataSet>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("entries_len", &self.len())
            .finish()
    }
}

impl ProcessCache for InMemoryCache {
    fn get(&self, key: &Fingerprint) -> Option<Arc<DataSet>> {
        self.read().get(key).cloned()
    }

    fn insert(&self, key: Fingerprint, table: Arc<DataSet>) {
        self.write().insert(key, table);
    }

    fn invalidate(&self, key: &Fingerprint) -> bool {
        self.write().remove(key).is_some()
    }

    fn clear(&self) {
        self.write().clear();
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
