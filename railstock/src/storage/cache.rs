//! Session-scoped caches for the storage resolver.
//!
//! Archive contents on disk can change between editing sessions, so both
//! caches live in a [`SessionCache`] owned by the engine and cleared with
//! [`SessionCache::reset`] when a new session starts.
//!
//! Both maps are `DashMap`s: concurrent scan workers insert and read them
//! without a global lock, and archive opening is insert-or-get per path so
//! no two workers ever open the same archive.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};

use super::archive::{Archive, ArchiveReader};
use super::availability::Availability;

/// An archive that could not be opened this session.
#[derive(Debug, Clone, Error)]
#[error("cannot open archive {}: {reason}", .path.display())]
pub struct ArchiveOpenError {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Clone)]
enum ArchiveSlot {
    Opened(Arc<dyn Archive>),
    Unreadable(Arc<str>),
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCacheStats {
    /// Archive open attempts (successful or not) since the last reset.
    pub archive_opens: u64,
    /// Archives currently cached, including unreadable ones.
    pub cached_archives: usize,
    /// Availability results currently cached.
    pub cached_lookups: usize,
    pub lookup_hits: u64,
    pub lookup_misses: u64,
}

/// Archive-handle and availability caches for one editing session.
pub struct SessionCache {
    archives: DashMap<PathBuf, ArchiveSlot>,
    availability: DashMap<String, Availability>,
    archive_opens: AtomicU64,
    lookup_hits: AtomicU64,
    lookup_misses: AtomicU64,
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            archives: DashMap::new(),
            availability: DashMap::new(),
            archive_opens: AtomicU64::new(0),
            lookup_hits: AtomicU64::new(0),
            lookup_misses: AtomicU64::new(0),
        }
    }

    /// Get the cached archive, opening it on first use.
    ///
    /// Failures are cached too: an unreadable archive is attempted once per
    /// session.
    pub fn archive(
        &self,
        path: &Path,
        reader: &dyn ArchiveReader,
    ) -> Result<Arc<dyn Archive>, ArchiveOpenError> {
        let slot = match self.archives.get(path) {
            Some(slot) => slot.clone(),
            None => self
                .archives
                .entry(path.to_path_buf())
                .or_insert_with(|| self.open(path, reader))
                .clone(),
        };

        match slot {
            ArchiveSlot::Opened(archive) => Ok(archive),
            ArchiveSlot::Unreadable(reason) => Err(ArchiveOpenError {
                path: path.to_path_buf(),
                reason: reason.to_string(),
            }),
        }
    }

    fn open(&self, path: &Path, reader: &dyn ArchiveReader) -> ArchiveSlot {
        self.archive_opens.fetch_add(1, Ordering::Relaxed);
        match reader.open(path) {
            Ok(archive) => {
                debug!(
                    path = %path.display(),
                    entries = archive.entry_names().len(),
                    "Opened archive"
                );
                ArchiveSlot::Opened(archive)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open archive");
                ArchiveSlot::Unreadable(e.to_string().into())
            }
        }
    }

    /// Cached availability for a normalized relative path.
    pub fn availability(&self, key: &str) -> Option<Availability> {
        match self.availability.get(key) {
            Some(hit) => {
                self.lookup_hits.fetch_add(1, Ordering::Relaxed);
                Some(hit.clone())
            }
            None => {
                self.lookup_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store an availability result, keeping any result another worker
    /// stored first. Returns the cached value.
    pub fn remember(&self, key: String, availability: Availability) -> Availability {
        self.availability
            .entry(key)
            .or_insert(availability)
            .clone()
    }

    /// Drop every cached archive handle and availability result.
    pub fn reset(&self) {
        self.archives.clear();
        self.availability.clear();
        self.archive_opens.store(0, Ordering::Relaxed);
        self.lookup_hits.store(0, Ordering::Relaxed);
        self.lookup_misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionCacheStats {
        SessionCacheStats {
            archive_opens: self.archive_opens.load(Ordering::Relaxed),
            cached_archives: self.archives.len(),
            cached_lookups: self.availability.len(),
            lookup_hits: self.lookup_hits.load(Ordering::Relaxed),
            lookup_misses: self.lookup_misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::AssetLocation;
    use crate::test_support::{write_zip, CountingReader};
    use tempfile::TempDir;

    #[test]
    fn test_archive_opened_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Main.ap");
        write_zip(&path, &[("Loco.bin", b"x".as_slice())]);

        let cache = SessionCache::new();
        let reader = CountingReader::new();

        let first = cache.archive(&path, &reader).unwrap();
        let second = cache.archive(&path, &reader).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reader.opens(), 1);
        assert_eq!(cache.stats().archive_opens, 1);
    }

    #[test]
    fn test_unreadable_archive_is_not_retried() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Broken.ap");
        std::fs::write(&path, b"garbage").unwrap();

        let cache = SessionCache::new();
        let reader = CountingReader::new();

        assert!(cache.archive(&path, &reader).is_err());
        let err = cache.archive(&path, &reader).err().unwrap();
        assert_eq!(err.path, path);
        assert_eq!(reader.opens(), 1);
    }

    #[test]
    fn test_remember_keeps_first_value() {
        let cache = SessionCache::new();
        let first = Availability::new("a\\b\\c.bin", AssetLocation::NotFound);
        let second = Availability::new(
            "a\\b\\c.bin",
            AssetLocation::LooseFile(PathBuf::from("/x/a/b/c.bin")),
        );

        cache.remember("a\\b\\c.bin".to_string(), first.clone());
        let kept = cache.remember("a\\b\\c.bin".to_string(), second);

        assert_eq!(kept, first);
        assert_eq!(cache.availability("a\\b\\c.bin"), Some(first));
        assert_eq!(cache.availability("missing"), None);

        let stats = cache.stats();
        assert_eq!(stats.lookup_hits, 1);
        assert_eq!(stats.lookup_misses, 1);
        assert_eq!(stats.cached_lookups, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Main.ap");
        write_zip(&path, &[("Loco.bin", b"x".as_slice())]);

        let cache = SessionCache::new();
        let reader = CountingReader::new();
        cache.archive(&path, &reader).unwrap();
        cache.remember(
            "k".to_string(),
            Availability::new("k", AssetLocation::NotFound),
        );

        cache.reset();

        assert_eq!(cache.stats(), SessionCacheStats::default());
        cache.archive(&path, &reader).unwrap();
        assert_eq!(reader.opens(), 2);
    }
}
