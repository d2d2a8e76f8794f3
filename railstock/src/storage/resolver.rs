//! Overlay resolution across loose files and archive containers.
//!
//! A storage-relative path is satisfied, in order, by:
//!
//! 1. a loose file at `root/<path>`;
//! 2. an archive in the asset's own directory holding an entry named like
//!    the final path segment;
//! 3. an archive in each ancestor directory up to the root, holding an entry
//!    at the remaining relative path (archives usually sit at the
//!    `Provider/Product` level).
//!
//! Within one directory archives are tried in file-name order and the first
//! match wins. Which archive wins when several hold the same entry is not
//! part of the contract.
//!
//! Archive entries are extracted into a subdirectory of the configured temp
//! directory that belongs to one resolver. Clearing and dropping the resolver
//! only ever remove that subdirectory.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, trace};

use super::archive::{Archive, ArchiveReader};
use super::availability::{AssetLocation, Availability, LocationHint};
use super::cache::{ArchiveOpenError, SessionCache};
use crate::config::EngineConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::identity::{normalize_asset_path, split_segments};

/// Disambiguates temp names when two workers draw the same random suffix.
static EXTRACTION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Gives each resolver in the process its own extraction directory.
static RESOLVER_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Locates and reads raw resources from the two-tier storage.
pub struct StorageResolver {
    root: PathBuf,
    archive_extension: String,
    temp_dir: PathBuf,
    instance: u64,
    cache: Arc<SessionCache>,
    reader: Arc<dyn ArchiveReader>,
}

impl StorageResolver {
    /// Create a resolver over `root` with default extension and temp dir.
    pub fn new(
        root: impl Into<PathBuf>,
        cache: Arc<SessionCache>,
        reader: Arc<dyn ArchiveReader>,
    ) -> Self {
        Self {
            root: root.into(),
            archive_extension: crate::config::DEFAULT_ARCHIVE_EXTENSION.to_string(),
            temp_dir: crate::config::default_temp_dir(),
            instance: RESOLVER_SEQUENCE.fetch_add(1, Ordering::Relaxed),
            cache,
            reader,
        }
    }

    /// Create a resolver from engine configuration.
    pub fn from_config(
        config: &EngineConfig,
        cache: Arc<SessionCache>,
        reader: Arc<dyn ArchiveReader>,
    ) -> Self {
        Self::new(config.assets_root.clone(), cache, reader)
            .with_archive_extension(config.archive_extension.clone())
            .with_temp_dir(config.temp_dir.clone())
    }

    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        self.archive_extension = extension.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configured parent of the extraction directory.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// The directory this resolver extracts into and owns.
    pub fn extraction_dir(&self) -> PathBuf {
        self.temp_dir.join(format!("extract-{}-{}", std::process::id(), self.instance))
    }

    pub fn archive_extension(&self) -> &str {
        &self.archive_extension
    }

    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    /// Open an archive through the session cache.
    pub fn open_archive(&self, path: &Path) -> Result<Arc<dyn Archive>, ArchiveOpenError> {
        self.cache.archive(path, self.reader.as_ref())
    }

    /// Decide where `relative_path` is satisfied from.
    ///
    /// Never fails: absence is reported as [`AssetLocation::NotFound`].
    /// Lookups without a hint are cached for the session.
    pub fn locate(&self, relative_path: &str, hint: &LocationHint) -> Availability {
        let normalized = normalize_asset_path(relative_path);

        match hint {
            LocationHint::InArchive {
                archive_path,
                entry,
            } => {
                return Availability::new(
                    normalized,
                    AssetLocation::InArchive {
                        archive_path: archive_path.clone(),
                        entry: entry.clone(),
                    },
                );
            }
            LocationHint::LooseFile => {
                let path = self.loose_path(&normalized);
                let location = if !normalized.is_empty() && path.is_file() {
                    AssetLocation::LooseFile(path)
                } else {
                    AssetLocation::NotFound
                };
                return Availability::new(normalized, location);
            }
            LocationHint::Unknown => {}
        }

        if let Some(cached) = self.cache.availability(&normalized) {
            return cached;
        }

        let location = self.lookup(&normalized);
        trace!(path = %normalized, location = %location, "Located asset");
        self.cache
            .remember(normalized.clone(), Availability::new(normalized, location))
    }

    fn lookup(&self, normalized: &str) -> AssetLocation {
        let segments: Vec<&str> = split_segments(normalized).collect();
        if segments.is_empty() {
            return AssetLocation::NotFound;
        }

        let loose = self.loose_path(normalized);
        if loose.is_file() {
            return AssetLocation::LooseFile(loose);
        }

        // Nearest directory first, then each ancestor up to the root.
        for depth in (0..segments.len()).rev() {
            let dir = segments[..depth]
                .iter()
                .fold(self.root.clone(), |dir, segment| dir.join(segment));
            let remainder = segments[depth..].join("/");

            for archive_path in self.archives_in(&dir) {
                let archive = match self.open_archive(&archive_path) {
                    Ok(archive) => archive,
                    Err(e) => {
                        trace!(error = %e, "Skipping unreadable archive");
                        continue;
                    }
                };
                if let Some(entry) = archive.find_entry(&remainder) {
                    return AssetLocation::InArchive {
                        archive_path,
                        entry: entry.to_string(),
                    };
                }
            }
        }

        AssetLocation::NotFound
    }

    /// Archive files directly inside `dir`, sorted by name.
    pub fn archives_in(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(dir) else {
            return Vec::new();
        };

        let mut archives: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && has_extension(path, &self.archive_extension))
            .collect();
        archives.sort();
        archives
    }

    /// Read the bytes of a located resource.
    ///
    /// Archive entries are extracted to a uniquely named temp file which is
    /// removed again on every path, including failures.
    pub fn extract(&self, availability: &Availability) -> ResolveResult<Vec<u8>> {
        let path = availability.relative_path();
        let failure = |source: io::Error| ResolveError::ExtractionFailure {
            path: path.to_string(),
            source,
        };

        match availability.location() {
            AssetLocation::NotFound => Err(ResolveError::NotFound {
                path: path.to_string(),
            }),
            AssetLocation::LooseFile(file) => fs::read(file).map_err(failure),
            AssetLocation::InArchive {
                archive_path,
                entry,
            } => {
                let archive = self
                    .open_archive(archive_path)
                    .map_err(|e| failure(io::Error::other(e)))?;
                self.extract_entry(archive.as_ref(), entry).map_err(failure)
            }
        }
    }

    fn extract_entry(&self, archive: &dyn Archive, entry: &str) -> io::Result<Vec<u8>> {
        let (extraction, file) = TempExtraction::create(&self.extraction_dir(), entry)?;
        {
            let mut writer = BufWriter::new(file);
            archive.extract_to(entry, &mut writer)?;
            writer.flush()?;
        }
        debug!(
            entry,
            archive = %archive.path().display(),
            temp = %extraction.path.display(),
            "Extracted archive entry"
        );
        fs::read(&extraction.path)
    }

    /// Remove leftover extraction files.
    ///
    /// Only this resolver's own extraction directory is removed; anything
    /// else under the configured temp directory is left alone.
    pub fn clear_temp_dir(&self) -> io::Result<()> {
        match fs::remove_dir_all(self.extraction_dir()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Convert a path under the root into a storage-relative asset path.
    ///
    /// Returns an empty string for the root itself and `None` for paths
    /// outside it.
    pub fn relative_to_root(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        Some(segments.join("\\"))
    }

    fn loose_path(&self, normalized: &str) -> PathBuf {
        split_segments(normalized).fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl Drop for StorageResolver {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(self.extraction_dir());
    }
}

/// Case-insensitive extension check.
pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// A temp extraction file, removed when dropped.
struct TempExtraction {
    path: PathBuf,
}

impl TempExtraction {
    fn create(dir: &Path, entry: &str) -> io::Result<(Self, File)> {
        fs::create_dir_all(dir)?;

        let name = entry.rsplit(['/', '\\']).next().unwrap_or(entry);
        let (stem, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot + 1..]),
            _ => (name, "bin"),
        };
        let suffix: u32 = rand::rng().random_range(10_000..100_000);
        let sequence = EXTRACTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{stem}-{suffix}-{sequence}.{extension}"));

        match fs::remove_file(&path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }

        let extraction = Self { path };
        let file = File::create(&extraction.path)?;
        Ok((extraction, file))
    }
}

impl Drop for TempExtraction {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
