//! Archive containers that augment the loose-file tier.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use zip::result::ZipError;
use zip::ZipArchive;

/// An opened archive container.
pub trait Archive: Send + Sync {
    /// Path of the archive file.
    fn path(&self) -> &Path;

    /// Names of all file entries, in archive order.
    fn entry_names(&self) -> &[String];

    /// Stream one entry into `writer`, returning the bytes written.
    fn extract_to(&self, entry: &str, writer: &mut dyn Write) -> io::Result<u64>;

    /// Find the entry stored under `relative`.
    ///
    /// Separators are unified and the comparison ignores ASCII case.
    fn find_entry(&self, relative: &str) -> Option<&str> {
        self.entry_names()
            .iter()
            .find(|name| entry_name_matches(name, relative))
            .map(String::as_str)
    }
}

/// Opens archive containers.
///
/// The storage resolver opens each archive at most once per session through
/// this trait, so implementations need not cache.
pub trait ArchiveReader: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Arc<dyn Archive>>;
}

/// Compare an archive entry name against a relative asset path.
pub fn entry_name_matches(entry: &str, relative: &str) -> bool {
    fn unify(c: char) -> char {
        if c == '\\' {
            '/'
        } else {
            c.to_ascii_lowercase()
        }
    }

    let entry = entry.trim_start_matches(['/', '\\']);
    let relative = relative.trim_start_matches(['/', '\\']);
    entry.len() == relative.len() && entry.chars().map(unify).eq(relative.chars().map(unify))
}

/// Reads zip-format archive containers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveReader;

impl ZipArchiveReader {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveReader for ZipArchiveReader {
    fn open(&self, path: &Path) -> io::Result<Arc<dyn Archive>> {
        Ok(Arc::new(ZipContainer::open(path)?))
    }
}

/// A zip archive with its entry listing read up front.
pub struct ZipContainer {
    path: PathBuf,
    names: Vec<String>,
    archive: Mutex<ZipArchive<BufReader<File>>>,
}

impl ZipContainer {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(zip_error)?;
        let names = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            names,
            archive: Mutex::new(archive),
        })
    }
}

impl Archive for ZipContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn entry_names(&self) -> &[String] {
        &self.names
    }

    fn extract_to(&self, entry: &str, writer: &mut dyn Write) -> io::Result<u64> {
        let mut archive = self.archive.lock();
        let mut file = archive.by_name(entry).map_err(zip_error)?;
        io::copy(&mut file, writer)
    }
}

fn zip_error(err: ZipError) -> io::Error {
    match err {
        ZipError::Io(e) => e,
        ZipError::FileNotFound => {
            io::Error::new(io::ErrorKind::NotFound, "entry not found in archive")
        }
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
