//! Outcomes of locating a resource in the overlay.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    /// A loose override file on disk.
    LooseFile(PathBuf),

    /// An entry inside an archive container.
    InArchive { archive_path: PathBuf, entry: String },

    /// Absent from every tier.
    NotFound,
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLocation::LooseFile(path) => write!(f, "loose file {}", path.display()),
            AssetLocation::InArchive {
                archive_path,
                entry,
            } => write!(f, "{} in {}", entry, archive_path.display()),
            AssetLocation::NotFound => write!(f, "not found"),
        }
    }
}

/// Result of locating one storage-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    relative_path: String,
    location: AssetLocation,
}

impl Availability {
    pub fn new(relative_path: impl Into<String>, location: AssetLocation) -> Self {
        Self {
            relative_path: relative_path.into(),
            location,
        }
    }

    /// The normalized storage-relative path that was looked up.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn location(&self) -> &AssetLocation {
        &self.location
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.location, AssetLocation::NotFound)
    }

    pub fn is_loose_file(&self) -> bool {
        matches!(self.location, AssetLocation::LooseFile(_))
    }

    pub fn is_in_archive(&self) -> bool {
        matches!(self.location, AssetLocation::InArchive { .. })
    }

    /// Archive holding the resource, if it is inside one.
    pub fn archive_path(&self) -> Option<&Path> {
        match &self.location {
            AssetLocation::InArchive { archive_path, .. } => Some(archive_path),
            _ => None,
        }
    }

    /// Entry name inside the archive, if the resource is inside one.
    pub fn entry_name(&self) -> Option<&str> {
        match &self.location {
            AssetLocation::InArchive { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

/// What the caller already knows about a resource's location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocationHint {
    /// Nothing known; run the full overlay lookup.
    #[default]
    Unknown,

    /// The resource is a loose file; archives are not consulted.
    LooseFile,

    /// The resource is this archive entry; trusted without re-scanning.
    InArchive { archive_path: PathBuf, entry: String },
}
