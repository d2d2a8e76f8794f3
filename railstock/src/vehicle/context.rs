use std::path::PathBuf;

use crate::storage::LocationHint;

/// Per-call hints for resolving one vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionContext {
    hint: LocationHint,
    accept_reskin: bool,
}

impl ResolutionContext {
    /// No location hint, reskins accepted.
    pub fn new() -> Self {
        Self {
            hint: LocationHint::Unknown,
            accept_reskin: true,
        }
    }

    /// The bin is known to be a loose file.
    pub fn loose_file() -> Self {
        Self {
            hint: LocationHint::LooseFile,
            ..Self::new()
        }
    }

    /// The bin is known to be `entry` inside `archive_path`.
    pub fn in_archive(archive_path: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            hint: LocationHint::InArchive {
                archive_path: archive_path.into(),
                entry: entry.into(),
            },
            ..Self::new()
        }
    }

    /// Forbid reskins, cutting indirection chains at one hop.
    pub fn rejecting_reskins(mut self) -> Self {
        self.accept_reskin = false;
        self
    }

    pub fn hint(&self) -> &LocationHint {
        &self.hint
    }

    pub fn accept_reskin(&self) -> bool {
        self.accept_reskin
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}
