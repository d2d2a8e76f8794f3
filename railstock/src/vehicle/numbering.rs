//! Running-number candidate lists.
//!
//! Leaf blueprints may reference a CSV resource under
//! `NumberingList/cCSVContainer/CsvFile`. Loading it is best effort: every
//! failure is a [`NumberingError`] which the resolver turns into an empty
//! list.

use std::sync::Arc;

use thiserror::Error;

use crate::identity::{change_extension, normalize_asset_path};
use crate::storage::{LocationHint, StorageResolver};

/// Extension of a numbering list's binary form.
const NUMBERING_BINARY_EXTENSION: &str = "dcsv";

/// A numbering list that could not be loaded.
#[derive(Debug, Error)]
pub enum NumberingError {
    #[error("numbering list {0} not found")]
    NotFound(String),

    #[error("cannot read numbering list {reference}: {reason}")]
    Read { reference: String, reason: String },
}

/// Loads the running-number candidates a blueprint references.
pub trait NumberingListLoader: Send + Sync {
    fn load(&self, reference: &str) -> Result<Vec<String>, NumberingError>;
}

/// Reads CSV numbering lists through the storage overlay, so lists packed
/// in archives load the same as loose ones.
pub struct CsvNumberingLoader {
    storage: Arc<StorageResolver>,
}

impl CsvNumberingLoader {
    pub fn new(storage: Arc<StorageResolver>) -> Self {
        Self { storage }
    }
}

impl NumberingListLoader for CsvNumberingLoader {
    fn load(&self, reference: &str) -> Result<Vec<String>, NumberingError> {
        let reference = normalize_asset_path(reference);
        if reference.is_empty() {
            return Err(NumberingError::NotFound(reference));
        }

        // References name the source csv; installs often only ship the
        // compiled dcsv next to it.
        let candidates = [
            reference.clone(),
            change_extension(&reference, NUMBERING_BINARY_EXTENSION),
        ];
        let availability = candidates
            .iter()
            .map(|path| self.storage.locate(path, &LocationHint::Unknown))
            .find(|availability| availability.is_available())
            .ok_or_else(|| NumberingError::NotFound(reference.clone()))?;

        let bytes = self
            .storage
            .extract(&availability)
            .map_err(|e| NumberingError::Read {
                reference: reference.clone(),
                reason: e.to_string(),
            })?;
        let text = String::from_utf8(bytes).map_err(|e| NumberingError::Read {
            reference: reference.clone(),
            reason: e.to_string(),
        })?;

        Ok(parse_numbering_csv(&text))
    }
}

/// Take the first field of every non-empty line.
pub fn parse_numbering_csv(text: &str) -> Vec<String> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .filter_map(|line| line.split([',', ';']).next())
        .map(|field| field.trim().trim_matches('"').trim())
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SessionCache, ZipArchiveReader};
    use crate::test_support::{write_asset, write_zip};
    use tempfile::TempDir;

    fn storage(temp: &TempDir) -> Arc<StorageResolver> {
        Arc::new(
            StorageResolver::new(
                temp.path(),
                Arc::new(SessionCache::new()),
                Arc::new(ZipArchiveReader::new()),
            )
            .with_temp_dir(temp.path().join("tmp")),
        )
    }

    #[test]
    fn test_parse_takes_first_field() {
        let text = "\u{feff}66001,DB Schenker\r\n\"66002\";EWS\n\n  66003  \n";
        assert_eq!(parse_numbering_csv(text), vec!["66001", "66002", "66003"]);
    }

    #[test]
    fn test_loads_loose_list() {
        let temp = TempDir::new().unwrap();
        write_asset(temp.path(), "DTG\\Class66\\Numbers.csv", b"66001\n66002\n");

        let loader = CsvNumberingLoader::new(storage(&temp));
        assert_eq!(
            loader.load("DTG\\Class66\\Numbers.csv").unwrap(),
            vec!["66001", "66002"]
        );
    }

    #[test]
    fn test_loads_compiled_list_from_archive() {
        let temp = TempDir::new().unwrap();
        write_zip(
            &temp.path().join("DTG/Class66/Main.ap"),
            &[("Numbers.dcsv", b"66101\n".as_slice())],
        );

        let loader = CsvNumberingLoader::new(storage(&temp));
        assert_eq!(loader.load("DTG/Class66/Numbers.csv").unwrap(), vec!["66101"]);
    }

    #[test]
    fn test_missing_list_is_an_error() {
        let temp = TempDir::new().unwrap();
        let loader = CsvNumberingLoader::new(storage(&temp));

        assert!(matches!(
            loader.load("DTG\\Class66\\Missing.csv"),
            Err(NumberingError::NotFound(_))
        ));
        assert!(matches!(loader.load(""), Err(NumberingError::NotFound(_))));
    }
}
