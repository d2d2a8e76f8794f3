//! Engine configuration.
//!
//! [`EngineConfig`] is built in code with `with_*` methods or loaded from an
//! INI file:
//!
//! ```ini
//! [assets]
//! root = /games/RailWorks/Assets
//! archive_extension = ap
//! temp_dir = /tmp/railstock
//!
//! [scan]
//! workers = 8
//!
//! [preload]
//! max_depth = 16
//!
//! [names]
//! languages = German, English
//! ```
//!
//! Every key is optional except `assets.root`.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::vehicle::DEFAULT_MAX_PRELOAD_DEPTH;

/// Default archive container extension.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "ap";

/// Default display-name language.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("missing required config key [{section}] {key}")]
    Missing {
        section: &'static str,
        key: &'static str,
    },

    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for an [`AssetEngine`](crate::AssetEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Loose-file override directory (the game's `Assets` folder).
    pub assets_root: PathBuf,

    /// Extension of archive containers. Blueprint and markup extensions are
    /// fixed by the asset format.
    pub archive_extension: String,

    /// Where archive entries are extracted while being read.
    pub temp_dir: PathBuf,

    /// Scan worker pool size.
    pub scan_workers: usize,

    /// Maximum preload nesting when flattening.
    pub max_preload_depth: usize,

    /// Preferred display-name languages, most preferred first.
    pub display_languages: Vec<String>,
}

impl EngineConfig {
    /// Create a config for `assets_root` with defaults for everything else.
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            temp_dir: default_temp_dir(),
            scan_workers: default_scan_workers(),
            max_preload_depth: DEFAULT_MAX_PRELOAD_DEPTH,
            display_languages: vec![DEFAULT_LANGUAGE.to_string()],
        }
    }

    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        self.archive_extension = extension.into();
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    pub fn with_scan_workers(mut self, workers: usize) -> Self {
        self.scan_workers = workers.max(1);
        self
    }

    pub fn with_max_preload_depth(mut self, max_depth: usize) -> Self {
        self.max_preload_depth = max_depth;
        self
    }

    pub fn with_display_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.display_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Load configuration from an INI file.
    pub fn from_ini_file(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Load configuration from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let root = value(ini, "assets", "root").ok_or(ConfigError::Missing {
            section: "assets",
            key: "root",
        })?;
        let mut config = Self::new(root);

        if let Some(ext) = value(ini, "assets", "archive_extension") {
            config.archive_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(dir) = value(ini, "assets", "temp_dir") {
            config.temp_dir = PathBuf::from(dir);
        }
        if let Some(workers) = parse_number(ini, "scan", "workers")? {
            if workers == 0 {
                return Err(ConfigError::InvalidValue {
                    section: "scan",
                    key: "workers",
                    value: "0".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.scan_workers = workers;
        }
        if let Some(depth) = parse_number(ini, "preload", "max_depth")? {
            config.max_preload_depth = depth;
        }
        if let Some(languages) = value(ini, "names", "languages") {
            let languages: Vec<String> = languages
                .split(',')
                .map(str::trim)
                .filter(|language| !language.is_empty())
                .map(str::to_string)
                .collect();
            if !languages.is_empty() {
                config.display_languages = languages;
            }
        }

        Ok(config)
    }
}

fn value<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.get_from(Some(section), key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_number(
    ini: &Ini,
    section: &'static str,
    key: &'static str,
) -> Result<Option<usize>, ConfigError> {
    value(ini, section, key)
        .map(|raw| {
            raw.parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                section,
                key,
                value: raw.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Process-scoped extraction directory under the OS temp dir.
pub fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("railstock-{}", std::process::id()))
}

/// One worker per available core.
pub fn default_scan_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
