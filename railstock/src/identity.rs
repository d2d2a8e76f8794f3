//! Blueprint identities and storage-relative asset paths.
//!
//! Asset paths are relative to the assets root and use `\` as the canonical
//! separator, matching how scenario files and blueprints reference each
//! other. `/` is accepted on input everywhere and normalized away.
//!
//! ```
//! use railstock::identity::BlueprintIdentity;
//!
//! let id = BlueprintIdentity::from_bin_path("DTG/Class66/RailVehicles/Class66.bin").unwrap();
//! assert_eq!(id.provider(), "DTG");
//! assert_eq!(id.product(), "Class66");
//! assert_eq!(id.blueprint_id(), "RailVehicles\\Class66.xml");
//! assert_eq!(id.bin_path(), "DTG\\Class66\\RailVehicles\\Class66.bin");
//! ```

use std::fmt;

use crate::error::{ResolveError, ResolveResult};

/// Canonical separator for asset paths.
pub const ASSET_PATH_SEPARATOR: char = '\\';

/// Extension of the markup form a blueprint id refers to.
pub const MARKUP_EXTENSION: &str = "xml";

/// Extension of the binary blueprint resource.
pub const BLUEPRINT_EXTENSION: &str = "bin";

/// Uniquely addresses one blueprint resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlueprintIdentity {
    provider: String,
    product: String,
    blueprint_id: String,
}

impl BlueprintIdentity {
    /// Create an identity from its parts.
    ///
    /// The blueprint id is normalized to `\` separators and the markup
    /// extension.
    pub fn new(
        provider: impl Into<String>,
        product: impl Into<String>,
        blueprint_id: impl AsRef<str>,
    ) -> Self {
        let blueprint_id = normalize_asset_path(blueprint_id.as_ref());
        Self {
            provider: provider.into(),
            product: product.into(),
            blueprint_id: change_extension(&blueprint_id, MARKUP_EXTENSION),
        }
    }

    /// Derive an identity from a storage-relative bin path.
    ///
    /// The first two segments are provider and product, the remainder is
    /// the blueprint id with its extension normalized to `xml`.
    pub fn from_bin_path(bin_path: &str) -> ResolveResult<Self> {
        let segments: Vec<&str> = split_segments(bin_path).collect();
        if segments.len() < 3 {
            return Err(ResolveError::InvalidAssetPath(bin_path.to_string()));
        }
        Ok(Self::new(segments[0], segments[1], segments[2..].join("\\")))
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn blueprint_id(&self) -> &str {
        &self.blueprint_id
    }

    /// Storage-relative path of the markup form.
    pub fn markup_path(&self) -> String {
        format!("{}\\{}\\{}", self.provider, self.product, self.blueprint_id)
    }

    /// Storage-relative path of the binary blueprint resource.
    pub fn bin_path(&self) -> String {
        change_extension(&self.markup_path(), BLUEPRINT_EXTENSION)
    }
}

impl fmt::Display for BlueprintIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.markup_path())
    }
}

/// Split an asset path on either separator, dropping empty segments.
pub fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['\\', '/']).filter(|segment| !segment.is_empty())
}

/// Rejoin an asset path with the canonical separator.
pub fn normalize_asset_path(path: &str) -> String {
    split_segments(path).collect::<Vec<_>>().join("\\")
}

/// Join a directory prefix (possibly empty) and an archive entry name.
pub fn join_asset_path(prefix: &str, relative: &str) -> String {
    let relative = normalize_asset_path(relative);
    let prefix = normalize_asset_path(prefix);
    if prefix.is_empty() {
        relative
    } else {
        format!("{prefix}\\{relative}")
    }
}

/// Replace the extension of the final path segment, or append one.
pub fn change_extension(path: &str, extension: &str) -> String {
    let segment_start = path.rfind(['\\', '/']).map(|i| i + 1).unwrap_or(0);
    let stem_end = match path[segment_start..].rfind('.') {
        Some(dot) => segment_start + dot,
        None => path.len(),
    };
    format!("{}.{}", &path[..stem_end], extension)
}

/// File name of the final segment without its extension.
pub fn file_stem(path: &str) -> &str {
    let name = split_segments(path).last().unwrap_or("");
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}
