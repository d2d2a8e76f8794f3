//! Two-tier asset storage.
//!
//! Assets live either as loose files under the assets root, which take
//! precedence, or as entries inside archive containers colocated with the
//! assets they augment. [`StorageResolver`] hides the difference: it
//! locates a storage-relative path, reports where it was found as an
//! [`Availability`], and extracts the bytes on request.
//!
//! Opened archives and lookup results are shared by every worker of a scan
//! through one [`SessionCache`].

mod archive;
mod availability;
mod cache;
mod resolver;

pub use archive::{entry_name_matches, Archive, ArchiveReader, ZipArchiveReader, ZipContainer};
pub use availability::{AssetLocation, Availability, LocationHint};
pub use cache::{ArchiveOpenError, SessionCache, SessionCacheStats};
pub use resolver::StorageResolver;

pub(crate) use resolver::has_extension;
