//! Catalog of available vehicles, built by a concurrent scan.

mod collection;
mod progress;
mod scanner;

pub use collection::VehicleCatalog;
pub use progress::{percent_of, ProgressReporter, ScanPhase, ScanProgress, ScanProgressCallback};
pub use scanner::{prioritized_entries, CatalogScanner, ScanError, ScanReport};
