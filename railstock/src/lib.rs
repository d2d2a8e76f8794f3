//! Railstock - vehicle asset resolution for rolling-stock swapping
//!
//! This library finds the rail vehicles installed under a simulator's
//! `Assets` directory and describes them for a scenario editor:
//!
//! - [`storage`] resolves asset paths across loose override files and the
//!   archive containers beneath them, with a per-session cache.
//! - [`vehicle`] decodes blueprints into [`VehicleRecord`]s, follows reskins
//!   to their base vehicle and flattens preloads into their vehicles.
//! - [`catalog`] scans a directory subtree on a worker pool and builds a
//!   [`VehicleCatalog`] with progress reporting and cancellation.
//!
//! [`AssetEngine`] wires these together from an [`EngineConfig`].
//!
//! ```no_run
//! use railstock::{AssetEngine, EngineConfig, VehicleCatalog};
//! use tokio_util::sync::CancellationToken;
//!
//! let engine = AssetEngine::new(EngineConfig::new("/games/RailWorks/Assets"))?;
//! let catalog = VehicleCatalog::new();
//! let report = engine.scan(
//!     &engine.config().assets_root.join("DTG"),
//!     &catalog,
//!     None,
//!     &CancellationToken::new(),
//! )?;
//! println!("{} vehicles, {} failed", report.resolved, report.failed);
//! # Ok::<(), railstock::catalog::ScanError>(())
//! ```

pub mod blueprint;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod logging;
pub mod storage;
pub mod vehicle;

#[cfg(test)]
mod test_support;

pub use catalog::{CatalogScanner, ScanPhase, ScanProgress, ScanReport, VehicleCatalog};
pub use config::EngineConfig;
pub use engine::{AssetEngine, Collaborators};
pub use error::{ResolveError, ResolveErrorKind, ResolveResult};
pub use identity::BlueprintIdentity;
pub use storage::{AssetLocation, Availability, LocationHint};
pub use vehicle::{ConsistMember, ResolutionContext, VehicleKind, VehicleRecord};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
