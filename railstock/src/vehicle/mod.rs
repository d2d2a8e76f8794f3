//! Vehicle records and their resolution.
//!
//! [`VehicleResolver`] turns a bin path into a [`VehicleRecord`]:
//!
//! - the blueprint is located through the storage overlay and decoded;
//! - the first engine, wagon, tender, consist, fragment or reskin node
//!   decides the [`VehicleKind`];
//! - reskins borrow their structure from a base blueprint, one hop only;
//! - preloads can be flattened into [`ConsistMember`]s with
//!   [`VehicleResolver::preload_vehicles`].

mod context;
mod numbering;
mod preload;
mod record;
mod resolver;

pub use context::ResolutionContext;
pub use numbering::{parse_numbering_csv, CsvNumberingLoader, NumberingError, NumberingListLoader};
pub use preload::ConsistMember;
pub use record::{
    CargoComponent, ReskinInfo, VehicleExistence, VehicleKind, VehicleRecord,
    DEFAULT_CARGO_CAPACITY,
};
pub use resolver::{VehicleResolver, DEFAULT_MAX_PRELOAD_DEPTH};
