//! Resolved vehicle records.

use std::fmt;

use crate::blueprint::BlueprintNode;
use crate::identity::BlueprintIdentity;

/// Capacity pair used when a cargo definition has no `Capacity` node.
pub const DEFAULT_CARGO_CAPACITY: (&str, &str) = ("0", "0000000000000000");

/// What a blueprint describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleKind {
    Engine,
    Wagon,
    Tender,
    /// A fixed consist inserted as a unit.
    Preload,
    /// A partial consist spliced into other preloads.
    PreloadFragment,
}

impl VehicleKind {
    /// Whether this kind expands into other vehicles.
    pub fn is_preload(&self) -> bool {
        matches!(self, VehicleKind::Preload | VehicleKind::PreloadFragment)
    }

    /// Whether this kind is a single rail vehicle.
    pub fn is_leaf(&self) -> bool {
        !self.is_preload()
    }
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VehicleKind::Engine => "engine",
            VehicleKind::Wagon => "wagon",
            VehicleKind::Tender => "tender",
            VehicleKind::Preload => "preload",
            VehicleKind::PreloadFragment => "preload fragment",
        };
        f.write_str(name)
    }
}

/// Whether the vehicle's blueprint was found.
///
/// Resolved records are always `Found`; `Missing` exists for callers that
/// mirror scenario vehicles whose assets are not installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VehicleExistence {
    #[default]
    Found,
    Missing,
}

/// One cargo slot of a leaf vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoComponent {
    /// Capacity as displayed.
    pub capacity: String,
    /// Raw encoding of the capacity (`d:alt_encoding`).
    pub alt_encoding: String,
}

impl CargoComponent {
    pub fn new(capacity: impl Into<String>, alt_encoding: impl Into<String>) -> Self {
        Self {
            capacity: capacity.into(),
            alt_encoding: alt_encoding.into(),
        }
    }
}

impl Default for CargoComponent {
    fn default() -> Self {
        Self::new(DEFAULT_CARGO_CAPACITY.0, DEFAULT_CARGO_CAPACITY.1)
    }
}

/// Identities involved in a reskin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReskinInfo {
    /// The reskin's own blueprint, as requested.
    pub asset: BlueprintIdentity,
    /// The base blueprint whose structure was adopted.
    pub base: BlueprintIdentity,
}

/// The resolved description of one vehicle.
///
/// Records are only produced by successful resolution and are immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub(crate) identity: BlueprintIdentity,
    pub(crate) name: String,
    pub(crate) display_name: String,
    pub(crate) existence: VehicleExistence,
    pub(crate) kind: VehicleKind,
    pub(crate) reskin: Option<ReskinInfo>,
    pub(crate) entity_count: usize,
    pub(crate) cargo_components: Vec<CargoComponent>,
    pub(crate) numbering_list: Vec<String>,
    pub(crate) preload_source_path: Option<String>,
    pub(crate) name_bundle: Option<BlueprintNode>,
}

impl VehicleRecord {
    pub fn identity(&self) -> &BlueprintIdentity {
        &self.identity
    }

    /// Internal name from the blueprint.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Localized name, or the internal name when none is set.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn existence(&self) -> VehicleExistence {
        self.existence
    }

    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    pub fn is_reskin(&self) -> bool {
        self.reskin.is_some()
    }

    pub fn reskin(&self) -> Option<&ReskinInfo> {
        self.reskin.as_ref()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    pub fn cargo_components(&self) -> &[CargoComponent] {
        &self.cargo_components
    }

    pub fn cargo_count(&self) -> usize {
        self.cargo_components.len()
    }

    pub fn numbering_list(&self) -> &[String] {
        &self.numbering_list
    }

    /// Storage-relative bin path of a preload's own document.
    pub fn preload_source_path(&self) -> Option<&str> {
        self.preload_source_path.as_deref()
    }

    /// The raw localized-name bundle, for re-picking after a locale change.
    pub fn name_bundle(&self) -> Option<&BlueprintNode> {
        self.name_bundle.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert!(VehicleKind::Preload.is_preload());
        assert!(VehicleKind::PreloadFragment.is_preload());
        assert!(VehicleKind::Tender.is_leaf());
        assert_eq!(VehicleKind::PreloadFragment.to_string(), "preload fragment");
    }

    #[test]
    fn test_default_cargo_component() {
        let cargo = CargoComponent::default();
        assert_eq!(cargo.capacity, "0");
        assert_eq!(cargo.alt_encoding, "0000000000000000");
    }
}
