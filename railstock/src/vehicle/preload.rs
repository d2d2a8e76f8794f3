//! Flattening preloads into the rail vehicles they place.
//!
//! A preload's document lists `cConsistEntry` nodes, each naming a
//! blueprint and whether it is mounted flipped. Entries may name further
//! preloads or fragments; those are expanded depth-first in place, with the
//! entry's flip applied to every vehicle inside. The result only ever holds
//! leaf vehicles.

use tracing::debug;

use super::context::ResolutionContext;
use super::record::VehicleRecord;
use super::resolver::{read_identity, VehicleResolver, CONSIST_FRAGMENT_TAG, CONSIST_TAG};
use crate::error::{ResolveError, ResolveResult};
use crate::identity::BlueprintIdentity;
use crate::storage::LocationHint;

const CONSIST_ENTRY_TAG: &str = "cConsistEntry";
const FLIPPED_TRUE: &str = "eTrue";

/// One vehicle of a flattened consist.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistMember {
    pub vehicle: VehicleRecord,
    /// Mounted reversed relative to the consist.
    pub flipped: bool,
}

impl VehicleResolver {
    /// Expand a preload or preload fragment into its leaf vehicles, in
    /// document order.
    ///
    /// Any entry failing to resolve fails the whole expansion.
    pub fn preload_vehicles(&self, preload: &VehicleRecord) -> ResolveResult<Vec<ConsistMember>> {
        let mut members = Vec::new();
        let mut ancestors = Vec::new();
        self.expand(preload, false, &mut ancestors, &mut members)?;
        Ok(members)
    }

    fn expand(
        &self,
        preload: &VehicleRecord,
        flip: bool,
        ancestors: &mut Vec<BlueprintIdentity>,
        members: &mut Vec<ConsistMember>,
    ) -> ResolveResult<()> {
        let identity = preload.identity();
        let source = match preload.preload_source_path() {
            Some(source) if preload.kind().is_preload() => source,
            _ => {
                return Err(ResolveError::NotAPreload {
                    identity: identity.clone(),
                    kind: preload.kind(),
                })
            }
        };
        if ancestors.contains(identity) {
            return Err(ResolveError::PreloadCycle {
                identity: identity.clone(),
            });
        }
        if ancestors.len() >= self.max_preload_depth {
            return Err(ResolveError::PreloadTooDeep {
                identity: identity.clone(),
                max_depth: self.max_preload_depth,
            });
        }

        let document = self.load_document(source, &LocationHint::Unknown)?;
        let consist = document
            .descendants()
            .find(|node| node.tag() == CONSIST_TAG || node.tag() == CONSIST_FRAGMENT_TAG)
            .ok_or_else(|| ResolveError::UnrecognizedBlueprint {
                path: source.to_string(),
            })?;

        ancestors.push(identity.clone());
        for entry in consist.descendants_named(CONSIST_ENTRY_TAG) {
            let target = read_identity(entry).ok_or_else(|| ResolveError::MissingField {
                path: source.to_string(),
                field: "BlueprintID",
            })?;
            let flipped = entry.leaf_text("Flipped") == Some(FLIPPED_TRUE);

            let vehicle = self.resolve_identity(&target, &ResolutionContext::new())?;
            if vehicle.kind().is_preload() {
                debug!(preload = %identity, fragment = %target, flipped, "Expanding nested preload");
                self.expand(&vehicle, flip ^ flipped, ancestors, members)?;
            } else {
                members.push(ConsistMember {
                    vehicle,
                    flipped: flip ^ flipped,
                });
            }
        }
        ancestors.pop();

        Ok(())
    }
}
