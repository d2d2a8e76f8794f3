//! Blueprint decoding, classification and reskin indirection.

use std::sync::Arc;

use tracing::debug;

use super::context::ResolutionContext;
use super::numbering::NumberingListLoader;
use super::record::{CargoComponent, ReskinInfo, VehicleExistence, VehicleKind, VehicleRecord};
use crate::blueprint::{
    BlueprintDecoder, BlueprintNode, DisplayNamePicker, DELTA_NAMESPACE, LOCALISED_STRING_TAG,
};
use crate::error::{ResolveError, ResolveResult};
use crate::identity::{file_stem, normalize_asset_path, BlueprintIdentity};
use crate::storage::{LocationHint, StorageResolver};

/// Default limit on nested preload expansion.
pub const DEFAULT_MAX_PRELOAD_DEPTH: usize = 16;

pub(crate) const ENGINE_TAG: &str = "cEngineBlueprint";
pub(crate) const WAGON_TAG: &str = "cWagonBlueprint";
pub(crate) const TENDER_TAG: &str = "cTenderBlueprint";
pub(crate) const CONSIST_TAG: &str = "cConsistBlueprint";
pub(crate) const CONSIST_FRAGMENT_TAG: &str = "cConsistFragmentBlueprint";
pub(crate) const RESKIN_TAG: &str = "cReskinBlueprint";

const RECOGNIZED_TAGS: &[&str] = &[
    CONSIST_TAG,
    ENGINE_TAG,
    WAGON_TAG,
    RESKIN_TAG,
    TENDER_TAG,
    CONSIST_FRAGMENT_TAG,
];

const ENTITY_CHILD_TAG: &str = "cEntityContainerBlueprint-sChild";
const PRELOAD_SUFFIX: &str = " Preload";
const PRELOAD_FRAGMENT_SUFFIX: &str = " Preload Fragment";

/// How a recognized blueprint node is treated.
#[derive(Clone, Copy)]
enum Classification {
    Leaf(VehicleKind),
    Composite(VehicleKind),
    Reskin,
}

fn classify(tag: &str) -> Classification {
    match tag {
        ENGINE_TAG => Classification::Leaf(VehicleKind::Engine),
        WAGON_TAG => Classification::Leaf(VehicleKind::Wagon),
        TENDER_TAG => Classification::Leaf(VehicleKind::Tender),
        CONSIST_TAG => Classification::Composite(VehicleKind::Preload),
        CONSIST_FRAGMENT_TAG => Classification::Composite(VehicleKind::PreloadFragment),
        _ => Classification::Reskin,
    }
}

/// Turns bin paths into [`VehicleRecord`]s.
///
/// Cheap to share: every collaborator is behind an `Arc`, and resolution
/// takes `&self`, so one resolver serves all scan workers.
pub struct VehicleResolver {
    storage: Arc<StorageResolver>,
    decoder: Arc<dyn BlueprintDecoder>,
    names: Arc<dyn DisplayNamePicker>,
    numbering: Arc<dyn NumberingListLoader>,
    pub(crate) max_preload_depth: usize,
}

impl VehicleResolver {
    pub fn new(
        storage: Arc<StorageResolver>,
        decoder: Arc<dyn BlueprintDecoder>,
        names: Arc<dyn DisplayNamePicker>,
        numbering: Arc<dyn NumberingListLoader>,
    ) -> Self {
        Self {
            storage,
            decoder,
            names,
            numbering,
            max_preload_depth: DEFAULT_MAX_PRELOAD_DEPTH,
        }
    }

    /// Limit how deeply preloads may nest when flattened.
    pub fn with_max_preload_depth(mut self, max_depth: usize) -> Self {
        self.max_preload_depth = max_depth;
        self
    }

    pub fn storage(&self) -> &Arc<StorageResolver> {
        &self.storage
    }

    /// Resolve the vehicle whose bin lives at `bin_path`.
    pub fn resolve(&self, bin_path: &str, context: &ResolutionContext) -> ResolveResult<VehicleRecord> {
        let identity = BlueprintIdentity::from_bin_path(bin_path)?;
        let bin_path = normalize_asset_path(bin_path);
        debug!(path = %bin_path, "Try");

        let document = self.load_document(&bin_path, context.hint())?;
        let blueprint = document
            .descendants()
            .find(|node| RECOGNIZED_TAGS.contains(&node.tag()))
            .ok_or_else(|| ResolveError::UnrecognizedBlueprint {
                path: bin_path.clone(),
            })?;

        let classification = classify(blueprint.tag());
        if matches!(classification, Classification::Reskin) && !context.accept_reskin() {
            return Err(ResolveError::ReskinChainRejected { path: bin_path });
        }

        let name = match classification {
            Classification::Composite(kind) => self.composite_name(blueprint, &bin_path, kind),
            _ => blueprint
                .child("Name")
                .map(|node| node.text().to_string())
                .ok_or_else(|| ResolveError::MissingField {
                    path: bin_path.clone(),
                    field: "Name",
                })?,
        };

        let name_bundle = document
            .descendants_named("DisplayName")
            .find_map(|node| node.child(LOCALISED_STRING_TAG))
            .cloned();
        let display_name = name_bundle
            .as_ref()
            .map(|bundle| self.names.pick(bundle))
            .filter(|picked| !picked.is_empty())
            .unwrap_or_else(|| name.clone());

        let mut record = VehicleRecord {
            identity,
            name,
            display_name,
            existence: VehicleExistence::Found,
            kind: VehicleKind::Engine,
            reskin: None,
            entity_count: 0,
            cargo_components: Vec::new(),
            numbering_list: Vec::new(),
            preload_source_path: None,
            name_bundle,
        };

        match classification {
            Classification::Leaf(kind) => {
                record.kind = kind;
                record.entity_count = document.descendants_named(ENTITY_CHILD_TAG).count();
                record.cargo_components = cargo_components(&document);
                record.numbering_list = self.numbering_list(&document, &bin_path);
            }
            Classification::Composite(kind) => {
                record.kind = kind;
                record.preload_source_path = Some(bin_path);
            }
            Classification::Reskin => {
                debug!(
                    name = %record.display_name,
                    "Reskin found, filling in details from its base vehicle"
                );
                self.adopt_base(&mut record, blueprint, &bin_path)?;
            }
        }

        debug!(
            path = %record.identity,
            kind = %record.kind,
            entities = record.entity_count,
            cargo = record.cargo_count(),
            "Found"
        );
        Ok(record)
    }

    /// Resolve a vehicle by identity.
    pub fn resolve_identity(
        &self,
        identity: &BlueprintIdentity,
        context: &ResolutionContext,
    ) -> ResolveResult<VehicleRecord> {
        self.resolve(&identity.bin_path(), context)
    }

    /// Locate, extract and decode one blueprint document.
    pub(crate) fn load_document(
        &self,
        bin_path: &str,
        hint: &LocationHint,
    ) -> ResolveResult<BlueprintNode> {
        let availability = self.storage.locate(bin_path, hint);
        if !availability.is_available() {
            return Err(ResolveError::NotFound {
                path: bin_path.to_string(),
            });
        }

        let bytes = self.storage.extract(&availability)?;
        self.decoder.decode(&bytes).map_err(|source| {
            debug!(path = %bin_path, error = %source, "Failed to load vehicle blueprint");
            ResolveError::DecodeFailure {
                path: bin_path.to_string(),
                source,
            }
        })
    }

    fn composite_name(&self, blueprint: &BlueprintNode, bin_path: &str, kind: VehicleKind) -> String {
        let explicit = blueprint
            .child("DisplayName")
            .map(|node| match node.child(LOCALISED_STRING_TAG) {
                Some(bundle) => self.names.pick(bundle),
                None => node.text().to_string(),
            })
            .filter(|name| !name.is_empty());
        let base = explicit.unwrap_or_else(|| file_stem(bin_path).replace('_', " "));

        let suffix = match kind {
            VehicleKind::PreloadFragment => PRELOAD_FRAGMENT_SUFFIX,
            _ => PRELOAD_SUFFIX,
        };
        format!("{base}{suffix}")
    }

    fn numbering_list(&self, document: &BlueprintNode, bin_path: &str) -> Vec<String> {
        let reference = document
            .first_descendant("NumberingList")
            .and_then(|node| node.child("cCSVContainer"))
            .and_then(|node| node.child("CsvFile"))
            .map(BlueprintNode::text)
            .filter(|reference| !reference.is_empty());

        let Some(reference) = reference else {
            return Vec::new();
        };
        match self.numbering.load(reference) {
            Ok(numbers) => numbers,
            Err(e) => {
                debug!(path = %bin_path, error = %e, "Numbering list unavailable");
                Vec::new()
            }
        }
    }

    /// Fill a reskin's structural details from its base blueprint.
    fn adopt_base(
        &self,
        record: &mut VehicleRecord,
        blueprint: &BlueprintNode,
        bin_path: &str,
    ) -> ResolveResult<()> {
        let base_identity = blueprint
            .child("ReskinAssetBpId")
            .ok_or("no ReskinAssetBpId node")
            .and_then(|node| read_identity(node).ok_or("incomplete ReskinAssetBpId"))
            .map_err(|reason| {
                debug!(path = %bin_path, reason, "Cannot get base vehicle information");
                ResolveError::ReskinInfoMissing {
                    path: bin_path.to_string(),
                    reason: reason.to_string(),
                }
            })?;

        let base = self
            .resolve_identity(&base_identity, &ResolutionContext::new().rejecting_reskins())
            .inspect_err(|e| {
                debug!(path = %bin_path, base = %base_identity, error = %e, "Failed to load base vehicle");
            })?;

        record.kind = base.kind;
        record.entity_count = base.entity_count;
        record.cargo_components = base.cargo_components;
        record.numbering_list = base.numbering_list;
        record.preload_source_path = base.preload_source_path;
        record.reskin = Some(ReskinInfo {
            asset: record.identity.clone(),
            base: base_identity,
        });

        debug!(
            kind = %record.kind,
            entities = record.entity_count,
            cargo = record.cargo_count(),
            "Adopted base vehicle"
        );
        Ok(())
    }
}

/// Read a Provider/Product/BlueprintID triple below `node`.
pub(crate) fn read_identity(node: &BlueprintNode) -> Option<BlueprintIdentity> {
    let provider = node.leaf_text("Provider")?;
    let product = node.leaf_text("Product")?;
    let blueprint_id = node.leaf_text("BlueprintID")?;
    if provider.is_empty() || product.is_empty() || blueprint_id.is_empty() {
        return None;
    }
    Some(BlueprintIdentity::new(provider, product, blueprint_id))
}

fn cargo_components(document: &BlueprintNode) -> Vec<CargoComponent> {
    let Some(cargo_def) = document.first_descendant("CargoDef") else {
        return Vec::new();
    };

    cargo_def
        .children()
        .iter()
        .map(|definition| match definition.child("Capacity") {
            Some(capacity) => {
                let fallback = CargoComponent::default();
                let alt_encoding = capacity
                    .attribute_ns(DELTA_NAMESPACE, "alt_encoding")
                    .map(str::to_string)
                    .unwrap_or(fallback.alt_encoding);
                CargoComponent::new(capacity.text(), alt_encoding)
            }
            None => CargoComponent::default(),
        })
        .collect()
}
