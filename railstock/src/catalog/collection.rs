//! The concurrently-built catalog of available vehicles.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::identity::BlueprintIdentity;
use crate::vehicle::VehicleRecord;

struct CatalogEntry {
    sequence: u64,
    record: VehicleRecord,
}

/// Available vehicles keyed by identity.
///
/// Insertion is a set union: the first record stored for an identity is
/// kept and later ones are ignored. [`records`](Self::records) returns
/// records in first-insertion order, so submission order decides
/// presentation order even though scan workers complete in any order.
pub struct VehicleCatalog {
    entries: DashMap<BlueprintIdentity, CatalogEntry>,
    next_sequence: AtomicU64,
}

impl VehicleCatalog {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Add a record. Returns `false` if its identity was already present.
    pub fn insert(&self, record: VehicleRecord) -> bool {
        match self.entries.entry(record.identity().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert(CatalogEntry { sequence, record });
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &BlueprintIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn get(&self, identity: &BlueprintIdentity) -> Option<VehicleRecord> {
        self.entries.get(identity).map(|entry| entry.record.clone())
    }

    /// Snapshot of all records in first-insertion order.
    pub fn records(&self) -> Vec<VehicleRecord> {
        let mut entries: Vec<(u64, VehicleRecord)> = self
            .entries
            .iter()
            .map(|entry| (entry.sequence, entry.record.clone()))
            .collect();
        entries.sort_by_key(|(sequence, _)| *sequence);
        entries.into_iter().map(|(_, record)| record).collect()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for VehicleCatalog {
    fn default() -> Self {
        Self::new()
    }
}
