//! Three-way comparison of stored and incoming vehicle records

use std::collections::{HashMap, HashSet};

use crate::ingest::models::VehicleRecord;

/// Changes that bring the stored set in line with the incoming set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationDelta {
    pub to_insert: Vec<VehicleRecord>,
    pub to_update: Vec<VehicleRecord>,
    pub to_delete: Vec<String>,
}

impl ReconciliationDelta {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Compare records keyed by VRN.
    ///
    /// When `incoming` holds the same VRN more than once the last occurrence wins. Output
    /// vectors are sorted by VRN.
    pub fn reconcile(
        existing: impl IntoIterator<Item = VehicleRecord>,
        incoming: impl IntoIterator<Item = VehicleRecord>,
    ) -> ReconciliationDelta {
        let existing: HashMap<String, VehicleRecord> =
            existing.into_iter().map(|r| (r.vrn.clone(), r)).collect();
        let incoming: HashMap<String, VehicleRecord> =
            incoming.into_iter().map(|r| (r.vrn.clone(), r)).collect();

        let mut delta = ReconciliationDelta::default();

        for (vrn, record) in &incoming {
            match existing.get(vrn) {
                None => delta.to_insert.push(record.clone()),
                Some(stored) if stored != record => delta.to_update.push(record.clone()),
                Some(_) => {},
            }
        }

        let incoming_vrns: HashSet<&String> = incoming.keys().collect();
        delta.to_delete = existing
            .into_keys()
            .filter(|vrn| !incoming_vrns.contains(vrn))
            .collect();

        delta.to_insert.sort_by(|a, b| a.vrn.cmp(&b.vrn));
        delta.to_update.sort_by(|a, b| a.vrn.cmp(&b.vrn));
        delta.to_delete.sort();

        delta
    }
}
