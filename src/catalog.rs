// src/catalog.rs
use crate::error::CatalogError;
use crate::region::{RegionId, RegionIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub refs: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCatalog {
    entries: BTreeMap<String, RegionInfo>,
}

/// Keys present on one side only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CatalogMismatch {
    pub without_region: Vec<String>,
    pub without_entry: Vec<RegionId>,
}

impl CatalogMismatch {
    pub fn is_empty(&self) -> bool {
        self.without_region.is_empty() && self.without_entry.is_empty()
    }
}

impl RegionCatalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, id: &str) -> Option<&RegionInfo> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compare feed keys with the loaded regions, logging every mismatch.
    pub fn reconcile(&self, index: &RegionIndex) -> CatalogMismatch {
        let without_region: Vec<String> = self
            .entries
            .keys()
            .filter(|k| !index.contains(k))
            .cloned()
            .collect();
        let mut without_entry: Vec<RegionId> = index
            .ids()
            .filter(|id| !self.entries.contains_key(id.as_str()))
            .cloned()
            .collect();
        without_entry.sort();

        for key in &without_region {
            warn!(region = %key, "feed entry has no matching region");
        }
        for id in &without_entry {
            warn!(region = %id, "region has no feed entry");
        }
        CatalogMismatch {
            without_region,
            without_entry,
        }
    }
}
