//! Observability record of every page visited during a run

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// What was learned about one visited URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainEntry {
    pub depth: u32,
    pub link_count: usize,
    pub title: String,
    pub discovered_at: DateTime<Utc>,
}

/// Visited URL → descriptor, append-only for the lifetime of a run
///
/// Serializes as a JSON object keyed by URL. Nothing in the crawl loop reads
/// it back for control decisions.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TerrainMap {
    entries: BTreeMap<String, TerrainEntry>,
}

impl TerrainMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a visited URL; the first record for a URL wins
    ///
    /// Returns false if the URL was already mapped.
    pub fn record(&mut self, url: &str, entry: TerrainEntry) -> bool {
        if self.entries.contains_key(url) {
            return false;
        }
        self.entries.insert(url.to_string(), entry);
        true
    }

    pub fn get(&self, url: &str) -> Option<&TerrainEntry> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TerrainEntry)> {
        self.entries.iter()
    }

    /// Deepest level reached so far
    pub fn max_depth(&self) -> Option<u32> {
        self.entries.values().map(|e| e.depth).max()
    }
}
