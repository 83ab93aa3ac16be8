use crate::classifier::ContentAnalysis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successfully fetched page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,

    /// Page title, or "No Title"
    pub title: String,

    /// Length-capped text excerpt
    pub content: String,

    /// Admitted outbound links in discovery order
    pub links: Vec<String>,

    pub status_code: u16,

    /// Seconds from the start of this page's cycle (delay included) to the record
    pub crawl_time: f64,

    pub timestamp: DateTime<Utc>,

    pub metadata: PageMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ContentAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub depth: u32,
    pub link_count: usize,

    /// Seconds spent on the GET itself
    pub response_time: f64,
}

/// Bounded in-memory collection of page records for one run
#[derive(Debug)]
pub struct ResultSink {
    records: Vec<PageRecord>,
    capacity: usize,
}

impl ResultSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a record; false once the sink is full
    pub fn push(&mut self, record: PageRecord) -> bool {
        if self.is_full() {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PageRecord> {
        self.records
    }
}
