//! Pluggable content classification
//!
//! A classifier looks at a finished [`PageRecord`] and may attach a
//! [`ContentAnalysis`] to it. It never influences what gets crawled next.

mod external;
mod heuristic;

pub use external::ExternalServiceClassifier;
pub use heuristic::HeuristicClassifier;

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::crawler::PageRecord;
use crate::ConfigError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scores and labels attached to a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentAnalysis {
    /// 0.0 to 1.0
    pub relevance_score: f64,
    /// 0.0 to 1.0
    pub quality_score: f64,
    pub category: String,
    pub summary: String,
    pub key_topics: Vec<String>,
    pub language: String,
}

impl Default for ContentAnalysis {
    fn default() -> Self {
        Self {
            relevance_score: 0.5,
            quality_score: 0.5,
            category: "unknown".to_string(),
            summary: String::new(),
            key_topics: Vec::new(),
            language: "unknown".to_string(),
        }
    }
}

#[async_trait]
pub trait ContentClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Analyses a page; None means nothing to attach
    async fn classify(&self, page: &PageRecord) -> Option<ContentAnalysis>;
}

/// Attaches nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClassifier;

#[async_trait]
impl ContentClassifier for NoopClassifier {
    fn name(&self) -> &str {
        "noop"
    }

    async fn classify(&self, _page: &PageRecord) -> Option<ContentAnalysis> {
        None
    }
}

/// Builds the classifier selected by configuration
pub fn from_config(config: &ClassifierConfig) -> Result<Arc<dyn ContentClassifier>, ConfigError> {
    let classifier: Arc<dyn ContentClassifier> = match config.kind {
        ClassifierKind::Noop => Arc::new(NoopClassifier),
        ClassifierKind::Heuristic => Arc::new(HeuristicClassifier::new(config.target_topics.clone())),
        ClassifierKind::External => Arc::new(ExternalServiceClassifier::from_config(config)?),
    };

    tracing::debug!("Using {} content classifier", classifier.name());
    Ok(classifier)
}
