use crate::classifier::{ContentAnalysis, ContentClassifier};
use crate::crawler::PageRecord;
use async_trait::async_trait;

const SUMMARY_CHARS: usize = 100;

/// Keyword categories, checked in order
const CATEGORIES: &[(&str, &[&str])] = &[
    ("blog", &["article", "blog", "post"]),
    ("product", &["product", "buy", "price"]),
    ("news", &["news", "update", "announcement"]),
];

/// Keyword and length based scoring; needs no network
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier {
    target_topics: Vec<String>,
}

impl HeuristicClassifier {
    pub fn new(target_topics: Vec<String>) -> Self {
        Self { target_topics }
    }

    /// Synchronous core of [`ContentClassifier::classify`]
    pub fn analyze(&self, page: &PageRecord) -> ContentAnalysis {
        let text = format!("{} {}", page.title, page.content).to_lowercase();

        let topic_hits = self
            .target_topics
            .iter()
            .filter(|topic| text.contains(&topic.to_lowercase()))
            .count();
        let relevance_score = (0.5 + 0.1 * topic_hits as f64).min(1.0);

        let content_chars = page.content.chars().count();
        let mut quality_score: f64 = 0.5;
        if content_chars > 500 {
            quality_score += 0.2;
        }
        if content_chars > 1000 {
            quality_score += 0.1;
        }
        if page.title.chars().count() > 10 {
            quality_score += 0.1;
        }

        let category = CATEGORIES
            .iter()
            .find(|(_, words)| words.iter().any(|w| text.contains(w)))
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
            .to_string();

        let mut summary: String = page.content.chars().take(SUMMARY_CHARS).collect();
        if content_chars > SUMMARY_CHARS {
            summary.push_str("...");
        }

        let head: String = page.content.chars().take(SUMMARY_CHARS).collect();
        let language = if head.is_ascii() { "en" } else { "unknown" };

        ContentAnalysis {
            relevance_score,
            quality_score: quality_score.min(1.0),
            category,
            summary,
            key_topics: self.target_topics.iter().take(3).cloned().collect(),
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl ContentClassifier for HeuristicClassifier {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn classify(&self, page: &PageRecord) -> Option<ContentAnalysis> {
        Some(self.analyze(page))
    }
}
