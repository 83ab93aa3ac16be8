use crate::classifier::{ContentAnalysis, ContentClassifier, HeuristicClassifier};
use crate::config::ClassifierConfig;
use crate::crawler::PageRecord;
use crate::ConfigError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    url: &'a str,
    title: &'a str,
    content: &'a str,
    objective: &'a str,
    target_topics: &'a [String],
}

/// Sends pages to an HTTP scoring service
///
/// Any failure (transport, status, body) falls back to the heuristic
/// classifier with a warning.
#[derive(Debug, Clone)]
pub struct ExternalServiceClassifier {
    client: Client,
    endpoint: String,
    objective: String,
    target_topics: Vec<String>,
    fallback: HeuristicClassifier,
}

impl ExternalServiceClassifier {
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint.clone().ok_or_else(|| {
            ConfigError::Validation("external classifier requires an endpoint".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ConfigError::Validation(format!("classifier client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            objective: config.objective.clone(),
            target_topics: config.target_topics.clone(),
            fallback: HeuristicClassifier::new(config.target_topics.clone()),
        })
    }

    async fn request(&self, page: &PageRecord) -> Result<ContentAnalysis, reqwest::Error> {
        let body = AnalyzeRequest {
            url: &page.url,
            title: &page.title,
            content: &page.content,
            objective: &self.objective,
            target_topics: &self.target_topics,
        };

        self.client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<ContentAnalysis>()
            .await
    }
}

#[async_trait]
impl ContentClassifier for ExternalServiceClassifier {
    fn name(&self) -> &str {
        "external"
    }

    async fn classify(&self, page: &PageRecord) -> Option<ContentAnalysis> {
        match self.request(page).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                tracing::warn!(
                    "Content analysis service failed for {}: {}; using heuristics",
                    page.url,
                    e
                );
                Some(self.fallback.analyze(page))
            }
        }
    }
}
