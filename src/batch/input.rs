//! Seed URL lists for batch runs
//!
//! Three formats are accepted: line-oriented text with `#` comments, a
//! single-column CSV (optional `url` header) and JSON, either a bare array
//! or an object with a `urls` array.

use crate::url::normalize_url;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to read URL list: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON URL list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported URL list format: {0}")]
    UnsupportedFormat(String),

    #[error("No valid URLs found in {0}")]
    Empty(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlListFormat {
    Text,
    Csv,
    Json,
}

impl UrlListFormat {
    /// Picks a format from the file extension; unknown extensions are text
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Text,
        }
    }
}

/// Reads and parses a URL list file
///
/// # Errors
///
/// Returns `BatchError::Empty` when the file holds no usable http(s) URL.
pub fn load_urls(path: &Path) -> Result<Vec<String>, BatchError> {
    let text = std::fs::read_to_string(path)?;
    let urls = parse_url_list(&text, UrlListFormat::from_path(path))?;

    if urls.is_empty() {
        return Err(BatchError::Empty(path.display().to_string()));
    }

    tracing::info!("Loaded {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

/// Parses URL list text, keeping only http(s) entries in first-seen order
pub fn parse_url_list(text: &str, format: UrlListFormat) -> Result<Vec<String>, BatchError> {
    let raw: Vec<String> = match format {
        UrlListFormat::Text => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect(),
        UrlListFormat::Csv => text
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(|cell| cell.trim().trim_matches('"').trim())
            .filter(|cell| !cell.is_empty() && !cell.starts_with('#'))
            .filter(|cell| !cell.eq_ignore_ascii_case("url"))
            .map(str::to_string)
            .collect(),
        UrlListFormat::Json => json_entries(text)?,
    };

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for entry in raw {
        match normalize_url(&entry) {
            Ok(_) if seen.insert(entry.clone()) => urls.push(entry),
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping invalid URL '{}': {}", entry, e),
        }
    }

    Ok(urls)
}

fn json_entries(text: &str) -> Result<Vec<String>, BatchError> {
    let value: serde_json::Value = serde_json::from_str(text)?;

    let items = match &value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => match map.get("urls") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(BatchError::UnsupportedFormat(
                    "JSON object without a \"urls\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(BatchError::UnsupportedFormat(
                "JSON must be an array or an object with \"urls\"".to_string(),
            ))
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| item.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
