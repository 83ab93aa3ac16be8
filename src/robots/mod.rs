//! Robots.txt handling module
//!
//! Robots.txt is fetched once per crawl run from the seed's origin. Failure
//! to fetch it is never fatal: the run proceeds as if the file were empty.

mod parser;

pub use parser::RobotsPolicy;

use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Timeout for the robots.txt request
const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Location of robots.txt for the origin of `seed`
pub fn robots_url(seed: &Url) -> Option<Url> {
    seed.join("/robots.txt").ok()
}

/// Fetches robots.txt for the origin of `seed`
///
/// Any status other than 200, and any transport error, yields an empty
/// policy.
pub async fn fetch_robots(client: &Client, seed: &Url) -> RobotsPolicy {
    let Some(url) = robots_url(seed) else {
        return RobotsPolicy::empty();
    };

    let response = match client.get(url.as_str()).timeout(ROBOTS_TIMEOUT).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Could not load robots.txt from {}: {}", url, e);
            return RobotsPolicy::empty();
        }
    };

    if response.status() != StatusCode::OK {
        tracing::debug!("robots.txt at {} returned {}", url, response.status());
        return RobotsPolicy::empty();
    }

    match response.text().await {
        Ok(body) => {
            tracing::info!("Robots.txt loaded from {}", url);
            RobotsPolicy::from_content(&body)
        }
        Err(e) => {
            tracing::warn!("Could not read robots.txt body from {}: {}", url, e);
            RobotsPolicy::empty()
        }
    }
}
