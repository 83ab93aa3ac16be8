//! Coarse robots.txt interpretation
//!
//! Only two facts are read from the file: whether it carries a sitewide
//! `Disallow: /` and the `Crawl-delay` that applies to us. Path-specific
//! rules are not evaluated.

/// Robots.txt content loaded for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsPolicy {
    /// Raw robots.txt content (empty means nothing was loaded)
    content: String,
}

impl RobotsPolicy {
    /// Wraps raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// A policy with no content; allows everything
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_loaded(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Checks for the sitewide disallow marker
    ///
    /// True when any line is a `Disallow` directive whose value is exactly
    /// `/`, regardless of which user-agent group it sits in.
    pub fn blocks_entire_site(&self) -> bool {
        self.content.lines().any(|line| {
            let line = strip_comment(line);
            match line.split_once(':') {
                Some((key, value)) => {
                    key.trim().eq_ignore_ascii_case("disallow") && value.trim() == "/"
                }
                None => false,
            }
        })
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A group naming our agent takes precedence over the `*` group.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no applicable crawl delay is specified
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let normalized_agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut delay_for_wildcard: Option<f64> = None;
        let mut delay_for_agent: Option<f64> = None;

        for line in self.content.lines() {
            let trimmed = strip_comment(line).trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules opens a new group
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }
                    if group_agents.iter().any(|ua| ua == "*") {
                        delay_for_wildcard = Some(delay);
                    }
                    if group_agents
                        .iter()
                        .any(|ua| ua != "*" && !ua.is_empty() && normalized_agent.contains(ua.as_str()))
                    {
                        delay_for_agent = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        delay_for_agent.or(delay_for_wildcard)
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}
