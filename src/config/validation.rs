use crate::config::types::{
    AdaptiveConfig, BatchConfig, ClassifierConfig, ClassifierKind, Config, CrawlerConfig,
    LimitsConfig, OutputConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_limits_config(&config.limits)?;
    validate_adaptive_config(&config.adaptive)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_batch_config(&config.batch)?;
    validate_classifier_config(&config.classifier)?;
    Ok(())
}

/// Validates crawler configuration
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    validate_delay_range(config.delay_range)?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    for ext in &config.excluded_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "excluded extension '{}' must start with '.'",
                ext
            )));
        }
    }

    Ok(())
}

/// Validates a politeness delay range in seconds
pub fn validate_delay_range((low, high): (f64, f64)) -> Result<(), ConfigError> {
    if !low.is_finite() || !high.is_finite() || low < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay_range bounds must be finite and non-negative, got [{}, {}]",
            low, high
        )));
    }

    if low > high {
        return Err(ConfigError::Validation(format!(
            "delay_range lower bound {} exceeds upper bound {}",
            low, high
        )));
    }

    Ok(())
}

fn validate_limits_config(config: &LimitsConfig) -> Result<(), ConfigError> {
    if config.max_url_length < 16 {
        return Err(ConfigError::Validation(format!(
            "max_url_length must be >= 16, got {}",
            config.max_url_length
        )));
    }

    if config.hard_response_bytes == 0 {
        return Err(ConfigError::Validation(
            "hard_response_bytes must be > 0".to_string(),
        ));
    }

    if config.soft_response_bytes > config.hard_response_bytes {
        return Err(ConfigError::Validation(format!(
            "soft_response_bytes ({}) cannot exceed hard_response_bytes ({})",
            config.soft_response_bytes, config.hard_response_bytes
        )));
    }

    if config.max_nesting_depth < 1 || config.density_scan_limit < 1 {
        return Err(ConfigError::Validation(
            "max_nesting_depth and density_scan_limit must be >= 1".to_string(),
        ));
    }

    if config.queue_factor < 1 || config.iteration_factor < 1 {
        return Err(ConfigError::Validation(
            "queue_factor and iteration_factor must be >= 1".to_string(),
        ));
    }

    if !config.max_crawl_delay_secs.is_finite() || config.max_crawl_delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "max_crawl_delay_secs must be a finite value >= 0, got {}",
            config.max_crawl_delay_secs
        )));
    }

    Ok(())
}

fn validate_adaptive_config(config: &AdaptiveConfig) -> Result<(), ConfigError> {
    if config.min_threshold > config.max_threshold {
        return Err(ConfigError::Validation(format!(
            "min_threshold ({}) cannot exceed max_threshold ({})",
            config.min_threshold, config.max_threshold
        )));
    }

    if config.initial_threshold < config.min_threshold
        || config.initial_threshold > config.max_threshold
    {
        return Err(ConfigError::Validation(format!(
            "initial_threshold {} must lie within [{}, {}]",
            config.initial_threshold, config.min_threshold, config.max_threshold
        )));
    }

    if config.adapt_every < 1 || config.promote_per_cycle < 1 {
        return Err(ConfigError::Validation(
            "adapt_every and promote_per_cycle must be >= 1".to_string(),
        ));
    }

    let rates_valid = (0.0..=1.0).contains(&config.low_success_rate)
        && (0.0..=1.0).contains(&config.high_success_rate)
        && config.low_success_rate <= config.high_success_rate;
    if !rates_valid {
        return Err(ConfigError::Validation(format!(
            "success rate bounds must satisfy 0 <= low ({}) <= high ({}) <= 1",
            config.low_success_rate, config.high_success_rate
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.results_dir.is_empty() {
        return Err(ConfigError::Validation(
            "results_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 64, got {}",
            config.max_workers
        )));
    }

    if !config.dispatch_delay_secs.is_finite() || config.dispatch_delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "dispatch_delay_secs must be non-negative, got {}",
            config.dispatch_delay_secs
        )));
    }

    Ok(())
}

fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    if config.kind != ClassifierKind::External {
        return Ok(());
    }

    let endpoint = config.endpoint.as_deref().ok_or_else(|| {
        ConfigError::Validation("external classifier requires an endpoint".to_string())
    })?;

    let url = Url::parse(endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid classifier endpoint: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "classifier endpoint must be http or https, got '{}'",
            endpoint
        )));
    }

    Ok(())
}
