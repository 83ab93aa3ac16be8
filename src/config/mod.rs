//! Configuration module for Alopecosa
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so an empty file (or no file at all) is a valid
//! configuration.
//!
//! # Example
//!
//! ```no_run
//! use alopecosa::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("alopecosa.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    default_excluded_extensions, AdaptiveConfig, BatchConfig, ClassifierConfig, ClassifierKind,
    Config, CrawlerConfig, LimitsConfig, OutputConfig, UserAgentConfig,
};

pub use parser::{
    compute_config_hash, hash_config_text, load_config, load_config_with_hash, parse_config,
};
pub use validation::{validate, validate_delay_range};
