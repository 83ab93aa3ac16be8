//! URL handling module
//!
//! This module provides URL canonicalization, domain matching and the
//! admission filter applied to every discovered link.

mod domain;
mod filter;
mod normalize;

pub use domain::{extract_domain, is_within_domain};
pub use filter::{evaluate, is_allowed, FilterOptions, Rejection, DEFAULT_MAX_URL_LENGTH};
pub use normalize::normalize_url;
