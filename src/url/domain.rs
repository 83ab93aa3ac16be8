use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use alopecosa::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Checks whether `host` is `base_domain` itself or one of its subdomains
///
/// Both sides are compared case-insensitively. A suffix only counts on a
/// label boundary, so `notexample.com` is not inside `example.com`.
///
/// # Examples
///
/// ```
/// use alopecosa::url::is_within_domain;
///
/// assert!(is_within_domain("example.com", "example.com"));
/// assert!(is_within_domain("blog.example.com", "example.com"));
/// assert!(!is_within_domain("notexample.com", "example.com"));
/// ```
pub fn is_within_domain(host: &str, base_domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    let base = base_domain.trim_end_matches('.').to_lowercase();

    if base.is_empty() {
        return false;
    }

    host == base || host.ends_with(&format!(".{}", base))
}
