//! HTML link extraction and density scoring
//!
//! This module turns a fetched body into:
//! - Outbound links (absolute, canonical, in document order, duplicates kept)
//! - The promoted set: links sitting among many sibling anchors
//! - Page title and a length-capped text excerpt
//!
//! The parsed document is an arena of nodes. Every walk over it uses an
//! explicit stack with a depth counter, so deeply nested or hostile markup
//! costs bounded work and can never overflow the call stack.

use crate::url::normalize_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Title used when a page has none
pub const NO_TITLE: &str = "No Title";

/// Elements whose text never counts as page content
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Containers tried, in order, for the main text of a page
const CONTENT_SELECTORS: &[&str] = &["main", "article", "div.content", "body"];

/// Bounds on traversal cost
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    /// Elements nested deeper than this are not visited
    pub max_nesting_depth: usize,

    /// Sibling elements examined when scoring density
    pub density_scan_limit: usize,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self {
            max_nesting_depth: 256,
            density_scan_limit: 50,
        }
    }
}

/// Links found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedLinks {
    /// Every usable anchor target, in document order
    pub links: Vec<String>,

    /// Links whose density exceeded the threshold; a set kept in discovery order
    pub promoted: Vec<String>,

    /// The nesting cap cut part of the document off
    pub truncated: bool,
}

/// Everything the engine needs from a page body
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub title: String,
    pub content: String,
    pub links: ExtractedLinks,
}

/// Extracts links and the promoted set from raw page bytes
///
/// Empty or malformed input yields empty results; this never fails.
///
/// # Example
///
/// ```
/// use alopecosa::crawler::{extract_links, ExtractLimits};
/// use url::Url;
///
/// let html = br#"<ul><li><a href="/a">A</a></li></ul><p><a href="/b">B</a></p>"#;
/// let base = Url::parse("https://example.com/").unwrap();
/// let extracted = extract_links(html, &base, 5, &ExtractLimits::default());
/// assert_eq!(extracted.links, vec!["https://example.com/a", "https://example.com/b"]);
/// assert!(extracted.promoted.is_empty());
/// ```
pub fn extract_links(
    page_bytes: &[u8],
    base_url: &Url,
    density_threshold: u32,
    limits: &ExtractLimits,
) -> ExtractedLinks {
    if page_bytes.is_empty() {
        return ExtractedLinks::default();
    }

    let html = String::from_utf8_lossy(page_bytes);
    let document = Html::parse_document(&html);
    collect_links(&document, base_url, density_threshold, limits)
}

/// Parses a page once and pulls out title, text excerpt and links
pub fn parse_page(
    page_bytes: &[u8],
    base_url: &Url,
    density_threshold: u32,
    limits: &ExtractLimits,
    max_content_chars: usize,
) -> ParsedPage {
    if page_bytes.is_empty() {
        return ParsedPage {
            title: NO_TITLE.to_string(),
            content: String::new(),
            links: ExtractedLinks::default(),
        };
    }

    let html = String::from_utf8_lossy(page_bytes);
    let document = Html::parse_document(&html);

    ParsedPage {
        title: extract_title(&document),
        content: extract_content(&document, limits, max_content_chars),
        links: collect_links(&document, base_url, density_threshold, limits),
    }
}

fn collect_links(
    document: &Html,
    base_url: &Url,
    density_threshold: u32,
    limits: &ExtractLimits,
) -> ExtractedLinks {
    let mut extracted = ExtractedLinks::default();
    let mut promoted_seen: HashSet<String> = HashSet::new();
    let mut anchors_per_parent = HashMap::new();

    let mut stack = vec![(document.tree.root(), 0usize)];

    while let Some((node, depth)) = stack.pop() {
        if let Some(element) = ElementRef::wrap(node) {
            if element.value().name() == "a" {
                if let Some(url) = anchor_target(element, base_url) {
                    let density = node
                        .parent()
                        .map(|parent| {
                            let anchors = *anchors_per_parent.entry(parent.id()).or_insert_with(|| {
                                parent
                                    .children()
                                    .filter_map(ElementRef::wrap)
                                    .take(limits.density_scan_limit)
                                    .filter(|sibling| sibling.value().name() == "a")
                                    .count()
                            });
                            // The anchor itself is not its own sibling
                            anchors.saturating_sub(1)
                        })
                        .unwrap_or(0);

                    if density > density_threshold as usize && promoted_seen.insert(url.clone()) {
                        tracing::debug!("Dense link area around {} ({} siblings)", url, density);
                        extracted.promoted.push(url.clone());
                    }

                    extracted.links.push(url);
                }
            }
        }

        if depth >= limits.max_nesting_depth {
            if node.has_children() {
                extracted.truncated = true;
            }
            continue;
        }

        // Reverse push keeps pops in document order
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    if extracted.truncated {
        tracing::debug!(
            "Markup nested deeper than {} levels; deeper links ignored",
            limits.max_nesting_depth
        );
    }

    extracted
}

/// Resolves an anchor's href to a canonical absolute URL
///
/// Returns None if the anchor has no usable target:
/// - no href, or an empty one
/// - javascript:, mailto:, tel:, data: schemes
/// - fragment-only (same page) targets
/// - a `download` attribute
/// - anything that does not resolve to http(s)
fn anchor_target(element: ElementRef<'_>, base_url: &Url) -> Option<String> {
    if element.value().attr("download").is_some() {
        return None;
    }

    resolve_link(element.value().attr("href")?, base_url)
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok().map(|u| u.to_string())
}

/// Page title, whitespace-collapsed, or [`NO_TITLE`]
fn extract_title(document: &Html) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return NO_TITLE.to_string();
    };

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| NO_TITLE.to_string())
}

/// Text of the first matching content container, capped at `max_chars`
fn extract_content(document: &Html, limits: &ExtractLimits, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }

    let container = CONTENT_SELECTORS.iter().find_map(|css| {
        Selector::parse(css)
            .ok()
            .and_then(|selector| document.select(&selector).next())
    });

    match container {
        Some(element) => collect_text(element, limits.max_nesting_depth, max_chars),
        None => String::new(),
    }
}

/// Joins text nodes below `root` with single spaces
///
/// Stops descending past `max_depth` and stops reading once `max_chars`
/// characters have been gathered.
fn collect_text(root: ElementRef<'_>, max_depth: usize, max_chars: usize) -> String {
    let mut out = String::new();
    let mut out_chars = 0usize;
    let mut stack = vec![(*root, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        if out_chars >= max_chars {
            break;
        }

        if let Some(text) = node.value().as_text() {
            for word in text.split_whitespace() {
                if out_chars > 0 {
                    out.push(' ');
                    out_chars += 1;
                }
                out.push_str(word);
                out_chars += word.chars().count();
                if out_chars >= max_chars {
                    break;
                }
            }
            continue;
        }

        if let Some(element) = node.value().as_element() {
            if NON_CONTENT_ELEMENTS.contains(&element.name()) {
                continue;
            }
        }

        if depth >= max_depth {
            continue;
        }

        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    out.chars().take(max_chars).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
