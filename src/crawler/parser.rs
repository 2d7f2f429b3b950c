//! Link extraction from fetched documents

use scraper::{Html, Selector};
use url::Url;

/// Extracts absolute `<a href>` URLs from an HTML document
///
/// Relative hrefs are resolved against `base_url` (the fetch's final URL).
/// Excluded up front, before the URLs ever reach the visited set:
/// - `javascript:`, `mailto:`, `tel:`, `data:` schemes
/// - fragment-only anchors
/// - links carrying the `download` attribute
/// - anything that resolves to a non-http(s) scheme
pub fn extract_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        if let Some(href) = element.value().attr("href") {
            if let Some(url) = resolve_link(href, base_url) {
                links.push(url);
            }
        }
    }

    links
}

/// Resolves one href to an absolute http(s) URL, or rejects it
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
        || href.starts_with("ftp:")
        || href.starts_with("file:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}
