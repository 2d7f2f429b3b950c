use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or missing a host
/// 2. Lowercase the scheme and host (the `url` crate does this on parse)
/// 3. Strip the default port for the scheme
/// 4. Collapse repeated `/` in the path
/// 5. Remove the trailing slash (except for the root `/`)
/// 6. Empty path becomes `/`
/// 7. Remove the fragment
/// 8. Leave the query string untouched
///
/// A leading `www.` is preserved in the emitted string; only the
/// internality test in [`crate::url::is_internal_host`] ignores it.
///
/// On failure the error carries the best-effort lowercased and collapsed
/// form so callers can log it, but the URL MUST be treated as
/// non-fetchable.
///
/// # Examples
///
/// ```
/// use crawldex::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM//a//b/#frag").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a/b");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = match Url::parse(url_str.trim()) {
        Ok(url) => url,
        Err(_) => return Err(UrlError::Malformed(best_effort_form(url_str))),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    // Parsing already lowercased scheme and host and dropped the default
    // port; what remains is path canonicalization.
    let canonical = canonical_path(url.path());
    url.set_path(&canonical);
    url.set_fragment(None);

    Ok(url)
}

/// Extracts the canonical site-relative path from a normalized URL
///
/// The path for the site root is `/`; every other path has collapsed
/// slashes and no trailing slash. The query string is not part of the path.
pub fn site_relative_path(url: &Url) -> String {
    canonical_path(url.path())
}

/// Collapses repeated slashes and trims the trailing slash (root excepted)
fn canonical_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Produces a lowercased, slash-collapsed rendering of an unparseable URL
///
/// Only used for error reporting; never fetched.
fn best_effort_form(url_str: &str) -> String {
    let lowered = url_str.trim().to_lowercase();

    // Collapse repeated slashes everywhere except the scheme separator.
    let (scheme, rest) = match lowered.split_once("://") {
        Some((s, r)) => (Some(s), r),
        None => (None, lowered.as_str()),
    };

    let mut collapsed = String::with_capacity(rest.len());
    let mut prev_slash = false;
    for c in rest.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        collapsed.push(c);
    }

    match scheme {
        Some(s) => format!("{}://{}", s, collapsed.trim_start_matches('/')),
        None => collapsed,
    }
}
