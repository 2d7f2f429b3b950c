use url::Url;

/// Strips a single leading `www.` from a host for comparison purposes
///
/// The emitted canonical URL keeps `www.`; only host comparisons ignore it.
pub fn dewww(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Tests whether `host` belongs to the site rooted at `base_host`
///
/// Both hosts are compared after lowercasing and `www.` stripping. The rule
/// is a dot-aligned suffix match: the host is internal iff it equals the
/// base or ends with `".{base}"`. Subdomains are internal
/// (`sub.example.com` belongs to `example.com`); a host that merely
/// contains the base as a substring is not (`notexample.com` does NOT
/// belong to `example.com`).
pub fn is_internal_host(host: &str, base_host: &str) -> bool {
    let host = dewww(&host.to_lowercase()).to_string();
    let base = dewww(&base_host.to_lowercase()).to_string();

    if base.is_empty() {
        return false;
    }

    host == base || host.ends_with(&format!(".{}", base))
}

/// Tests whether `url` is internal to the site seeded at `seed`
///
/// Returns `false` for URLs without a host.
pub fn is_internal_link(url: &Url, seed: &Url) -> bool {
    match (url.host_str(), seed.host_str()) {
        (Some(host), Some(base)) => is_internal_host(host, base),
        _ => false,
    }
}
