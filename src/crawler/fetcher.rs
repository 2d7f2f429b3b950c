//! HTTP fetcher
//!
//! The fetcher is the only component that touches the network. It returns
//! the HTTP status, the final URL after redirects (the base for resolving
//! relative links), and the document body. Transport failures — DNS, TCP,
//! TLS, timeouts — surface as errors; HTTP error statuses do not, since the
//! pipeline stores them with the page.

use crate::{CrawldexError, Result};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// Result of a successful fetch
#[derive(Debug)]
pub struct FetchedPage {
    /// HTTP status code of the final response
    pub status_code: u16,
    /// Final URL after redirects; base URI for resolving relative links
    pub final_url: Url,
    /// Document body
    pub body: String,
}

/// HTTP client wrapper for page fetching
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Builds the fetcher with its HTTP client
    pub fn new() -> Result<Self> {
        let user_agent = format!(
            "{}/{} (+{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            "https://crates.io/crates/crawldex"
        );

        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|source| CrawldexError::Fetch {
                url: String::new(),
                source,
            })?;

        Ok(Self { client })
    }

    /// Fetches a URL, following redirects up to the configured limit
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| CrawldexError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|source| CrawldexError::Fetch {
                url: url.to_string(),
                source,
            })?;

        tracing::debug!(url = %url, status = status_code, bytes = body.len(), "fetched");

        Ok(FetchedPage {
            status_code,
            final_url,
            body,
        })
    }
}
