//! Single-page re-indexing
//!
//! Re-fetches one URL and replaces its contribution to the index: old index
//! rows are deleted with their ranks subtracted from the lemma frequencies,
//! then the fresh content is stored and indexed like any crawled page.

use crate::analyzer::LemmaAnalyzer;
use crate::crawler::Fetcher;
use crate::indexing::LemmaIndexWriter;
use crate::storage::{PageRecord, SharedStore};
use crate::url::{normalize_url, site_relative_path};
use crate::{Result, UrlError};
use std::sync::Arc;

/// Re-indexes a single URL on demand
pub struct PageReindexer {
    store: SharedStore,
    fetcher: Arc<Fetcher>,
    analyzer: Arc<LemmaAnalyzer>,
    writer: Arc<LemmaIndexWriter>,
}

impl PageReindexer {
    pub fn new(
        store: SharedStore,
        fetcher: Arc<Fetcher>,
        analyzer: Arc<LemmaAnalyzer>,
        writer: Arc<LemmaIndexWriter>,
    ) -> Self {
        Self {
            store,
            fetcher,
            analyzer,
            writer,
        }
    }

    /// Re-indexes `raw_url`
    ///
    /// Returns `Ok(false)` when the URL's host belongs to none of the
    /// configured sites; malformed URLs and fetch failures bubble up as
    /// errors.
    pub async fn index_page(&self, raw_url: &str) -> Result<bool> {
        if raw_url.trim().is_empty() {
            return Err(UrlError::Parse("empty URL".to_string()).into());
        }

        let url = normalize_url(raw_url)?;
        let host = url.host_str().ok_or(UrlError::MissingHost)?;

        let Some(site) = self.store.find_site_by_host(host)? else {
            tracing::info!(url = %url, "re-index refused: host not in configured sites");
            return Ok(false);
        };

        let fetched = self.fetcher.fetch(&url).await?;
        let path = site_relative_path(&url);

        // An earlier version of this page may already be indexed; its
        // contribution is withdrawn before the new one lands.
        if let Some(existing) = self.store.find_page(site.id, &path)? {
            self.writer.remove_page_indices(site.id, existing.id)?;
        }

        let mut page = PageRecord {
            id: 0,
            site_id: site.id,
            path,
            code: fetched.status_code,
            content: fetched.body,
        };
        self.store.upsert_page(&mut page)?;

        let lemmas = self.analyzer.collect_lemmas(&page.content);
        self.writer
            .save_lemmas_and_indices(site.id, page.id, &lemmas)?;

        tracing::info!(url = %url, "page re-indexed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LemmaCache;
    use crate::storage::{PageStore, SqliteStore};
    use crate::CrawldexError;
    use std::time::Duration;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        store: Arc<SqliteStore>,
        reindexer: PageReindexer,
        writer: Arc<LemmaIndexWriter>,
    }

    fn fixture() -> Fixture {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::new_in_memory().unwrap());
        let shared: SharedStore = store.clone();
        let writer = Arc::new(LemmaIndexWriter::new(
            shared.clone(),
            LemmaCache::new(1000, Duration::from_secs(600)),
            5000,
        ));
        let reindexer = PageReindexer::new(
            shared,
            Arc::new(Fetcher::new().unwrap()),
            Arc::new(LemmaAnalyzer::new().unwrap()),
            writer.clone(),
        );
        Fixture {
            store,
            reindexer,
            writer,
        }
    }

    async fn mount(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(url_path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_out_of_scope_host() {
        let f = fixture();
        f.store.create_site("https://example.com", "Example").unwrap();

        let result = f.reindexer.index_page("https://other.com/page").await.unwrap();
        assert!(!result);
    }

    #[tokio::test]
    async fn test_malformed_url() {
        let f = fixture();
        let result = f.reindexer.index_page("not a url").await;
        assert!(matches!(result, Err(CrawldexError::Url(_))));

        let result = f.reindexer.index_page("   ").await;
        assert!(matches!(result, Err(CrawldexError::Url(_))));
    }

    #[tokio::test]
    async fn test_first_index_of_new_page() {
        let server = MockServer::start().await;
        mount(&server, "/fresh", "<html><body>cat cat</body></html>").await;

        let f = fixture();
        let site = f.store.create_site(&server.uri(), "Test").unwrap();

        let result = f
            .reindexer
            .index_page(&format!("{}/fresh", server.uri()))
            .await
            .unwrap();
        assert!(result);

        let page = f.store.find_page(site.id, "/fresh").unwrap().unwrap();
        assert_eq!(f.store.indices_for_page(page.id).unwrap().len(), 1);
        let lemma = f.store.find_lemma(site.id, "cat").unwrap().unwrap();
        assert_eq!(lemma.frequency, 2);
    }

    #[tokio::test]
    async fn test_reindex_replaces_contribution() {
        let server = MockServer::start().await;
        let f = fixture();
        let site = f.store.create_site(&server.uri(), "Test").unwrap();

        // Seed the index with cat×5 through the writer, as a crawl would
        let mut page = PageRecord {
            id: 0,
            site_id: site.id,
            path: "/page".to_string(),
            code: 200,
            content: "<html><body>cat cat cat cat cat</body></html>".to_string(),
        };
        f.store.insert_or_get_page(&mut page).unwrap();
        let lemmas = LemmaAnalyzer::new().unwrap().collect_lemmas(&page.content);
        f.writer
            .save_lemmas_and_indices(site.id, page.id, &lemmas)
            .unwrap();
        assert_eq!(
            f.store.find_lemma(site.id, "cat").unwrap().unwrap().frequency,
            5
        );

        // The page now serves cat×2
        mount(&server, "/page", "<html><body>cat cat</body></html>").await;
        let result = f
            .reindexer
            .index_page(&format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert!(result);

        let lemma = f.store.find_lemma(site.id, "cat").unwrap().unwrap();
        assert_eq!(lemma.frequency, 2);

        let reloaded = f.store.find_page(site.id, "/page").unwrap().unwrap();
        assert_eq!(reloaded.id, page.id);
        assert!(reloaded.content.contains("cat cat"));

        let indices = f.store.indices_for_page(page.id).unwrap();
        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0].rank, 2.0);
    }

    #[tokio::test]
    async fn test_subdomain_resolves_to_site() {
        let f = fixture();
        // Port 1 is never listening; the host still matches the site
        f.store.create_site("http://localhost:1", "Local").unwrap();

        // The scope check passes (subdomain of the configured host) and the
        // failure comes from the fetch, not from OUT_OF_SCOPE.
        let result = f.reindexer.index_page("http://sub.localhost:1/x").await;
        assert!(matches!(result, Err(CrawldexError::Fetch { .. })));
    }
}
