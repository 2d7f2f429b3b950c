//! Bounded-parallel crawl of one site
//!
//! The scheduler owns the traversal: it fetches the seed, processes pages,
//! and fans child links out onto a per-site pool of `parallelism` workers.
//! Page tasks never await their descendants — a task returns the child URLs
//! it claimed and the site loop spawns them — so a site is finished exactly
//! when its task set drains.
//!
//! Cancellation is cooperative: the shared stop flag is observed between
//! units of work (before fetching, after fetching, before and after
//! persisting). In-flight I/O always completes; every write is its own
//! transaction, so stopping never leaves partial state behind.

use crate::analyzer::LemmaAnalyzer;
use crate::cache::{PageUrlCache, VisitedSet};
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::parser::extract_links;
use crate::indexing::{ErrorsSink, LemmaIndexWriter};
use crate::storage::{PageRecord, SharedStore, SiteRecord};
use crate::url::{is_internal_link, normalize_url, site_relative_path, FileTypeFilter};
use crate::{CrawldexError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Crawls sites page by page with bounded parallelism
pub struct CrawlScheduler {
    store: SharedStore,
    fetcher: Arc<Fetcher>,
    analyzer: Arc<LemmaAnalyzer>,
    writer: Arc<LemmaIndexWriter>,
    page_urls: PageUrlCache,
    files: Arc<FileTypeFilter>,
    errors: Arc<ErrorsSink>,
    parallelism: usize,
    stop: Arc<AtomicBool>,
}

impl CrawlScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: SharedStore,
        fetcher: Arc<Fetcher>,
        analyzer: Arc<LemmaAnalyzer>,
        writer: Arc<LemmaIndexWriter>,
        page_urls: PageUrlCache,
        files: Arc<FileTypeFilter>,
        errors: Arc<ErrorsSink>,
        parallelism: usize,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            fetcher,
            analyzer,
            writer,
            page_urls,
            files,
            errors,
            parallelism,
            stop,
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Records that a unit of work was abandoned at a cancellation check
    fn record_cancelled(&self, operation: &str, url: &Url) {
        let cancelled = CrawldexError::Cancelled;
        self.errors.record(
            cancelled.kind(),
            format!("{} {} skipped: {}", operation, url, cancelled),
        );
    }

    /// Crawls a site from its seed URL until the frontier drains
    ///
    /// Returns an error only for site-level failures (malformed seed, seed
    /// fetch failure). Page-level failures are recorded in the errors sink
    /// and do not fail the crawl. Whether the run was cancelled is for the
    /// caller to read from the stop flag.
    pub async fn crawl_site(self: Arc<Self>, site: &SiteRecord) -> Result<()> {
        if self.stopped() {
            return Ok(());
        }

        let seed = normalize_url(&site.url)?;
        tracing::info!(site = %site.url, "starting site crawl");

        let fetched = self.fetcher.fetch(&seed).await?;

        if self.stopped() {
            return Ok(());
        }

        let visited = Arc::new(VisitedSet::new());
        visited.claim(seed.as_str());

        // The seed page is processed inline under its post-redirect URL;
        // everything after fans out.
        let mut children = self.process_page(&fetched, &fetched.final_url, site, &seed, &visited);

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks: JoinSet<Vec<Url>> = JoinSet::new();

        loop {
            if !self.stopped() {
                for child in children.drain(..) {
                    let scheduler = Arc::clone(&self);
                    let site = site.clone();
                    let seed = seed.clone();
                    let visited = Arc::clone(&visited);
                    let semaphore = Arc::clone(&semaphore);
                    tasks.spawn(async move {
                        scheduler.page_task(child, site, seed, visited, semaphore).await
                    });
                }
            } else {
                children.clear();
            }

            match tasks.join_next().await {
                Some(Ok(next)) => children = next,
                Some(Err(join_error)) => {
                    self.errors.record(
                        "POOL_TERMINATION_FORCED",
                        format!("page task for {} aborted: {}", site.url, join_error),
                    );
                }
                None => break,
            }
        }

        tracing::info!(site = %site.url, pages = visited.len(), "site crawl drained");
        Ok(())
    }

    /// One fan-out unit: fetch a claimed URL and process the document
    async fn page_task(
        self: Arc<Self>,
        url: Url,
        site: SiteRecord,
        seed: Url,
        visited: Arc<VisitedSet>,
        semaphore: Arc<Semaphore>,
    ) -> Vec<Url> {
        let Ok(_permit) = semaphore.acquire_owned().await else {
            return Vec::new();
        };

        if self.stopped() {
            self.record_cancelled("fetch", &url);
            return Vec::new();
        }

        let fetched = match self.fetcher.fetch(&url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.errors.record(e.kind(), format!("fetch {}: {}", url, e));
                return Vec::new();
            }
        };

        if self.stopped() {
            self.record_cancelled("process", &url);
            return Vec::new();
        }

        self.process_page(&fetched, &url, &site, &seed, &visited)
    }

    /// Persists one page, indexes its lemmas, and claims its children
    ///
    /// Returns the internal child URLs this call won in the visited set;
    /// the caller is responsible for scheduling them.
    fn process_page(
        &self,
        fetched: &FetchedPage,
        url: &Url,
        site: &SiteRecord,
        seed: &Url,
        visited: &VisitedSet,
    ) -> Vec<Url> {
        if self.stopped() {
            self.record_cancelled("process", url);
            return Vec::new();
        }

        let url = match normalize_url(url.as_str()) {
            Ok(url) => url,
            Err(e) => {
                self.errors
                    .record("MALFORMED_URL", format!("process {}: {}", url, e));
                return Vec::new();
            }
        };

        // Soft dedup with TTL re-allowance; the visited set already gated
        // task submission.
        if !self.page_urls.mark(url.as_str()) {
            tracing::debug!(url = %url, "page already processed");
            return Vec::new();
        }

        if self.files.is_file_url(&url) {
            return Vec::new();
        }

        let page = match self.create_or_reuse_page(fetched, &url, site) {
            Ok(page) => page,
            Err(e) => {
                self.errors.record(e.kind(), format!("store {}: {}", url, e));
                return Vec::new();
            }
        };

        if self.stopped() {
            return Vec::new();
        }

        // Lemmas come from the stored content, which for a reused row may
        // predate this fetch.
        let lemmas = self.analyzer.collect_lemmas(&page.content);
        if let Err(e) = self
            .writer
            .save_lemmas_and_indices(site.id, page.id, &lemmas)
        {
            self.errors
                .record("DB_ERROR", format!("index {}: {}", url, e));
            return Vec::new();
        }

        if self.stopped() {
            return Vec::new();
        }

        self.claim_children(&fetched.body, &url, seed, visited)
    }

    fn create_or_reuse_page(
        &self,
        fetched: &FetchedPage,
        url: &Url,
        site: &SiteRecord,
    ) -> Result<PageRecord> {
        let path = site_relative_path(url);

        if let Some(existing) = self.store.find_page(site.id, &path)? {
            tracing::debug!(url = %url, "page row already exists");
            return Ok(existing);
        }

        let mut page = PageRecord {
            id: 0,
            site_id: site.id,
            path,
            code: fetched.status_code,
            content: fetched.body.clone(),
        };
        // Losing the insert race is fine: the winner's row is loaded and
        // reused without overwriting its content.
        self.store.insert_or_get_page(&mut page)?;
        Ok(page)
    }

    /// Extracts links and claims the internal ones in the visited set
    fn claim_children(
        &self,
        body: &str,
        base: &Url,
        seed: &Url,
        visited: &VisitedSet,
    ) -> Vec<Url> {
        let mut children = Vec::new();
        for link in extract_links(body, base) {
            let Ok(normalized) = normalize_url(link.as_str()) else {
                continue;
            };
            if self.files.is_file_url(&normalized) {
                continue;
            }
            // Claim before the internality check: the set also remembers
            // external URLs so repeated references stay cheap.
            if visited.claim(normalized.as_str()) && is_internal_link(&normalized, seed) {
                children.push(normalized);
            }
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LemmaCache;
    use crate::storage::{PageStore, SqliteStore};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        store: Arc<SqliteStore>,
        scheduler: Arc<CrawlScheduler>,
        stop: Arc<AtomicBool>,
    }

    fn harness() -> Harness {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::new_in_memory().unwrap());
        let shared: SharedStore = store.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let writer = Arc::new(LemmaIndexWriter::new(
            shared.clone(),
            LemmaCache::new(1000, Duration::from_secs(600)),
            5000,
        ));
        let scheduler = Arc::new(CrawlScheduler::new(
            shared,
            Arc::new(Fetcher::new().unwrap()),
            Arc::new(LemmaAnalyzer::new().unwrap()),
            writer,
            PageUrlCache::new(600, Duration::from_secs(600)),
            Arc::new(FileTypeFilter::default()),
            Arc::new(ErrorsSink::new()),
            4,
            stop.clone(),
        ));
        Harness {
            store,
            scheduler,
            stop,
        }
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body.to_string())
                    .insert_header("content-type", "text/html"),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_crawl_two_pages() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><body>home <a href="/a">A</a></body></html>"#,
        )
        .await;
        mount_page(&server, "/a", "<html><body>leaf page</body></html>").await;

        let h = harness();
        let site = h.store.create_site(&server.uri(), "Test").unwrap();
        h.scheduler.clone().crawl_site(&site).await.unwrap();

        let pages = h.store.pages_for_site(site.id).unwrap();
        let mut paths: Vec<_> = pages.iter().map(|p| p.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["/", "/a"]);
    }

    #[tokio::test]
    async fn test_external_links_not_fetched() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><body><a href="http://other.invalid/x">out</a></body></html>"#,
        )
        .await;

        let h = harness();
        let site = h.store.create_site(&server.uri(), "Test").unwrap();
        h.scheduler.clone().crawl_site(&site).await.unwrap();

        // Only the seed page exists; the external host was never crawled
        assert_eq!(h.store.pages_for_site(site.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_links_skipped_without_fetch() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><body><a href="/doc.pdf">doc</a><a href="/b">b</a></body></html>"#,
        )
        .await;
        mount_page(&server, "/b", "<html><body>b</body></html>").await;

        let h = harness();
        let site = h.store.create_site(&server.uri(), "Test").unwrap();
        h.scheduler.clone().crawl_site(&site).await.unwrap();

        let pages = h.store.pages_for_site(site.id).unwrap();
        assert!(pages.iter().all(|p| p.path != "/doc.pdf"));
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn test_stop_flag_short_circuits() {
        let server = MockServer::start().await;
        mount_page(&server, "/", "<html><body>home</body></html>").await;

        let h = harness();
        h.stop.store(true, Ordering::SeqCst);
        let site = h.store.create_site(&server.uri(), "Test").unwrap();
        h.scheduler.clone().crawl_site(&site).await.unwrap();

        assert!(h.store.pages_for_site(site.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_fetch_failure_is_site_error() {
        let h = harness();
        let site = h.store.create_site("http://127.0.0.1:1", "Dead").unwrap();
        let result = h.scheduler.clone().crawl_site(&site).await;
        assert!(matches!(result, Err(CrawldexError::Fetch { .. })));
    }
}
