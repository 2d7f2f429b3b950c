//! Indexing run lifecycle
//!
//! One coordinator exists per process. It owns the `running` guard, the
//! shared stop flag, and the errors sink; everything else (scheduler,
//! writer, re-indexer) hangs off it. A run truncates all tables once, then
//! indexes every configured site in parallel.

use crate::analyzer::LemmaAnalyzer;
use crate::cache::{LemmaCache, PageUrlCache};
use crate::config::{Config, SiteEntry};
use crate::crawler::{CrawlScheduler, Fetcher};
use crate::indexing::{ErrorsSink, LemmaIndexWriter, PageReindexer};
use crate::storage::{SharedStore, SiteStatus};
use crate::url::FileTypeFilter;
use crate::{CrawldexError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Accepts start/stop requests and drives indexing runs
///
/// Cheap to clone; all clones share one run state.
#[derive(Clone)]
pub struct IndexingCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    store: SharedStore,
    scheduler: Arc<CrawlScheduler>,
    writer: Arc<LemmaIndexWriter>,
    reindexer: PageReindexer,
    page_urls: PageUrlCache,
    sites: Vec<SiteEntry>,
    parallelism: usize,
    running: AtomicBool,
    stop_requested: Arc<AtomicBool>,
    errors: Arc<ErrorsSink>,
}

impl IndexingCoordinator {
    /// Wires the full pipeline from the configuration
    pub fn new(config: &Config, store: SharedStore) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new()?);
        let analyzer = Arc::new(LemmaAnalyzer::new()?);
        let errors = Arc::new(ErrorsSink::new());
        let stop_requested = Arc::new(AtomicBool::new(false));

        let lemma_cache = LemmaCache::new(
            config.caches.lemma_max,
            Duration::from_secs(config.caches.lemma_idle_secs),
        );
        let page_urls = PageUrlCache::new(
            config.caches.page_url_max,
            Duration::from_secs(config.caches.page_url_idle_secs),
        );
        let files = Arc::new(match &config.fetcher.skipped_extensions {
            Some(extensions) => FileTypeFilter::new(extensions),
            None => FileTypeFilter::default(),
        });

        let writer = Arc::new(LemmaIndexWriter::new(
            store.clone(),
            lemma_cache,
            config.indexing.batch_size,
        ));
        let scheduler = Arc::new(CrawlScheduler::new(
            store.clone(),
            fetcher.clone(),
            analyzer.clone(),
            writer.clone(),
            page_urls.clone(),
            files,
            errors.clone(),
            config.indexing.parallelism,
            stop_requested.clone(),
        ));
        let reindexer = PageReindexer::new(store.clone(), fetcher, analyzer, writer.clone());

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                store,
                scheduler,
                writer,
                reindexer,
                page_urls,
                sites: config.sites.clone(),
                parallelism: config.indexing.parallelism,
                running: AtomicBool::new(false),
                stop_requested,
                errors,
            }),
        })
    }

    /// Starts a full indexing run in the background
    ///
    /// Returns immediately once the run is accepted; rejects with
    /// `AlreadyRunning` while a run is in progress.
    pub fn start_indexing(&self) -> Result<()> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CrawldexError::AlreadyRunning);
        }

        self.inner.stop_requested.store(false, Ordering::SeqCst);
        self.inner.errors.clear();

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run().await;
        });

        Ok(())
    }

    /// Requests cancellation of the run in progress
    ///
    /// Only sets the stop flag; in-flight work drains cooperatively and
    /// each unfinished site ends up `FAILED` with the interruption message.
    pub fn stop_indexing(&self) -> Result<()> {
        if !self.inner.running.load(Ordering::SeqCst) {
            return Err(CrawldexError::NotRunning);
        }
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        tracing::info!("indexing stop requested");
        Ok(())
    }

    /// Re-indexes a single URL (independent of full runs)
    pub async fn index_page(&self, url: &str) -> Result<bool> {
        self.inner.reindexer.index_page(url).await
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn errors(&self) -> &ErrorsSink {
        &self.inner.errors
    }

    /// Waits for the current run (if any) to finish
    ///
    /// Used for graceful shutdown and by tests; completion is signalled by
    /// the `running` flag clearing.
    pub async fn wait_until_idle(&self) {
        while self.is_running() {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }
}

impl CoordinatorInner {
    async fn run(self: Arc<Self>) {
        tracing::info!(sites = self.sites.len(), "indexing run started");

        // Policy: all four tables are truncated once per run, before any
        // site task is dispatched.
        if let Err(e) = self.store.reset_all() {
            self.errors
                .record("DB_ERROR", format!("reset before run: {}", e));
            self.finish();
            return;
        }

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut tasks = JoinSet::new();
        for entry in self.sites.clone() {
            let inner = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                inner.index_site(&entry).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(join_error) = joined {
                self.errors.record(
                    "POOL_TERMINATION_FORCED",
                    format!("site task aborted: {}", join_error),
                );
            }
        }

        self.finish();
    }

    async fn index_site(&self, entry: &SiteEntry) {
        let site = match self.store.create_site(&entry.url, &entry.name) {
            Ok(site) => site,
            Err(e) => {
                self.errors
                    .record("DB_ERROR", format!("create site {}: {}", entry.url, e));
                return;
            }
        };

        let outcome = if self.stop_requested.load(Ordering::SeqCst) {
            Ok(())
        } else {
            self.scheduler.clone().crawl_site(&site).await
        };

        let result = match outcome {
            Ok(()) if self.stop_requested.load(Ordering::SeqCst) => {
                let interrupted = CrawldexError::Cancelled;
                self.errors.record(
                    interrupted.kind(),
                    format!("site {}: {}", site.url, interrupted),
                );
                self.store.update_site_status(
                    site.id,
                    SiteStatus::Failed,
                    Some(&interrupted.to_string()),
                )
            }
            Ok(()) => {
                tracing::info!(site = %site.url, "site indexed");
                self.store
                    .update_site_status(site.id, SiteStatus::Indexed, None)
            }
            Err(e) => {
                self.errors
                    .record(e.kind(), format!("site {}: {}", site.url, e));
                self.store
                    .update_site_status(site.id, SiteStatus::Failed, Some(&e.to_string()))
            }
        };

        if let Err(e) = result {
            self.errors
                .record("DB_ERROR", format!("finalize site {}: {}", site.url, e));
        }
    }

    fn finish(&self) {
        self.writer.clear_cache();
        self.page_urls.clear();
        self.running.store(false, Ordering::SeqCst);
        tracing::info!(errors = self.errors.len(), "indexing run finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CachesConfig, FetcherConfig, IndexingConfig, ServerConfig};
    use crate::storage::{PageStore, SqliteStore};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(sites: Vec<SiteEntry>) -> Config {
        Config {
            indexing: IndexingConfig {
                parallelism: 4,
                batch_size: 5000,
            },
            server: ServerConfig {
                listen: "127.0.0.1:0".to_string(),
            },
            database: crate::config::DatabaseConfig {
                path: ":memory:".to_string(),
            },
            caches: CachesConfig::default(),
            fetcher: FetcherConfig::default(),
            sites,
        }
    }

    fn coordinator(sites: Vec<SiteEntry>) -> (Arc<SqliteStore>, IndexingCoordinator) {
        let store: Arc<SqliteStore> = Arc::new(SqliteStore::new_in_memory().unwrap());
        let config = test_config(sites);
        let coordinator = IndexingCoordinator::new(&config, store.clone()).unwrap();
        (store, coordinator)
    }

    #[tokio::test]
    async fn test_successful_run_marks_site_indexed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>cat</html>"))
            .mount(&server)
            .await;

        let (store, coordinator) = coordinator(vec![SiteEntry {
            url: server.uri(),
            name: "Test".to_string(),
        }]);

        coordinator.start_indexing().unwrap();
        coordinator.wait_until_idle().await;

        let sites = store.all_sites().unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].status, SiteStatus::Indexed);
        assert!(sites[0].last_error.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_site_marked_failed() {
        let (store, coordinator) = coordinator(vec![SiteEntry {
            url: "http://127.0.0.1:1".to_string(),
            name: "Dead".to_string(),
        }]);

        coordinator.start_indexing().unwrap();
        coordinator.wait_until_idle().await;

        let sites = store.all_sites().unwrap();
        assert_eq!(sites[0].status, SiteStatus::Failed);
        assert!(sites[0].last_error.is_some());
        assert!(!coordinator.errors().is_empty());
    }

    #[tokio::test]
    async fn test_start_rejects_while_running() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>slow</html>")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let (_store, coordinator) = coordinator(vec![SiteEntry {
            url: server.uri(),
            name: "Slow".to_string(),
        }]);

        coordinator.start_indexing().unwrap();
        assert!(matches!(
            coordinator.start_indexing(),
            Err(CrawldexError::AlreadyRunning)
        ));
        coordinator.wait_until_idle().await;

        // A finished run can be restarted
        coordinator.start_indexing().unwrap();
        coordinator.wait_until_idle().await;
    }

    #[tokio::test]
    async fn test_stop_rejects_when_idle() {
        let (_store, coordinator) = coordinator(vec![]);
        assert!(matches!(
            coordinator.stop_indexing(),
            Err(CrawldexError::NotRunning)
        ));
    }
}
