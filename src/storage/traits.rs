//! Storage trait and error types

use crate::storage::{
    IndexEntry, LemmaHandle, LemmaRecord, PageRecord, RemovedIndex, SiteRecord, SiteStatus,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Lemma handle not yet persisted: {0}")]
    UnsavedLemma(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Shared, thread-safe handle to the page store
pub type SharedStore = Arc<dyn PageStore>;

/// Trait for the persistence backend of the indexing pipeline
///
/// Every method is its own transactional unit. Implementations must be safe
/// to call from concurrent crawl tasks.
pub trait PageStore: Send + Sync {
    /// Truncates `indexx`, `lemma`, `page`, and `site` in that order
    ///
    /// Called once per indexing run by the coordinator, never per site.
    fn reset_all(&self) -> StorageResult<()>;

    /// Creates a site row with status `INDEXING` and returns it
    fn create_site(&self, url: &str, name: &str) -> StorageResult<SiteRecord>;

    /// Finds a site by its exact configured URL
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Finds the site whose host owns the given host
    ///
    /// Ownership uses the crawler's internality rule, so a page on
    /// `sub.example.com` resolves to the site configured as `example.com`.
    fn find_site_by_host(&self, host: &str) -> StorageResult<Option<SiteRecord>>;

    /// Lists all site rows
    fn all_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Updates a site's status, refreshing `status_time`
    ///
    /// `last_error` replaces the stored value: `Some` on failure, `None`
    /// clears it on success.
    fn update_site_status(
        &self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Finds a page by `(site, path)`
    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Inserts a page, or loads the existing row on a `(site, path)` race
    ///
    /// Returns `true` if the row was inserted. When a concurrent worker won
    /// the race the existing row is loaded into `page` (stored content is
    /// not overwritten during a full crawl) and `false` is returned.
    fn insert_or_get_page(&self, page: &mut PageRecord) -> StorageResult<bool>;

    /// Inserts or overwrites a page's content and status code
    ///
    /// Used by single-page re-indexing, where fresh content replaces the
    /// stored document.
    fn upsert_page(&self, page: &mut PageRecord) -> StorageResult<()>;

    /// Lists all pages of a site
    fn pages_for_site(&self, site_id: i64) -> StorageResult<Vec<PageRecord>>;

    /// Finds a lemma row by `(site, text)`
    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Persists a batch of lemma handles in one transaction
    ///
    /// Unsaved handles are inserted and receive their row id; previously
    /// saved handles have their frequency updated in place.
    fn save_lemmas_batch(&self, lemmas: &[LemmaHandle]) -> StorageResult<()>;

    /// Lists all lemma rows of a site
    fn lemmas_for_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>>;

    /// Appends a batch of index rows in one transaction
    fn save_indices_batch(&self, indices: &[IndexEntry]) -> StorageResult<()>;

    /// Lists the index rows of a page
    fn indices_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexEntry>>;

    /// Deletes a page's index rows, returning them joined with their lemmas
    fn delete_indices_for_page(&self, page_id: i64) -> StorageResult<Vec<RemovedIndex>>;

    /// Decrements lemma frequencies by the removed ranks, clamping at zero
    fn adjust_lemma_frequencies(&self, removed: &[RemovedIndex]) -> StorageResult<()>;
}
