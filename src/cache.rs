//! Run-scoped caches and the visited set
//!
//! Three shared structures support the crawl:
//! - [`VisitedSet`]: the hard deduplication gate; `claim` is the single
//!   serialization point deciding whether a URL becomes a crawl task
//! - [`PageUrlCache`]: a soft, TTL-bounded layer on top of the visited set;
//!   its expiry is what re-allows a page for single-page re-indexing
//! - [`LemmaCache`]: coalesces lemma-row lookups so concurrent pages of one
//!   site accumulate frequency on the same in-memory handle
//!
//! All three are cleared by the coordinator when a run ends.

use crate::storage::{LemmaHandle, LemmaRecord, PageStore, StorageResult};
use dashmap::DashSet;
use moka::sync::Cache;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Per-run set of canonical URLs already enqueued or completed
///
/// Backed by a concurrent set; `claim` is an atomic insert, so exactly one
/// of any number of racing workers wins a given URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: DashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims a URL; returns `true` iff it was not yet present
    pub fn claim(&self, url: &str) -> bool {
        self.inner.insert(url.to_string())
    }

    /// Whether the URL has been claimed (by anyone)
    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains(url)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Soft cache of canonical page URLs with idle-TTL expiry
///
/// Layered on top of the visited set: entries expire after the idle TTL,
/// which is what lets a page be re-processed by single-page re-indexing
/// after a run.
#[derive(Clone)]
pub struct PageUrlCache {
    inner: Cache<String, ()>,
}

impl PageUrlCache {
    pub fn new(max_capacity: u64, idle_ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_idle(idle_ttl)
                .build(),
        }
    }

    /// Marks a URL as processed; returns `false` if it was already marked
    pub fn mark(&self, url: &str) -> bool {
        if self.inner.get(url).is_some() {
            return false;
        }
        self.inner.insert(url.to_string(), ());
        true
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

/// Bounded cache of lemma handles keyed by `(site_id, lemma_text)`
///
/// Not write-through: handles are mutated in memory and persisted later by
/// a batched save. Eviction only drops the cache's own reference; callers
/// hold strong references to every handle they mutated until the batch that
/// saves it has flushed.
#[derive(Clone)]
pub struct LemmaCache {
    inner: Cache<(i64, String), LemmaHandle>,
}

impl LemmaCache {
    pub fn new(max_capacity: u64, idle_ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_idle(idle_ttl)
                .build(),
        }
    }

    /// Returns the cached handle for `(site, text)` without consulting the
    /// store
    pub fn get(&self, site_id: i64, text: &str) -> Option<LemmaHandle> {
        self.inner.get(&(site_id, text.to_string()))
    }

    /// Returns the handle for `(site, text)`, consulting the store on miss
    ///
    /// If the store has no row either, a fresh in-memory lemma is fabricated
    /// with zero frequency; each page then adds exactly its own occurrence
    /// count. Callers serialize per site, so two handles for one key cannot
    /// be fabricated concurrently.
    pub fn get_or_create(
        &self,
        store: &dyn PageStore,
        site_id: i64,
        text: &str,
    ) -> StorageResult<LemmaHandle> {
        let key = (site_id, text.to_string());
        if let Some(handle) = self.inner.get(&key) {
            return Ok(handle);
        }

        let record = match store.find_lemma(site_id, text)? {
            Some(existing) => existing,
            None => LemmaRecord {
                id: None,
                site_id,
                lemma: text.to_string(),
                frequency: 0,
            },
        };

        let handle: LemmaHandle = Arc::new(Mutex::new(record));
        self.inner.insert(key, handle.clone());
        Ok(handle)
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}
