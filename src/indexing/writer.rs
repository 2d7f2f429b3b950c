//! Serialized, batched persistence of lemmas and index entries
//!
//! Both the crawler and the single-page re-indexer write lemma frequencies
//! through this service. Writes for one site are serialized by a per-site
//! mutex, which protects the read-modify-write on lemma frequency handles;
//! lemma rows are site-scoped, so different sites never contend.

use crate::cache::LemmaCache;
use crate::storage::{IndexEntry, LemmaHandle, RemovedIndex, SharedStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Writes lemma frequency updates and index entries in batches
pub struct LemmaIndexWriter {
    store: SharedStore,
    cache: LemmaCache,
    site_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    batch_size: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LemmaIndexWriter {
    pub fn new(store: SharedStore, cache: LemmaCache, batch_size: usize) -> Self {
        Self {
            store,
            cache,
            site_locks: Mutex::new(HashMap::new()),
            batch_size: batch_size.max(1),
        }
    }

    fn site_lock(&self, site_id: i64) -> Arc<Mutex<()>> {
        lock(&self.site_locks)
            .entry(site_id)
            .or_default()
            .clone()
    }

    /// Accumulates a page's lemma counts and appends its index entries
    ///
    /// For each `(lemma, count)`: the site-scoped handle is fetched through
    /// the cache, its frequency grows by `count`, and an index entry with
    /// `rank = count` is queued. Batches flush every `batch_size` entries —
    /// lemmas first (assigning row ids), then indices. Strong references to
    /// every mutated handle are held in the pending batch until it flushes,
    /// so cache eviction cannot drop unsaved mutations.
    pub fn save_lemmas_and_indices(
        &self,
        site_id: i64,
        page_id: i64,
        lemmas: &HashMap<String, usize>,
    ) -> StorageResult<()> {
        let site_lock = self.site_lock(site_id);
        let _guard = lock(&site_lock);

        let mut pending: Vec<(LemmaHandle, f32)> = Vec::new();
        for (text, count) in lemmas {
            let handle = self.cache.get_or_create(self.store.as_ref(), site_id, text)?;
            lock(&handle).frequency += *count as i64;
            pending.push((handle, *count as f32));

            if pending.len() >= self.batch_size {
                self.flush(page_id, &mut pending)?;
            }
        }

        if !pending.is_empty() {
            self.flush(page_id, &mut pending)?;
        }

        Ok(())
    }

    fn flush(&self, page_id: i64, pending: &mut Vec<(LemmaHandle, f32)>) -> StorageResult<()> {
        let handles: Vec<LemmaHandle> = pending.iter().map(|(h, _)| h.clone()).collect();
        self.store.save_lemmas_batch(&handles)?;

        let indices = pending
            .iter()
            .map(|(handle, rank)| {
                let lemma = lock(handle);
                let lemma_id = lemma
                    .id
                    .ok_or_else(|| StorageError::UnsavedLemma(lemma.lemma.clone()))?;
                Ok(IndexEntry {
                    page_id,
                    lemma_id,
                    rank: *rank,
                })
            })
            .collect::<StorageResult<Vec<_>>>()?;
        self.store.save_indices_batch(&indices)?;

        pending.clear();
        Ok(())
    }

    /// Removes a page's index entries, decrementing lemma frequencies
    ///
    /// Each removed entry's rank is subtracted from its lemma, clamped at
    /// zero. Cached handles are decremented in step with the database so a
    /// later batch save cannot resurrect the removed counts.
    pub fn remove_page_indices(
        &self,
        site_id: i64,
        page_id: i64,
    ) -> StorageResult<Vec<RemovedIndex>> {
        let site_lock = self.site_lock(site_id);
        let _guard = lock(&site_lock);

        let removed = self.store.delete_indices_for_page(page_id)?;
        for entry in &removed {
            if let Some(handle) = self.cache.get(site_id, &entry.lemma) {
                let mut lemma = lock(&handle);
                lemma.frequency = (lemma.frequency - entry.rank as i64).max(0);
            }
        }
        self.store.adjust_lemma_frequencies(&removed)?;
        Ok(removed)
    }

    /// Drops all cached lemma handles (end of run)
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
