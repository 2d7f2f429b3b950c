//! Storage module for the site/page/lemma/index model
//!
//! This module handles all database operations for the indexing pipeline:
//! - SQLite database initialization and schema management
//! - Site, page, lemma, and index persistence
//! - Batched lemma/index writes
//! - Single-page index removal with frequency adjustment

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{PageStore, SharedStore, StorageError, StorageResult};

use std::sync::{Arc, Mutex};

/// Indexing status of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A row in the `site` table
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// A row in the `page` table
///
/// `path` is the canonical site-relative path; `(site_id, path)` is unique.
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// A row in the `lemma` table
///
/// `id` is `None` until the row is first persisted by a batch save.
#[derive(Debug, Clone)]
pub struct LemmaRecord {
    pub id: Option<i64>,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: i64,
}

/// Shared mutable handle to a lemma row
///
/// Handles are coalesced through the lemma cache so that concurrent pages
/// of one site accumulate frequency on the same in-memory row. Holders keep
/// a strong reference until the batch that persists the handle has flushed;
/// cache eviction then cannot drop unsaved mutations.
pub type LemmaHandle = Arc<Mutex<LemmaRecord>>;

/// A row to insert into the `indexx` table
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: f32,
}

/// An index row removed by single-page re-indexing, joined with its lemma
#[derive(Debug, Clone)]
pub struct RemovedIndex {
    pub lemma_id: i64,
    pub lemma: String,
    pub rank: f32,
}
