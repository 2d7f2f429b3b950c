//! SQLite implementation of the page store
//!
//! A single connection guarded by a mutex serves all crawl tasks. Queries
//! are short and never run while any other lock is held, so the coarse
//! guard is not a contention point in practice.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageResult};
use crate::storage::{
    IndexEntry, LemmaHandle, LemmaRecord, PageRecord, RemovedIndex, SiteRecord, SiteStatus,
};
use crate::url::is_internal_host;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn map_site(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn map_page(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";

fn find_page_locked(
    conn: &Connection,
    site_id: i64,
    path: &str,
) -> StorageResult<Option<PageRecord>> {
    let page = conn
        .query_row(
            &format!("SELECT {} FROM page WHERE site_id = ?1 AND path = ?2", PAGE_COLUMNS),
            params![site_id, path],
            map_page,
        )
        .optional()?;
    Ok(page)
}

impl PageStore for SqliteStore {
    fn reset_all(&self) -> StorageResult<()> {
        // FK order: children first
        self.conn().execute_batch(
            "
            BEGIN;
            DELETE FROM indexx;
            DELETE FROM lemma;
            DELETE FROM page;
            DELETE FROM site;
            COMMIT;
        ",
        )?;
        Ok(())
    }

    fn create_site(&self, url: &str, name: &str) -> StorageResult<SiteRecord> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO site (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, SiteStatus::Indexing.to_db_string(), now],
        )?;
        Ok(SiteRecord {
            id: conn.last_insert_rowid(),
            url: url.to_string(),
            name: name.to_string(),
            status: SiteStatus::Indexing,
            status_time: now,
            last_error: None,
        })
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM site WHERE url = ?1", SITE_COLUMNS),
                params![url],
                map_site,
            )
            .optional()?;
        Ok(site)
    }

    fn find_site_by_host(&self, host: &str) -> StorageResult<Option<SiteRecord>> {
        // Host ownership follows the crawler's internality rule, so the
        // match is done in code rather than with a SQL LIKE.
        let sites = self.all_sites()?;
        Ok(sites.into_iter().find(|site| {
            Url::parse(&site.url)
                .ok()
                .and_then(|u| u.host_str().map(|h| is_internal_host(host, h)))
                .unwrap_or(false)
        }))
    }

    fn all_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM site ORDER BY id", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], map_site)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sites)
    }

    fn update_site_status(
        &self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE site SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, last_error, site_id],
        )?;
        Ok(())
    }

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        find_page_locked(&self.conn(), site_id, path)
    }

    fn insert_or_get_page(&self, page: &mut PageRecord) -> StorageResult<bool> {
        let conn = self.conn();
        let inserted = conn.execute(
            "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(site_id, path) DO NOTHING",
            params![page.site_id, page.path, page.code, page.content],
        )?;

        if inserted > 0 {
            page.id = conn.last_insert_rowid();
            return Ok(true);
        }

        // A concurrent worker created the row first; reuse it as-is.
        match find_page_locked(&conn, page.site_id, &page.path)? {
            Some(existing) => {
                *page = existing;
                Ok(false)
            }
            None => {
                // Row vanished between conflict and reload; insert wins now.
                conn.execute(
                    "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
                    params![page.site_id, page.path, page.code, page.content],
                )?;
                page.id = conn.last_insert_rowid();
                Ok(true)
            }
        }
    }

    fn upsert_page(&self, page: &mut PageRecord) -> StorageResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(site_id, path) DO UPDATE SET code = excluded.code, content = excluded.content",
            params![page.site_id, page.path, page.code, page.content],
        )?;
        let id: i64 = conn.query_row(
            "SELECT id FROM page WHERE site_id = ?1 AND path = ?2",
            params![page.site_id, page.path],
            |row| row.get(0),
        )?;
        page.id = id;
        Ok(())
    }

    fn pages_for_site(&self, site_id: i64) -> StorageResult<Vec<PageRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM page WHERE site_id = ?1 ORDER BY id",
            PAGE_COLUMNS
        ))?;
        let pages = stmt
            .query_map(params![site_id], map_page)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pages)
    }

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn()
            .query_row(
                "SELECT id, site_id, lemma, frequency FROM lemma WHERE site_id = ?1 AND lemma = ?2",
                params![site_id, lemma],
                |row| {
                    Ok(LemmaRecord {
                        id: Some(row.get(0)?),
                        site_id: row.get(1)?,
                        lemma: row.get(2)?,
                        frequency: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn save_lemmas_batch(&self, lemmas: &[LemmaHandle]) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for handle in lemmas {
            let mut lemma = handle.lock().unwrap_or_else(PoisonError::into_inner);
            match lemma.id {
                Some(id) => {
                    tx.execute(
                        "UPDATE lemma SET frequency = ?1 WHERE id = ?2",
                        params![lemma.frequency, id],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO lemma (site_id, lemma, frequency) VALUES (?1, ?2, ?3)",
                        params![lemma.site_id, lemma.lemma, lemma.frequency],
                    )?;
                    lemma.id = Some(tx.last_insert_rowid());
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn lemmas_for_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, site_id, lemma, frequency FROM lemma WHERE site_id = ?1 ORDER BY lemma",
        )?;
        let lemmas = stmt
            .query_map(params![site_id], |row| {
                Ok(LemmaRecord {
                    id: Some(row.get(0)?),
                    site_id: row.get(1)?,
                    lemma: row.get(2)?,
                    frequency: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lemmas)
    }

    fn save_indices_batch(&self, indices: &[IndexEntry]) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO indexx (page_id, lemma_id, rankk) VALUES (?1, ?2, ?3)")?;
            for entry in indices {
                stmt.execute(params![entry.page_id, entry.lemma_id, entry.rank])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn indices_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT page_id, lemma_id, rankk FROM indexx WHERE page_id = ?1 ORDER BY id")?;
        let indices = stmt
            .query_map(params![page_id], |row| {
                Ok(IndexEntry {
                    page_id: row.get(0)?,
                    lemma_id: row.get(1)?,
                    rank: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(indices)
    }

    fn delete_indices_for_page(&self, page_id: i64) -> StorageResult<Vec<RemovedIndex>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let removed = {
            let mut stmt = tx.prepare(
                "SELECT i.lemma_id, l.lemma, i.rankk FROM indexx i
                 JOIN lemma l ON l.id = i.lemma_id WHERE i.page_id = ?1",
            )?;
            let rows = stmt
                .query_map(params![page_id], |row| {
                    Ok(RemovedIndex {
                        lemma_id: row.get(0)?,
                        lemma: row.get(1)?,
                        rank: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        tx.execute("DELETE FROM indexx WHERE page_id = ?1", params![page_id])?;
        tx.commit()?;
        Ok(removed)
    }

    fn adjust_lemma_frequencies(&self, removed: &[RemovedIndex]) -> StorageResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("UPDATE lemma SET frequency = MAX(frequency - ?1, 0) WHERE id = ?2")?;
            for entry in removed {
                stmt.execute(params![entry.rank as i64, entry.lemma_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> SqliteStore {
        SqliteStore::new_in_memory().unwrap()
    }

    fn handle(site_id: i64, lemma: &str, frequency: i64) -> LemmaHandle {
        Arc::new(Mutex::new(LemmaRecord {
            id: None,
            site_id,
            lemma: lemma.to_string(),
            frequency,
        }))
    }

    #[test]
    fn test_create_and_find_site() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();
        assert_eq!(site.status, SiteStatus::Indexing);

        let found = store.find_site_by_url("https://example.com").unwrap();
        assert_eq!(found.map(|s| s.id), Some(site.id));

        assert!(store.find_site_by_url("https://other.com").unwrap().is_none());
    }

    #[test]
    fn test_find_site_by_host() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();

        let found = store.find_site_by_host("example.com").unwrap();
        assert_eq!(found.map(|s| s.id), Some(site.id));

        // Subdomain resolves to the configured site
        let found = store.find_site_by_host("sub.example.com").unwrap();
        assert!(found.is_some());

        // Substring host does not
        assert!(store.find_site_by_host("notexample.com").unwrap().is_none());
    }

    #[test]
    fn test_update_site_status() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();

        store
            .update_site_status(site.id, SiteStatus::Failed, Some("boom"))
            .unwrap();
        let reloaded = store.find_site_by_url("https://example.com").unwrap().unwrap();
        assert_eq!(reloaded.status, SiteStatus::Failed);
        assert_eq!(reloaded.last_error.as_deref(), Some("boom"));

        store.update_site_status(site.id, SiteStatus::Indexed, None).unwrap();
        let reloaded = store.find_site_by_url("https://example.com").unwrap().unwrap();
        assert_eq!(reloaded.status, SiteStatus::Indexed);
        assert!(reloaded.last_error.is_none());
    }

    #[test]
    fn test_insert_or_get_page_dedupes_on_path() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();

        let mut first = PageRecord {
            id: 0,
            site_id: site.id,
            path: "/a".to_string(),
            code: 200,
            content: "<html>one</html>".to_string(),
        };
        assert!(store.insert_or_get_page(&mut first).unwrap());

        let mut second = PageRecord {
            id: 0,
            site_id: site.id,
            path: "/a".to_string(),
            code: 200,
            content: "<html>two</html>".to_string(),
        };
        assert!(!store.insert_or_get_page(&mut second).unwrap());

        // Existing row is reused, content not overwritten
        assert_eq!(second.id, first.id);
        assert_eq!(second.content, "<html>one</html>");
        assert_eq!(store.pages_for_site(site.id).unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_page_overwrites() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();

        let mut page = PageRecord {
            id: 0,
            site_id: site.id,
            path: "/a".to_string(),
            code: 200,
            content: "old".to_string(),
        };
        store.upsert_page(&mut page).unwrap();
        let first_id = page.id;

        page.content = "new".to_string();
        page.code = 304;
        store.upsert_page(&mut page).unwrap();

        assert_eq!(page.id, first_id);
        let reloaded = store.find_page(site.id, "/a").unwrap().unwrap();
        assert_eq!(reloaded.content, "new");
        assert_eq!(reloaded.code, 304);
    }

    #[test]
    fn test_lemma_batch_insert_then_update() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();

        let cat = handle(site.id, "cat", 3);
        store.save_lemmas_batch(&[cat.clone()]).unwrap();
        let id = cat.lock().unwrap().id;
        assert!(id.is_some());

        cat.lock().unwrap().frequency = 8;
        store.save_lemmas_batch(&[cat.clone()]).unwrap();
        assert_eq!(cat.lock().unwrap().id, id);

        let found = store.find_lemma(site.id, "cat").unwrap().unwrap();
        assert_eq!(found.frequency, 8);
        assert_eq!(store.lemmas_for_site(site.id).unwrap().len(), 1);
    }

    #[test]
    fn test_indices_roundtrip_and_removal() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();
        let mut page = PageRecord {
            id: 0,
            site_id: site.id,
            path: "/".to_string(),
            code: 200,
            content: String::new(),
        };
        store.insert_or_get_page(&mut page).unwrap();

        let cat = handle(site.id, "cat", 5);
        store.save_lemmas_batch(&[cat.clone()]).unwrap();
        let lemma_id = cat.lock().unwrap().id.unwrap();

        store
            .save_indices_batch(&[IndexEntry {
                page_id: page.id,
                lemma_id,
                rank: 5.0,
            }])
            .unwrap();
        assert_eq!(store.indices_for_page(page.id).unwrap().len(), 1);

        let removed = store.delete_indices_for_page(page.id).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].lemma, "cat");
        assert_eq!(removed[0].rank, 5.0);
        assert!(store.indices_for_page(page.id).unwrap().is_empty());

        store.adjust_lemma_frequencies(&removed).unwrap();
        let lemma = store.find_lemma(site.id, "cat").unwrap().unwrap();
        assert_eq!(lemma.frequency, 0);
    }

    #[test]
    fn test_adjust_clamps_at_zero() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();
        let cat = handle(site.id, "cat", 2);
        store.save_lemmas_batch(&[cat.clone()]).unwrap();
        let lemma_id = cat.lock().unwrap().id.unwrap();

        store
            .adjust_lemma_frequencies(&[RemovedIndex {
                lemma_id,
                lemma: "cat".to_string(),
                rank: 10.0,
            }])
            .unwrap();
        assert_eq!(store.find_lemma(site.id, "cat").unwrap().unwrap().frequency, 0);
    }

    #[test]
    fn test_reset_all_truncates_everything() {
        let store = store();
        let site = store.create_site("https://example.com", "Example").unwrap();
        let mut page = PageRecord {
            id: 0,
            site_id: site.id,
            path: "/".to_string(),
            code: 200,
            content: String::new(),
        };
        store.insert_or_get_page(&mut page).unwrap();
        let cat = handle(site.id, "cat", 1);
        store.save_lemmas_batch(&[cat]).unwrap();

        store.reset_all().unwrap();
        assert!(store.all_sites().unwrap().is_empty());
        assert!(store.find_page(site.id, "/").unwrap().is_none());
        assert!(store.find_lemma(site.id, "cat").unwrap().is_none());
    }
}
