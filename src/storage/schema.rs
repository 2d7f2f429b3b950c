//! Database schema definitions
//!
//! Four tables model the index: `site`, `page`, `lemma`, and `indexx`
//! (`indexx`/`rankk` spelled with a double letter to stay clear of SQL
//! keywords).

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS site (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    name TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('INDEXING', 'INDEXED', 'FAILED')),
    status_time TEXT NOT NULL,
    last_error TEXT
);

CREATE TABLE IF NOT EXISTS page (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES site(id),
    path TEXT NOT NULL,
    code INTEGER NOT NULL,
    content TEXT NOT NULL,
    UNIQUE(site_id, path)
);

CREATE INDEX IF NOT EXISTS idx_page_path ON page(path);

CREATE TABLE IF NOT EXISTS lemma (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES site(id),
    lemma TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    UNIQUE(site_id, lemma)
);

CREATE TABLE IF NOT EXISTS indexx (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES page(id),
    lemma_id INTEGER NOT NULL REFERENCES lemma(id),
    rankk REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_indexx_page ON indexx(page_id);
CREATE INDEX IF NOT EXISTS idx_indexx_lemma ON indexx(lemma_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}
