use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub indexing: IndexingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub caches: CachesConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Indexing pipeline knobs
#[derive(Debug, Clone, Deserialize)]
pub struct IndexingConfig {
    /// Worker-pool size per site (and bound on concurrent site tasks)
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Flush granularity of the lemma/index writer
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,
}

/// HTTP control-surface configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:8080"
    pub listen: String,
}

/// Database location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Cache bounds and idle TTLs
#[derive(Debug, Clone, Deserialize)]
pub struct CachesConfig {
    #[serde(rename = "page-url-max", default = "default_page_url_max")]
    pub page_url_max: u64,

    #[serde(rename = "page-url-idle-secs", default = "default_idle_secs")]
    pub page_url_idle_secs: u64,

    #[serde(rename = "lemma-max", default = "default_lemma_max")]
    pub lemma_max: u64,

    #[serde(rename = "lemma-idle-secs", default = "default_idle_secs")]
    pub lemma_idle_secs: u64,
}

/// Fetcher overrides
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetcherConfig {
    /// Replaces the built-in binary/media extension skip-list when set
    #[serde(rename = "skipped-extensions")]
    pub skipped_extensions: Option<Vec<String>>,
}

/// One configured site: seed URL plus display name
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    pub url: String,
    pub name: String,
}

fn default_parallelism() -> usize {
    8
}

fn default_batch_size() -> usize {
    5000
}

fn default_page_url_max() -> u64 {
    600
}

fn default_lemma_max() -> u64 {
    10_000
}

fn default_idle_secs() -> u64 {
    600
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for CachesConfig {
    fn default() -> Self {
        Self {
            page_url_max: default_page_url_max(),
            page_url_idle_secs: default_idle_secs(),
            lemma_max: default_lemma_max(),
            lemma_idle_secs: default_idle_secs(),
        }
    }
}
