//! Configuration loading and validation

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    CachesConfig, Config, DatabaseConfig, FetcherConfig, IndexingConfig, ServerConfig, SiteEntry,
};
pub use validation::validate;
