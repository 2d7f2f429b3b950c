use crate::config::types::{CachesConfig, Config, IndexingConfig, SiteEntry};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_indexing(&config.indexing)?;
    validate_server(&config.server.listen)?;
    validate_database(&config.database.path)?;
    validate_caches(&config.caches)?;
    validate_sites(&config.sites)?;
    Ok(())
}

fn validate_indexing(config: &IndexingConfig) -> Result<(), ConfigError> {
    if config.parallelism < 1 {
        return Err(ConfigError::Validation(format!(
            "parallelism must be >= 1, got {}",
            config.parallelism
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

fn validate_server(listen: &str) -> Result<(), ConfigError> {
    listen.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("invalid listen address '{}': {}", listen, e))
    })?;
    Ok(())
}

fn validate_database(path: &str) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_caches(config: &CachesConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("page-url-max", config.page_url_max),
        ("lemma-max", config.lemma_max),
    ] {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one site must be configured".to_string(),
        ));
    }

    for site in sites {
        if site.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has an empty name",
                site.url
            )));
        }

        let url = Url::parse(&site.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("site URL '{}': {}", site.url, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "site URL '{}' must use http or https",
                site.url
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "site URL '{}' has no host",
                site.url
            )));
        }
    }

    Ok(())
}
