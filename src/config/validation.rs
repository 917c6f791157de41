use crate::config::types::{Config, CrawlerConfig, IndexConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound for the fetch concurrency ceiling
const MAX_CONCURRENT_FETCHES: usize = 1000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seeds(&config.seeds)?;
    validate_keywords(&config.keywords)?;
    validate_crawler_config(&config.crawler)?;
    validate_storage_config(&config.storage)?;
    if let Some(index) = &config.index {
        validate_index_config(index)?;
    }
    Ok(())
}

/// Validates seed URLs: at least one, each an absolute http(s) URL
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use the http or https scheme",
                seed
            )));
        }
    }

    Ok(())
}

fn validate_keywords(keywords: &[String]) -> Result<(), ConfigError> {
    if keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "keywords cannot contain empty entries".to_string(),
        ));
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.frontier_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "frontier-capacity must be >= 1, got {}",
            config.frontier_capacity
        )));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > MAX_CONCURRENT_FETCHES
    {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and {}, got {}",
            MAX_CONCURRENT_FETCHES, config.max_concurrent_fetches
        )));
    }

    if config.request_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.max_content_bytes < 1 {
        return Err(ConfigError::Validation(
            "max-content-bytes must be >= 1".to_string(),
        ));
    }

    if config.report_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "report-interval-secs must be >= 1".to_string(),
        ));
    }

    if config.freshness_window_secs > i64::MAX as u64 / 1000 {
        return Err(ConfigError::Validation(format!(
            "freshness-window-secs is too large: {}",
            config.freshness_window_secs
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    Url::parse(&config.address)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid index address: {}", e)))?;

    if config.index_name.is_empty() {
        return Err(ConfigError::Validation(
            "index-name cannot be empty".to_string(),
        ));
    }

    Ok(())
}
