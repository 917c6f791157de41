use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URLs pushed into the frontier once at startup
    pub seeds: Vec<String>,

    /// Keywords scored on every page (matched case-insensitively)
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,

    pub storage: StorageConfig,

    /// Search index connection; indexing is disabled when absent
    #[serde(default)]
    pub index: Option<IndexConfig>,

    #[serde(default)]
    pub log: Option<LogConfig>,
}

/// Crawl pipeline tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Capacity of the frontier queue (the admission-control bound)
    pub frontier_capacity: usize,

    /// Maximum number of HTTP requests in flight at once
    pub max_concurrent_fetches: usize,

    /// Per-request deadline (milliseconds)
    pub request_timeout_ms: u64,

    /// Pause between consecutive fetch dispatches (milliseconds)
    pub fetch_delay_ms: u64,

    /// Largest response body accepted, in bytes
    pub max_content_bytes: usize,

    /// Extra attempts for timeouts, connection errors and 5xx responses
    pub max_retries: u32,

    /// Base backoff before the first retry, doubled on each further attempt (milliseconds)
    pub retry_backoff_ms: u64,

    /// Minimum age of a visit before the URL may be crawled again (seconds)
    pub freshness_window_secs: u64,

    /// Keyword score above which a page is reported as a valuable find
    pub valuable_threshold: usize,

    /// Interval between progress reports (seconds)
    pub report_interval_secs: u64,

    /// Stop the crawl after this many seconds
    pub max_duration_secs: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            frontier_capacity: 10,
            max_concurrent_fetches: 100,
            request_timeout_ms: 10_000,
            fetch_delay_ms: 0,
            max_content_bytes: 10 * 1024 * 1024,
            max_retries: 0,
            retry_backoff_ms: 500,
            freshness_window_secs: 6 * 60 * 60,
            valuable_threshold: 5,
            report_interval_secs: 10,
            max_duration_secs: None,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn freshness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.freshness_window_secs as i64)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

/// User agent sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
        }
    }
}

/// Page store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Search index connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Base URL of the OpenSearch/Elasticsearch node
    pub address: String,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_index_name() -> String {
    "pages_index".to_string()
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// File that receives JSON-formatted log lines instead of stderr
    pub path: String,
}
