//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use loopcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling from {} seeds", config.seeds.len());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, CrawlerConfig, IndexConfig, LogConfig, StorageConfig, UserAgentConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
