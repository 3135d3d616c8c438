//! Configuration module for Dokkan-Archive
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use dokkan_archive::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Fetching from {}", config.source.base_url);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, FetchStrategy, OutputConfig, SourceConfig, UserAgentConfig,
};

pub use parser::{
    compute_config_hash, hash_with_overrides, load_config, load_config_with_hash, parse_config,
};
