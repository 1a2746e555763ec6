//! # ai-feed-core
//!
//! Core library for ai-feed - recommends one article from a set of RSS/Atom
//! feeds, with an AI-written comment, to chat destinations.
//!
//! This library provides:
//! - The recommend history cache that keeps articles from being posted twice
//! - Configuration and profile loading, merging and validation
//! - Feed fetching, AI backends and output destinations
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! A run moves through three stages:
//! - **Profile:** YAML → [`profile::RawProfile`] → [`profile::Profile`]
//!   (secrets resolved) → merge over the default profile → validate →
//!   [`profile::RuntimeProfile`]
//! - **Recommend:** fetch feeds, drop articles in the history cache, let the
//!   AI backend pick one and comment on it
//! - **Post:** render each destination's template and post; record the
//!   article in the history cache once every destination accepted it
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ai_feed_core::{profile, Config, Pipeline};
//!
//! let loaded = Config::load_from(Path::new("config.yml"))
//!     .and_then(|config| config.to_entity())
//!     .expect("failed to load config");
//!
//! let mut merged = loaded.default_profile.clone();
//! profile::merge(&mut merged, None);
//! let runtime = merged.into_runtime().expect("invalid profile");
//!
//! let pipeline = Pipeline::new(runtime, loaded.cache.clone());
//! let urls = vec!["https://blog.rust-lang.org/feed.xml".to_string()];
//! let outcome = ai_feed_core::recommend::run_blocking(&pipeline, &urls);
//! ```

// Re-export commonly used items at the crate root
pub use cache::{FileRecommendCache, RecommendCache};
pub use config::{CacheConfig, Config, LoadedConfig};
pub use error::{Error, Result};
pub use feed::Article;
pub use profile::{Profile, RawProfile, RuntimeProfile, ValidationResult};
pub use recommend::{Outcome, Pipeline, Recommendation};
pub use secret::Secret;

// Public modules
pub mod ai;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod output;
pub mod profile;
pub mod recommend;
pub mod secret;
pub mod template;

mod http;
