//! Recommend history cache
//!
//! Remembers which article URLs were already posted so `recommend` does not
//! post them again.
//!
//! ## Storage
//!
//! - History file: `~/.ai-feed/recommend_history.jsonl` by default, one JSON
//!   object per line (see [`codec`]).
//! - Lock file: `<history file>.lock`, present while a process owns the
//!   history (see [`lock`]).
//! - Writes go to `<history file>.tmp`, are fsynced, then renamed over the
//!   history file.
//!
//! ## Eviction
//!
//! - Retention: entries older than `retention_days` are dropped when the
//!   cache is opened.
//! - Capacity: once more than `max_entries` are held, the oldest inserted
//!   entries are dropped first.

pub mod codec;
pub mod lock;
mod normalize;
mod store;

pub use codec::HistoryEntry;
pub use lock::{lock_path_for, FileLock};
pub use normalize::normalize_url;
pub use store::{CacheState, FileRecommendCache};

use crate::config::CacheConfig;
use crate::error::Result;

/// Operations the recommend pipeline needs from a history cache.
pub trait RecommendCache {
    /// Whether `url` (after normalization) was posted before.
    fn is_cached(&self, url: &str) -> bool;

    /// Record a posted URL and persist the history.
    fn add_entry(&mut self, url: &str, title: &str) -> Result<()>;

    /// Release the lock. Safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

/// Cache used when no `cache` section is configured.
#[derive(Debug, Default)]
pub struct NopRecommendCache;

impl RecommendCache for NopRecommendCache {
    fn is_cached(&self, _url: &str) -> bool {
        false
    }

    fn add_entry(&mut self, _url: &str, _title: &str) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Open the configured cache, or a no-op cache when none is configured.
pub fn open_cache(config: Option<&CacheConfig>) -> Result<Box<dyn RecommendCache>> {
    match config {
        Some(config) => {
            let mut cache = FileRecommendCache::new(config.clone());
            cache.initialize()?;
            Ok(Box::new(cache))
        }
        None => Ok(Box::new(NopRecommendCache)),
    }
}
