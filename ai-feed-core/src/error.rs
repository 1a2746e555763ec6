//! Error types for ai-feed-core

use std::path::PathBuf;

use thiserror::Error;

use crate::profile::ValidationResult;
use crate::template::TemplateError;

/// Main error type for the ai-feed-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Another process (or a stale lock file) owns the history cache
    #[error(
        "recommend history is locked by another process: {}. \
         If no other ai-feed is running, delete this file and retry",
        path.display()
    )]
    LockHeld { path: PathBuf },

    /// The history file cannot be read as a stream of lines
    #[error("recommend history file {} is corrupted: {source}", path.display())]
    Corrupted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem permissions prevent reading or writing
    #[error("permission denied: {}: {source}", path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache directory could not be created
    #[error("failed to create cache directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mutating cache operation ran outside `initialize`/`close`
    #[error("recommend history cache is not open")]
    CacheNotOpen,

    /// A `*_env` reference points at a missing or empty variable
    #[error("environment variable {var} (referenced by {field}) is not set or empty")]
    SecretUnset { field: String, var: String },

    /// Batched validation failures
    #[error("{0}")]
    Validation(ValidationResult),

    /// Template alias or syntax error
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Feed fetch or parse error
    #[error("failed to fetch feed from {url}: {message}")]
    Feed { url: String, message: String },

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Posting to a single destination failed
    #[error("failed to post to {destination}: {message}")]
    Post {
        destination: String,
        message: String,
    },

    /// One or more destinations failed during fan-out
    #[error("{}", render_post_failures(.0))]
    PostFailures(Vec<Error>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn render_post_failures(errors: &[Error]) -> String {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!(
        "{} destination(s) failed: {}",
        errors.len(),
        details.join("; ")
    )
}

/// Result type alias for ai-feed-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_held_names_lock_path() {
        let err = Error::LockHeld {
            path: PathBuf::from("/tmp/history.jsonl.lock"),
        };
        let message = err.to_string();
        assert!(message.contains("/tmp/history.jsonl.lock"));
        assert!(message.contains("delete this file"));
    }

    #[test]
    fn test_post_failures_lists_every_destination() {
        let err = Error::PostFailures(vec![
            Error::Post {
                destination: "slack".to_string(),
                message: "channel_not_found".to_string(),
            },
            Error::Post {
                destination: "misskey".to_string(),
                message: "401".to_string(),
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("2 destination(s) failed"));
        assert!(message.contains("slack"));
        assert!(message.contains("misskey"));
    }
}
