//! Configuration loading and management
//!
//! Configuration is loaded from `./config.yml` unless `--config` points
//! elsewhere. It carries the default profile that every run starts from, the
//! recommend history cache settings and logging settings.
//!
//! Other paths follow the XDG Base Directory Specification:
//! - State/Logs: `$XDG_STATE_HOME/ai-feed/` (~/.local/state/ai-feed/)

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::{Profile, RawProfile};

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Default recommend history location, relative to `$HOME`.
pub const DEFAULT_CACHE_FILE: &str = ".ai-feed/recommend_history.jsonl";

pub const DEFAULT_MAX_ENTRIES: usize = 1000;
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Returns a best-effort home directory path.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Profile every run starts from; user profiles are merged over it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<RawProfile>,

    /// Recommend history cache (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<RawCacheConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `cache` section as written in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCacheConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
}

/// Cache settings after defaults and path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Always absolute
    pub file_path: PathBuf,
    /// Always at least 1
    pub max_entries: usize,
    /// Always at least 1
    pub retention_days: u32,
}

impl RawCacheConfig {
    /// Apply defaults using `$HOME` and the current working directory.
    pub fn normalize(&self) -> Result<CacheConfig> {
        let cwd = std::env::current_dir().map_err(|e| {
            Error::Config(format!("failed to resolve current directory: {}", e))
        })?;
        Ok(self.normalize_with(&home_dir(), &cwd))
    }

    /// Apply defaults against explicit home and working directories.
    pub fn normalize_with(&self, home: &Path, cwd: &Path) -> CacheConfig {
        CacheConfig {
            enabled: self.enabled.unwrap_or(false),
            file_path: resolve_cache_path(&self.file_path, home, cwd),
            max_entries: positive_or(self.max_entries, DEFAULT_MAX_ENTRIES as i64) as usize,
            retention_days: positive_or(self.retention_days, i64::from(DEFAULT_RETENTION_DAYS))
                .min(i64::from(u32::MAX)) as u32,
        }
    }
}

/// Normalize an optional `cache` section; `None` stays `None`.
pub fn normalize_cache_config(raw: Option<&RawCacheConfig>) -> Result<Option<CacheConfig>> {
    raw.map(RawCacheConfig::normalize).transpose()
}

fn positive_or(value: Option<i64>, default: i64) -> i64 {
    match value {
        Some(v) if v > 0 => v,
        _ => default,
    }
}

fn resolve_cache_path(raw: &str, home: &Path, cwd: &Path) -> PathBuf {
    if raw.is_empty() {
        return home.join(DEFAULT_CACHE_FILE);
    }
    let expanded = expand_tilde(raw, home);
    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    }
}

/// Expand a leading `~` or `~/` to `home`. `~user` is left alone.
pub fn expand_tilde(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

/// Configuration with the default profile converted and cache defaults applied.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub default_profile: Profile,
    pub cache: Option<CacheConfig>,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::Config(format!(
                    "config file {} not found; run `ai-feed init` to create one",
                    path.display()
                ))
            } else {
                Error::Config(format!("failed to read config file {}: {}", path.display(), e))
            }
        })?;

        Self::parse(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Parse configuration from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Logging settings from `path`, or defaults if the file is missing or invalid.
    pub fn peek_logging(path: &Path) -> LoggingConfig {
        Self::load_from(path)
            .map(|config| config.logging)
            .unwrap_or_default()
    }

    /// Resolve secrets in the default profile and normalize the cache section.
    pub fn to_entity(&self) -> Result<LoadedConfig> {
        let default_profile = match &self.default_profile {
            Some(profile) => profile.to_entity()?,
            None => Profile::default(),
        };

        Ok(LoadedConfig {
            default_profile,
            cache: normalize_cache_config(self.cache.as_ref())?,
            logging: self.logging.clone(),
        })
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/ai-feed/` (~/.local/state/ai-feed/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("ai-feed")
    }
}

/// Write `contents` to a new file, refusing to overwrite an existing one.
pub fn write_new_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::Config(format!(
                "{} already exists; refusing to overwrite it",
                path.display()
            )))
        }
        Err(e) => return Err(Error::Io(e)),
    };
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

/// Starter configuration written by `ai-feed init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r##"# ai-feed configuration
#
# default_profile is the base every run starts from. A profile passed with
# --profile is merged over it field by field.
default_profile:
  ai:
    gemini:
      type: gemini-2.5-flash
      api_key_env: GEMINI_API_KEY
    mock:
      enabled: false
      selector_mode: first
      comment: "This is a mock comment."
  system_prompt: |
    You are a friendly tech curator who shares interesting articles with a team of software engineers.
  selector_prompt: |
    Pick the single most interesting article for software engineers from the list below.
    Reply with the URL of the article you picked and nothing else.
  comment_prompt_template: |
    Write a short, friendly comment (two sentences at most) recommending this article.
    Title: {{TITLE}}
    URL: {{URL}}
    Content:
    {{CONTENT}}
  fixed_message: ""
  # A disabled destination still reads its token when the variable is set,
  # so a profile can switch it on with just `enabled: true`.
  output:
    slack_api:
      enabled: false
      api_token_env: SLACK_API_TOKEN
      channel: "#general"
      message_template: |
        {{COMMENT}}
        <{{URL}}|{{TITLE}}>
        {{#if FIXED_MESSAGE}}{{FIXED_MESSAGE}}{{/if}}
    misskey:
      enabled: false
      api_token_env: MISSKEY_API_TOKEN
      api_url: https://misskey.io
      message_template: |
        {{COMMENT}}
        [{{TITLE}}]({{URL}})
        {{#if FIXED_MESSAGE}}{{FIXED_MESSAGE}}{{/if}}

# Remembers posted articles so they are not recommended twice.
cache:
  enabled: true
  file_path: ~/.ai-feed/recommend_history.jsonl
  max_entries: 1000
  retention_days: 30

logging:
  level: info
"##;
