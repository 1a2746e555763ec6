//! Redacted secret values and their resolution from config or environment.

use std::fmt;

use crate::error::{Error, Result};

const REDACTED: &str = "[REDACTED]";

/// A string that never shows up in `Display` or `Debug` output.
///
/// Only [`Secret::value`] hands out the cleartext.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The cleartext value.
    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Resolve a secret from an inline value or an environment variable name.
///
/// A non-empty `inline` wins. Otherwise `env_var` is read; an unset or empty
/// variable is [`Error::SecretUnset`]. Both empty yields an empty secret and
/// leaves the decision to validation.
pub fn resolve_secret(field: &str, inline: &str, env_var: &str) -> Result<Secret> {
    resolve_secret_with(field, inline, env_var, |name| std::env::var(name).ok())
}

/// Like [`resolve_secret`] with an injectable environment lookup.
pub fn resolve_secret_with<F>(field: &str, inline: &str, env_var: &str, lookup: F) -> Result<Secret>
where
    F: FnOnce(&str) -> Option<String>,
{
    if !inline.is_empty() {
        return Ok(Secret::new(inline));
    }
    if env_var.is_empty() {
        return Ok(Secret::default());
    }
    match lookup(env_var) {
        Some(value) if !value.is_empty() => Ok(Secret::new(value)),
        _ => Err(Error::SecretUnset {
            field: field.to_string(),
            var: env_var.to_string(),
        }),
    }
}
