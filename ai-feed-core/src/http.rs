//! Shared HTTP client construction.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::{Error, Result};

pub const USER_AGENT: &str = concat!("ai-feed/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client with the ai-feed user agent and the given default headers.
pub fn client(timeout: Duration, headers: HeaderMap) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))
}

/// Read a response body; a non-2xx status becomes an error message with the body.
pub async fn read_body(
    response: reqwest::Response,
) -> std::result::Result<String, String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| format!("failed to read response body: {}", e))?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(format!("HTTP {}: {}", status.as_u16(), truncate(&body, 300)))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("ai-feed/"));
        assert!(USER_AGENT.len() > "ai-feed/".len());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[test]
    fn test_client_builds() {
        assert!(client(DEFAULT_TIMEOUT, HeaderMap::new()).is_ok());
    }
}
