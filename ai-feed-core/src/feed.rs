//! RSS/Atom fetching and parsing.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;

use crate::cache::normalize_url;
use crate::error::{Error, Result};
use crate::http;

/// One feed entry that can be recommended.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    /// Content body, else the summary; may be HTML
    pub content: String,
    pub published: Option<DateTime<Utc>>,
}

/// Parse an RSS 2.0 or Atom document. Entries without a link are dropped.
pub fn parse_feed(bytes: &[u8]) -> std::result::Result<Vec<Article>, String> {
    let feed = feed_rs::parser::parse(Cursor::new(bytes)).map_err(|e| e.to_string())?;

    let articles = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry_link(&entry)?;
            let title = entry
                .title
                .as_ref()
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default();
            let content = entry
                .content
                .as_ref()
                .and_then(|c| c.body.clone())
                .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
                .unwrap_or_default();
            Some(Article {
                title,
                link,
                content,
                published: entry.published.or(entry.updated),
            })
        })
        .collect();
    Ok(articles)
}

fn entry_link(entry: &feed_rs::model::Entry) -> Option<String> {
    let mut hrefs = entry
        .links
        .iter()
        .map(|link| (link.rel.as_deref().unwrap_or(""), link.href.trim()))
        .filter(|(_, href)| !href.is_empty());
    let first = hrefs.clone().next().map(|(_, href)| href);
    hrefs
        .find(|(rel, _)| rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
        .map(|(_, href)| href)
        .or(first)
        .map(ToString::to_string)
}

/// Read feed URLs from a file: one per line, blank lines and `#` comments skipped.
pub fn read_source_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read source file {}: {}", path.display(), e))
    })?;
    Ok(parse_source_list(&content))
}

fn parse_source_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

pub struct FeedFetcher {
    http: reqwest::Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: http::client(http::DEFAULT_TIMEOUT, HeaderMap::new())?,
        })
    }

    /// Fetch and parse one feed.
    pub async fn fetch(&self, url: &str) -> Result<Vec<Article>> {
        let feed_error = |message: String| Error::Feed {
            url: url.to_string(),
            message,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| feed_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(feed_error(format!("HTTP {}", status.as_u16())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| feed_error(e.to_string()))?;

        let articles = parse_feed(&bytes).map_err(feed_error)?;
        tracing::debug!(url = %url, articles = articles.len(), "Fetched feed");
        Ok(articles)
    }

    /// Fetch every feed in order, skipping failures.
    ///
    /// Articles with a link already seen in an earlier feed are dropped.
    /// Fails only if every feed failed.
    pub async fn fetch_all(&self, urls: &[String]) -> Result<Vec<Article>> {
        let mut articles = Vec::new();
        let mut seen = HashSet::new();
        let mut last_error = None;
        let mut fetched = 0usize;

        for url in urls {
            match self.fetch(url).await {
                Ok(batch) => {
                    fetched += 1;
                    for article in batch {
                        if seen.insert(normalize_url(&article.link).to_string()) {
                            articles.push(article);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Skipping feed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if fetched == 0 => Err(e),
            _ => Ok(articles),
        }
    }
}
