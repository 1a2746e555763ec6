//! Offline recommender for dry runs and tests.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use super::Recommender;
use crate::error::{Error, Result};
use crate::feed::Article;

pub const DEFAULT_MOCK_COMMENT: &str = "This is a mock comment.";

/// How the mock picks an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectorMode {
    #[default]
    First,
    Random,
    Last,
}

impl FromStr for SelectorMode {
    type Err = String;

    /// Empty selects the default.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "" | "first" => Ok(SelectorMode::First),
            "random" => Ok(SelectorMode::Random),
            "last" => Ok(SelectorMode::Last),
            other => Err(format!("unknown selector mode: {}", other)),
        }
    }
}

impl fmt::Display for SelectorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectorMode::First => "first",
            SelectorMode::Random => "random",
            SelectorMode::Last => "last",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSettings {
    pub selector_mode: SelectorMode,
    pub comment: String,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            selector_mode: SelectorMode::First,
            comment: DEFAULT_MOCK_COMMENT.to_string(),
        }
    }
}

pub struct MockRecommender {
    settings: MockSettings,
}

impl MockRecommender {
    pub fn new(settings: MockSettings) -> Self {
        Self { settings }
    }

    fn pick(&self, len: usize) -> usize {
        match self.settings.selector_mode {
            SelectorMode::First => 0,
            SelectorMode::Last => len - 1,
            SelectorMode::Random => fastrand::usize(..len),
        }
    }
}

#[async_trait]
impl Recommender for MockRecommender {
    async fn select_article(&self, articles: &[Article]) -> Result<usize> {
        if articles.is_empty() {
            return Err(Error::Llm("no articles to choose from".to_string()));
        }
        let index = self.pick(articles.len());
        tracing::debug!(
            mode = %self.settings.selector_mode,
            index,
            "Mock selector picked article"
        );
        Ok(index)
    }

    async fn generate_comment(&self, _article: &Article) -> Result<String> {
        Ok(self.settings.comment.clone())
    }
}
