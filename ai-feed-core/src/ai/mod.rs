//! AI backends: article selection and comment generation.

pub mod gemini;
pub mod mock;

pub use gemini::{GeminiRecommender, GeminiSettings, DEFAULT_GEMINI_BASE_URL};
pub use mock::{MockRecommender, MockSettings, SelectorMode, DEFAULT_MOCK_COMMENT};

use async_trait::async_trait;

use crate::error::Result;
use crate::feed::Article;
use crate::template::MessageTemplate;

/// The one backend a run uses. Mock wins over Gemini when enabled.
#[derive(Debug, Clone, PartialEq)]
pub enum AiBackend {
    Gemini(GeminiSettings),
    Mock(MockSettings),
}

impl AiBackend {
    pub fn name(&self) -> &'static str {
        match self {
            AiBackend::Gemini(_) => "gemini",
            AiBackend::Mock(_) => "mock",
        }
    }
}

/// Prompts sent to the backend.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub system_prompt: String,
    pub selector_prompt: String,
    pub comment_prompt: MessageTemplate,
    pub fixed_message: String,
}

#[async_trait]
pub trait Recommender: Send + Sync {
    /// Index into `articles` of the article to recommend.
    async fn select_article(&self, articles: &[Article]) -> Result<usize>;

    /// A short comment to post with `article`.
    async fn generate_comment(&self, article: &Article) -> Result<String>;
}

/// Build the recommender for `backend`.
pub fn recommender_for(backend: &AiBackend, prompts: &Prompts) -> Result<Box<dyn Recommender>> {
    match backend {
        AiBackend::Gemini(settings) => Ok(Box::new(GeminiRecommender::new(
            settings.clone(),
            prompts.clone(),
        )?)),
        AiBackend::Mock(settings) => Ok(Box::new(MockRecommender::new(settings.clone()))),
    }
}
