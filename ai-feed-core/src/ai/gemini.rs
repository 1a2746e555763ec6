//! Google Gemini backend (`generateContent` REST API).

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

use super::{Prompts, Recommender};
use crate::cache::normalize_url;
use crate::error::{Error, Result};
use crate::feed::Article;
use crate::http;
use crate::secret::Secret;
use crate::template::TemplateContext;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Characters of article content included in the selection list.
const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiSettings {
    pub model: String,
    pub api_key: Secret,
    pub base_url: String,
}

impl GeminiSettings {
    pub fn new(model: impl Into<String>, api_key: Secret) -> Self {
        Self {
            model: model.into(),
            api_key,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.model)
        )
    }
}

pub struct GeminiRecommender {
    settings: GeminiSettings,
    prompts: Prompts,
    http: reqwest::Client,
}

impl GeminiRecommender {
    pub fn new(settings: GeminiSettings, prompts: Prompts) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(settings.api_key.value())
            .map_err(|e| Error::Config(format!("invalid ai.gemini.api_key: {}", e)))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        Ok(Self {
            http: http::client(http::DEFAULT_TIMEOUT * 2, headers)?,
            settings,
            prompts,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = request_body(&self.prompts.system_prompt, prompt);
        let response = self
            .http
            .post(self.settings.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("gemini request failed: {}", e)))?;
        let text = http::read_body(response)
            .await
            .map_err(|e| Error::Llm(format!("gemini returned {}", e)))?;
        let json: Value = serde_json::from_str(&text)?;
        extract_text(&json)
    }
}

#[async_trait]
impl Recommender for GeminiRecommender {
    async fn select_article(&self, articles: &[Article]) -> Result<usize> {
        if articles.is_empty() {
            return Err(Error::Llm("no articles to choose from".to_string()));
        }
        let prompt = selection_prompt(&self.prompts.selector_prompt, articles);
        let reply = self.complete(&prompt).await?;
        tracing::debug!(model = %self.settings.model, reply = %reply.trim(), "Gemini selection reply");
        match_selection(&reply, articles)
    }

    async fn generate_comment(&self, article: &Article) -> Result<String> {
        let ctx = TemplateContext::new(article, "", &self.prompts.fixed_message);
        let prompt = self.prompts.comment_prompt.render(&ctx)?;
        let reply = self.complete(&prompt).await?;
        Ok(reply.trim().to_string())
    }
}

fn request_body(system_prompt: &str, prompt: &str) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
    });
    if !system_prompt.is_empty() {
        body["system_instruction"] = json!({ "parts": [{ "text": system_prompt }] });
    }
    body
}

/// The selector prompt followed by a numbered article list.
pub fn selection_prompt(selector_prompt: &str, articles: &[Article]) -> String {
    let mut prompt = selector_prompt.trim_end().to_string();
    prompt.push_str("\n\nArticles:\n");
    for (i, article) in articles.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n   URL: {}\n", i + 1, article.title, article.link));
        let summary = summarize(&article.content);
        if !summary.is_empty() {
            prompt.push_str(&format!("   Summary: {}\n", summary));
        }
    }
    prompt
}

fn summarize(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(SUMMARY_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

/// Map a selection reply back to an article index.
///
/// A URL from the list wins (earliest in the reply); otherwise the first
/// number that is a valid 1-based position.
pub fn match_selection(reply: &str, articles: &[Article]) -> Result<usize> {
    let by_url = articles
        .iter()
        .enumerate()
        .filter_map(|(i, article)| {
            let link = normalize_url(&article.link);
            if link.is_empty() {
                return None;
            }
            reply.find(link).map(|pos| (pos, std::cmp::Reverse(link.len()), i))
        })
        .min();
    if let Some((_, _, index)) = by_url {
        return Ok(index);
    }

    static NUMBER: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    let number = NUMBER
        .get_or_init(|| Regex::new(r"\d+").map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| Error::Llm(format!("invalid number pattern: {}", e)))?;
    for m in number.find_iter(reply) {
        if let Ok(n) = m.as_str().parse::<usize>() {
            if (1..=articles.len()).contains(&n) {
                return Ok(n - 1);
            }
        }
    }

    Err(Error::Llm(format!(
        "could not match selection reply to an article: {:?}",
        reply.trim()
    )))
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(response: &Value) -> Result<String> {
    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(Error::Llm(format!("gemini blocked the prompt: {}", reason)));
    }

    let text: String = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = response
            .pointer("/candidates/0/finishReason")
            .and_then(Value::as_str)
            .unwrap_or("no candidates");
        return Err(Error::Llm(format!("gemini returned no text ({})", reason)));
    }
    Ok(text)
}
