//! Misskey notes API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;

use super::Poster;
use crate::error::{Error, Result};
use crate::http;
use crate::recommend::Recommendation;
use crate::secret::Secret;
use crate::template::MessageTemplate;

const DESTINATION: &str = "misskey";

#[derive(Debug, Clone, PartialEq)]
pub struct MisskeySettings {
    pub api_token: Secret,
    /// Instance base URL, e.g. `https://misskey.io`
    pub api_url: String,
    pub message_template: MessageTemplate,
}

#[derive(Debug, Serialize)]
struct CreateNote<'a> {
    text: &'a str,
    visibility: &'static str,
}

pub struct MisskeyPoster {
    settings: MisskeySettings,
    http: reqwest::Client,
}

impl MisskeyPoster {
    pub fn new(settings: MisskeySettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.api_token.value()))
            .map_err(|e| Error::Config(format!("invalid output.misskey.api_token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            http: http::client(http::DEFAULT_TIMEOUT, headers)?,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/notes/create", self.settings.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Poster for MisskeyPoster {
    fn name(&self) -> &str {
        DESTINATION
    }

    async fn post(&self, recommendation: &Recommendation) -> Result<()> {
        let text = self
            .settings
            .message_template
            .render(&recommendation.context())?;

        let response = self
            .http
            .post(self.endpoint())
            .json(&CreateNote {
                text: &text,
                visibility: "public",
            })
            .send()
            .await
            .map_err(|e| post_error(format!("request failed: {}", e)))?;
        let body = http::read_body(response).await.map_err(post_error)?;

        match created_note_id(&body) {
            Some(id) => tracing::debug!(note_id = %id, "Misskey note created"),
            None => tracing::debug!("Misskey note created"),
        }
        Ok(())
    }
}

fn post_error(message: String) -> Error {
    Error::Post {
        destination: DESTINATION.to_string(),
        message,
    }
}

fn created_note_id(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.pointer("/createdNote/id")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_url: &str) -> MisskeySettings {
        MisskeySettings {
            api_token: Secret::new("token"),
            api_url: api_url.to_string(),
            message_template: MessageTemplate::parse("{{URL}}").unwrap(),
        }
    }

    #[test]
    fn test_endpoint() {
        let poster = MisskeyPoster::new(settings("https://misskey.io/")).unwrap();
        assert_eq!(poster.endpoint(), "https://misskey.io/api/notes/create");
    }

    #[test]
    fn test_note_body() {
        let body = serde_json::to_string(&CreateNote {
            text: "hi",
            visibility: "public",
        })
        .unwrap();
        assert_eq!(body, r#"{"text":"hi","visibility":"public"}"#);
    }

    #[test]
    fn test_created_note_id() {
        assert_eq!(
            created_note_id(r#"{"createdNote":{"id":"9abc"}}"#).as_deref(),
            Some("9abc")
        );
        assert_eq!(created_note_id("{}"), None);
        assert_eq!(created_note_id("not json"), None);
    }
}
