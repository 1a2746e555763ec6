//! Slack Web API (`chat.postMessage`).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::Poster;
use crate::error::{Error, Result};
use crate::http;
use crate::recommend::Recommendation;
use crate::secret::Secret;
use crate::template::MessageTemplate;

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

const DESTINATION: &str = "slack_api";

#[derive(Debug, Clone, PartialEq)]
pub struct SlackApiSettings {
    pub api_token: Secret,
    pub channel: String,
    pub api_url: String,
    pub username: Option<String>,
    pub icon_url: Option<String>,
    pub icon_emoji: Option<String>,
    pub message_template: MessageTemplate,
}

#[derive(Debug, Serialize, PartialEq)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

pub struct SlackPoster {
    settings: SlackApiSettings,
    http: reqwest::Client,
}

impl SlackPoster {
    pub fn new(settings: SlackApiSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.api_token.value()))
            .map_err(|e| Error::Config(format!("invalid output.slack_api.api_token: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            http: http::client(http::DEFAULT_TIMEOUT, headers)?,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat.postMessage", self.settings.api_url.trim_end_matches('/'))
    }

    fn payload<'a>(&'a self, text: &'a str) -> PostMessage<'a> {
        PostMessage {
            channel: &self.settings.channel,
            text,
            username: self.settings.username.as_deref(),
            icon_url: self.settings.icon_url.as_deref(),
            icon_emoji: self.settings.icon_emoji.as_deref(),
        }
    }
}

#[async_trait]
impl Poster for SlackPoster {
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
            .json(&self.payload(&text))
            .send()
            .await
            .map_err(|e| post_error(format!("request failed: {}", e)))?;
        let body = http::read_body(response).await.map_err(post_error)?;

        let ts = check_response(&body).map_err(post_error)?;
        tracing::debug!(channel = %self.settings.channel, ts = %ts, "Slack message posted");
        Ok(())
    }
}

fn post_error(message: String) -> Error {
    Error::Post {
        destination: DESTINATION.to_string(),
        message,
    }
}

/// Slack answers 200 even on failure; `ok: false` carries the error code.
fn check_response(body: &str) -> std::result::Result<String, String> {
    let response: PostMessageResponse = serde_json::from_str(body)
        .map_err(|e| format!("unexpected response: {}", e))?;
    if response.ok {
        Ok(response.ts.unwrap_or_default())
    } else {
        Err(response
            .error
            .unwrap_or_else(|| "unknown_error".to_string()))
    }
}
