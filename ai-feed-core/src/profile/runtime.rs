//! Validated profile turned into what the recommend pipeline runs on.

use super::entity::{MisskeyConfig, Profile, SlackApiConfig};
use super::validate::{validate, ValidationResult};
use crate::ai::{AiBackend, GeminiSettings, MockSettings, Prompts, DEFAULT_MOCK_COMMENT};
use crate::error::{Error, Result};
use crate::output::{Destination, MisskeySettings, SlackApiSettings, DEFAULT_SLACK_API_URL};
use crate::template::MessageTemplate;

#[derive(Debug, Clone)]
pub struct RuntimeProfile {
    pub backend: AiBackend,
    pub prompts: Prompts,
    /// Enabled destinations only
    pub destinations: Vec<Destination>,
    pub validation: ValidationResult,
}

impl Profile {
    /// Validate and convert. Fails with [`Error::Validation`] on any error.
    pub fn into_runtime(self) -> Result<RuntimeProfile> {
        let validation = validate(&self).into_result()?;

        let backend = self.backend()?;
        let prompts = Prompts {
            system_prompt: self.system_prompt,
            selector_prompt: self.selector_prompt,
            comment_prompt: MessageTemplate::parse(&self.comment_prompt_template)?,
            fixed_message: self.fixed_message,
        };

        let mut destinations = Vec::new();
        if let Some(output) = self.output {
            if let Some(slack) = output.slack_api.filter(SlackApiConfig::is_enabled) {
                destinations.push(Destination::SlackApi(slack_settings(slack)?));
            }
            if let Some(misskey) = output.misskey.filter(MisskeyConfig::is_enabled) {
                destinations.push(Destination::Misskey(misskey_settings(misskey)?));
            }
        }

        Ok(RuntimeProfile {
            backend,
            prompts,
            destinations,
            validation,
        })
    }

    fn backend(&self) -> Result<AiBackend> {
        let ai = self
            .ai
            .as_ref()
            .ok_or_else(|| Error::Config("no AI backend configured".to_string()))?;

        if let Some(mock) = ai.mock.as_ref().filter(|m| m.enabled) {
            let selector_mode = mock.selector_mode.parse().map_err(Error::Config)?;
            let comment = if mock.comment.is_empty() {
                DEFAULT_MOCK_COMMENT.to_string()
            } else {
                mock.comment.clone()
            };
            return Ok(AiBackend::Mock(MockSettings {
                selector_mode,
                comment,
            }));
        }

        match &ai.gemini {
            Some(gemini) => Ok(AiBackend::Gemini(GeminiSettings::new(
                gemini.model.clone(),
                gemini.api_key.clone(),
            ))),
            None => Err(Error::Config("no AI backend configured".to_string())),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_message_template(template: Option<String>) -> Result<MessageTemplate> {
    Ok(MessageTemplate::parse(template.as_deref().unwrap_or_default())?)
}

fn slack_settings(slack: SlackApiConfig) -> Result<SlackApiSettings> {
    let api_url = if slack.api_url.is_empty() {
        DEFAULT_SLACK_API_URL.to_string()
    } else {
        slack.api_url
    };

    Ok(SlackApiSettings {
        api_token: slack.api_token,
        channel: slack.channel,
        api_url,
        username: non_empty(slack.username),
        icon_url: non_empty(slack.icon_url),
        icon_emoji: non_empty(slack.icon_emoji),
        message_template: parse_message_template(slack.message_template)?,
    })
}

fn misskey_settings(misskey: MisskeyConfig) -> Result<MisskeySettings> {
    Ok(MisskeySettings {
        api_token: misskey.api_token,
        api_url: misskey.api_url,
        message_template: parse_message_template(misskey.message_template)?,
    })
}
