//! Resolved profile: secrets looked up and wrapped.

use super::{
    RawAiConfig, RawGeminiConfig, RawMisskeyConfig, RawMockConfig, RawOutputConfig, RawProfile,
    RawSlackApiConfig,
};
use crate::error::{Error, Result};
use crate::secret::{resolve_secret, Secret};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub ai: Option<AiConfig>,
    pub system_prompt: String,
    pub comment_prompt_template: String,
    pub selector_prompt: String,
    pub fixed_message: String,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AiConfig {
    pub gemini: Option<GeminiConfig>,
    pub mock: Option<MockConfig>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeminiConfig {
    pub model: String,
    pub api_key: Secret,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockConfig {
    pub enabled: bool,
    pub selector_mode: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputConfig {
    pub slack_api: Option<SlackApiConfig>,
    pub misskey: Option<MisskeyConfig>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlackApiConfig {
    /// `None` means the block is present without `enabled`, which counts as on
    pub enabled: Option<bool>,
    pub api_token: Secret,
    pub channel: String,
    pub message_template: Option<String>,
    pub api_url: String,
    pub username: String,
    pub icon_url: String,
    pub icon_emoji: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MisskeyConfig {
    pub enabled: Option<bool>,
    pub api_token: Secret,
    pub api_url: String,
    pub message_template: Option<String>,
}

impl SlackApiConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl MisskeyConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl RawProfile {
    /// Resolve secrets and convert to a [`Profile`].
    ///
    /// Destinations explicitly marked `enabled: false` keep their block and
    /// any token that resolves, but never fail on a missing environment
    /// variable.
    pub fn to_entity(&self) -> Result<Profile> {
        Ok(Profile {
            ai: self.ai.as_ref().map(RawAiConfig::to_entity).transpose()?,
            system_prompt: self.system_prompt.clone(),
            comment_prompt_template: self.comment_prompt_template.clone(),
            selector_prompt: self.selector_prompt.clone(),
            fixed_message: self.fixed_message.clone(),
            output: self
                .output
                .as_ref()
                .map(RawOutputConfig::to_entity)
                .transpose()?,
        })
    }
}

impl RawAiConfig {
    fn to_entity(&self) -> Result<AiConfig> {
        Ok(AiConfig {
            gemini: self
                .gemini
                .as_ref()
                .map(RawGeminiConfig::to_entity)
                .transpose()?,
            mock: self.mock.as_ref().map(RawMockConfig::to_entity),
        })
    }
}

impl RawGeminiConfig {
    fn to_entity(&self) -> Result<GeminiConfig> {
        Ok(GeminiConfig {
            model: self.model.clone(),
            api_key: resolve_secret("ai.gemini.api_key", &self.api_key, &self.api_key_env)?,
        })
    }
}

impl RawMockConfig {
    fn to_entity(&self) -> MockConfig {
        MockConfig {
            enabled: self.enabled,
            selector_mode: self.selector_mode.clone(),
            comment: self.comment.clone(),
        }
    }
}

impl RawOutputConfig {
    fn to_entity(&self) -> Result<OutputConfig> {
        Ok(OutputConfig {
            slack_api: self
                .slack_api
                .as_ref()
                .map(RawSlackApiConfig::to_entity)
                .transpose()?,
            misskey: self
                .misskey
                .as_ref()
                .map(RawMisskeyConfig::to_entity)
                .transpose()?,
        })
    }
}

impl RawSlackApiConfig {
    fn to_entity(&self) -> Result<SlackApiConfig> {
        let api_token = resolve_destination_token(
            "output.slack_api.api_token",
            self.enabled,
            &self.api_token,
            &self.api_token_env,
        )?;

        Ok(SlackApiConfig {
            enabled: self.enabled,
            api_token,
            channel: self.channel.clone(),
            message_template: self.message_template.clone(),
            api_url: self.api_url.clone(),
            username: self.username.clone(),
            icon_url: self.icon_url.clone(),
            icon_emoji: self.icon_emoji.clone(),
        })
    }
}

impl RawMisskeyConfig {
    fn to_entity(&self) -> Result<MisskeyConfig> {
        let api_token = resolve_destination_token(
            "output.misskey.api_token",
            self.enabled,
            &self.api_token,
            &self.api_token_env,
        )?;

        Ok(MisskeyConfig {
            enabled: self.enabled,
            api_token,
            api_url: self.api_url.clone(),
            message_template: self.message_template.clone(),
        })
    }
}

/// Resolve a destination token.
///
/// A destination switched off with `enabled: false` still picks up a token
/// that is available, so a later profile can switch it on by setting only
/// `enabled: true`. A missing variable is not an error while it is off.
fn resolve_destination_token(
    field: &str,
    enabled: Option<bool>,
    inline: &str,
    env_var: &str,
) -> Result<Secret> {
    match resolve_secret(field, inline, env_var) {
        Err(Error::SecretUnset { .. }) if enabled == Some(false) => Ok(Secret::default()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{validate, Merge};

    #[test]
    fn test_inline_secrets_are_wrapped() {
        let raw = RawProfile {
            ai: Some(RawAiConfig {
                gemini: Some(RawGeminiConfig {
                    model: "gemini-2.5-flash".to_string(),
                    api_key: "k".to_string(),
                    api_key_env: String::new(),
                }),
                mock: None,
            }),
            ..Default::default()
        };

        let profile = raw.to_entity().unwrap();
        let gemini = profile.ai.unwrap().gemini.unwrap();
        assert_eq!(gemini.model, "gemini-2.5-flash");
        assert_eq!(gemini.api_key.value(), "k");
        assert!(format!("{:?}", gemini).contains("[REDACTED]"));
    }

    #[test]
    fn test_missing_env_fails_with_variable_name() {
        let raw = RawProfile {
            output: Some(RawOutputConfig {
                slack_api: Some(RawSlackApiConfig {
                    api_token_env: "AI_FEED_ENTITY_TEST_UNSET_TOKEN".to_string(),
                    ..Default::default()
                }),
                misskey: None,
            }),
            ..Default::default()
        };

        let err = raw.to_entity().unwrap_err();
        assert!(matches!(err, Error::SecretUnset { .. }));
        assert!(err.to_string().contains("AI_FEED_ENTITY_TEST_UNSET_TOKEN"));
    }

    #[test]
    fn test_disabled_destination_tolerates_missing_env() {
        let raw = RawProfile {
            output: Some(RawOutputConfig {
                slack_api: None,
                misskey: Some(RawMisskeyConfig {
                    enabled: Some(false),
                    api_token_env: "AI_FEED_ENTITY_TEST_DISABLED_TOKEN".to_string(),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        };

        let profile = raw.to_entity().unwrap();
        let misskey = profile.output.unwrap().misskey.unwrap();
        assert!(!misskey.is_enabled());
        assert!(misskey.api_token.is_empty());
    }

    #[test]
    fn test_disabled_destination_keeps_available_token() {
        std::env::set_var("AI_FEED_ENTITY_TEST_SLACK_TOKEN", "xoxb-from-env");
        let default = RawProfile::parse(
            r##"
system_prompt: sys
selector_prompt: pick
comment_prompt_template: "{{TITLE}}"
ai:
  mock:
    enabled: true
output:
  slack_api:
    enabled: false
    api_token_env: AI_FEED_ENTITY_TEST_SLACK_TOKEN
    channel: "#general"
    message_template: "{{COMMENT}} {{URL}}"
"##,
        )
        .unwrap()
        .to_entity()
        .unwrap();
        let user = RawProfile::parse("output:\n  slack_api:\n    enabled: true\n")
            .unwrap()
            .to_entity()
            .unwrap();

        let mut merged = default;
        merged.merge(&user);

        let slack = merged.output.as_ref().unwrap().slack_api.as_ref().unwrap();
        assert!(slack.is_enabled());
        assert_eq!(slack.api_token.value(), "xoxb-from-env");
        let result = validate(&merged);
        assert!(result.valid, "{result}");
        assert!(result.summary.slack_configured);
    }

    #[test]
    fn test_present_block_without_enabled_counts_as_enabled() {
        let slack = SlackApiConfig::default();
        assert!(slack.is_enabled());
        let misskey = MisskeyConfig {
            enabled: Some(false),
            ..Default::default()
        };
        assert!(!misskey.is_enabled());
    }
}
