//! Field-by-field profile merge.
//!
//! Rules, applied recursively with `source` over `target`:
//! - strings and secrets: source wins when non-empty
//! - `Option` leaves (`enabled`, `message_template`): source wins when `Some`
//! - nested blocks: `None` in source leaves target alone; otherwise target is
//!   created if missing and merged into
//! - plain `bool` (`ai.mock.enabled`): source always wins

use super::entity::{
    AiConfig, GeminiConfig, MisskeyConfig, MockConfig, OutputConfig, Profile, SlackApiConfig,
};
use crate::secret::Secret;

/// Apply `source` over `self` in place. Later sources win.
pub trait Merge {
    fn merge(&mut self, source: &Self);
}

/// Merge an optional source; `None` is a no-op.
pub fn merge(target: &mut Profile, source: Option<&Profile>) {
    if let Some(source) = source {
        target.merge(source);
    }
}

fn merge_string(target: &mut String, source: &str) {
    if !source.is_empty() {
        *target = source.to_string();
    }
}

fn merge_secret(target: &mut Secret, source: &Secret) {
    if !source.is_empty() {
        *target = source.clone();
    }
}

fn merge_leaf<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if source.is_some() {
        *target = source.clone();
    }
}

fn merge_block<T: Merge + Default>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(source) = source {
        target.get_or_insert_with(T::default).merge(source);
    }
}

impl Merge for Profile {
    fn merge(&mut self, source: &Self) {
        merge_block(&mut self.ai, &source.ai);
        merge_string(&mut self.system_prompt, &source.system_prompt);
        merge_string(
            &mut self.comment_prompt_template,
            &source.comment_prompt_template,
        );
        merge_string(&mut self.selector_prompt, &source.selector_prompt);
        merge_string(&mut self.fixed_message, &source.fixed_message);
        merge_block(&mut self.output, &source.output);
    }
}

impl Merge for AiConfig {
    fn merge(&mut self, source: &Self) {
        merge_block(&mut self.gemini, &source.gemini);
        merge_block(&mut self.mock, &source.mock);
    }
}

impl Merge for GeminiConfig {
    fn merge(&mut self, source: &Self) {
        merge_string(&mut self.model, &source.model);
        merge_secret(&mut self.api_key, &source.api_key);
    }
}

impl Merge for MockConfig {
    fn merge(&mut self, source: &Self) {
        self.enabled = source.enabled;
        merge_string(&mut self.selector_mode, &source.selector_mode);
        merge_string(&mut self.comment, &source.comment);
    }
}

impl Merge for OutputConfig {
    fn merge(&mut self, source: &Self) {
        merge_block(&mut self.slack_api, &source.slack_api);
        merge_block(&mut self.misskey, &source.misskey);
    }
}

impl Merge for SlackApiConfig {
    fn merge(&mut self, source: &Self) {
        merge_leaf(&mut self.enabled, &source.enabled);
        merge_secret(&mut self.api_token, &source.api_token);
        merge_string(&mut self.channel, &source.channel);
        merge_leaf(&mut self.message_template, &source.message_template);
        merge_string(&mut self.api_url, &source.api_url);
        merge_string(&mut self.username, &source.username);
        merge_string(&mut self.icon_url, &source.icon_url);
        merge_string(&mut self.icon_emoji, &source.icon_emoji);
    }
}

impl Merge for MisskeyConfig {
    fn merge(&mut self, source: &Self) {
        merge_leaf(&mut self.enabled, &source.enabled);
        merge_secret(&mut self.api_token, &source.api_token);
        merge_string(&mut self.api_url, &source.api_url);
        merge_leaf(&mut self.message_template, &source.message_template);
    }
}
