//! Output destinations for recommendations.
//!
//! Every enabled destination gets the recommendation. A failure at one
//! destination does not stop the others; failures are collected and
//! returned together.

pub mod misskey;
pub mod slack;

pub use misskey::{MisskeyPoster, MisskeySettings};
pub use slack::{SlackApiSettings, SlackPoster, DEFAULT_SLACK_API_URL};

use std::io::Write;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::recommend::Recommendation;

/// An enabled, validated destination.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    SlackApi(SlackApiSettings),
    Misskey(MisskeySettings),
}

impl Destination {
    pub fn name(&self) -> &'static str {
        match self {
            Destination::SlackApi(_) => "slack_api",
            Destination::Misskey(_) => "misskey",
        }
    }

    pub fn poster(&self) -> Result<Box<dyn Poster>> {
        match self {
            Destination::SlackApi(settings) => Ok(Box::new(SlackPoster::new(settings.clone())?)),
            Destination::Misskey(settings) => {
                Ok(Box::new(MisskeyPoster::new(settings.clone())?))
            }
        }
    }
}

#[async_trait]
pub trait Poster: Send + Sync {
    fn name(&self) -> &str;

    async fn post(&self, recommendation: &Recommendation) -> Result<()>;
}

/// Posters for `destinations`, or a stdout printer when there are none.
pub fn posters_for(destinations: &[Destination]) -> Result<Vec<Box<dyn Poster>>> {
    if destinations.is_empty() {
        return Ok(vec![Box::new(StdoutPoster)]);
    }
    destinations.iter().map(Destination::poster).collect()
}

/// Post to every poster. Succeeds only if all of them succeed.
pub async fn post_all(posters: &[Box<dyn Poster>], recommendation: &Recommendation) -> Result<()> {
    let mut failures = Vec::new();

    for poster in posters {
        match poster.post(recommendation).await {
            Ok(()) => tracing::info!(
                destination = poster.name(),
                url = %recommendation.article.link,
                "Posted recommendation"
            ),
            Err(e) => {
                tracing::warn!(destination = poster.name(), error = %e, "Post failed");
                failures.push(e);
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::PostFailures(failures))
    }
}

/// Prints the recommendation instead of posting it.
pub struct StdoutPoster;

#[async_trait]
impl Poster for StdoutPoster {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn post(&self, recommendation: &Recommendation) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        write_plain(&mut stdout, recommendation)?;
        stdout.flush()?;
        Ok(())
    }
}

/// Plain-text rendering used when no destination is enabled.
pub fn write_plain<W: Write>(out: &mut W, recommendation: &Recommendation) -> std::io::Result<()> {
    let article = &recommendation.article;
    writeln!(out, "{}", article.title)?;
    writeln!(out, "{}", article.link)?;
    writeln!(out)?;
    writeln!(out, "{}", recommendation.comment)?;
    if !recommendation.fixed_message.is_empty() {
        writeln!(out, "{}", recommendation.fixed_message)?;
    }
    Ok(())
}
