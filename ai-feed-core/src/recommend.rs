//! End-to-end recommend run.
//!
//! fetch → drop already-posted → select → comment → post → record
//!
//! The history cache is held for the whole run and closed on every path.
//! An article is recorded only after every destination accepted it.

use std::future::Future;

use crate::ai::{recommender_for, Recommender};
use crate::cache::{open_cache, RecommendCache};
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::feed::{Article, FeedFetcher};
use crate::output::{post_all, posters_for, Poster};
use crate::profile::RuntimeProfile;
use crate::template::TemplateContext;

/// The article picked for posting plus what gets posted with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub article: Article,
    pub comment: String,
    pub fixed_message: String,
}

impl Recommendation {
    pub fn context(&self) -> TemplateContext<'_> {
        TemplateContext::new(&self.article, &self.comment, &self.fixed_message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every fetched article was posted before
    NothingNew { fetched: usize },
    Posted(Recommendation),
}

pub struct Pipeline {
    profile: RuntimeProfile,
    cache: Option<CacheConfig>,
}

impl Pipeline {
    pub fn new(profile: RuntimeProfile, cache: Option<CacheConfig>) -> Self {
        Self { profile, cache }
    }

    pub fn profile(&self) -> &RuntimeProfile {
        &self.profile
    }

    /// Fetch `urls` and recommend one new article from them.
    pub async fn run(&self, urls: &[String]) -> Result<Outcome> {
        if urls.is_empty() {
            return Err(Error::Config("no feed URLs given".to_string()));
        }

        let fetcher = FeedFetcher::new()?;
        let articles = fetcher.fetch_all(urls).await?;
        tracing::info!(feeds = urls.len(), articles = articles.len(), "Fetched feeds");

        let recommender = recommender_for(&self.profile.backend, &self.profile.prompts)?;
        let posters = posters_for(&self.profile.destinations)?;
        self.recommend(articles, recommender.as_ref(), &posters)
            .await
    }

    /// Recommend from already-fetched articles.
    pub async fn recommend(
        &self,
        articles: Vec<Article>,
        recommender: &dyn Recommender,
        posters: &[Box<dyn Poster>],
    ) -> Result<Outcome> {
        let mut cache = open_cache(self.cache.as_ref())?;
        let result = self
            .recommend_with_cache(cache.as_mut(), articles, recommender, posters)
            .await;
        if let Err(e) = cache.close() {
            tracing::warn!(error = %e, "Failed to close recommend history");
        }
        result
    }

    async fn recommend_with_cache(
        &self,
        cache: &mut dyn RecommendCache,
        articles: Vec<Article>,
        recommender: &dyn Recommender,
        posters: &[Box<dyn Poster>],
    ) -> Result<Outcome> {
        let fetched = articles.len();
        let candidates: Vec<Article> = articles
            .into_iter()
            .filter(|article| !cache.is_cached(&article.link))
            .collect();
        tracing::info!(
            fetched,
            candidates = candidates.len(),
            "Filtered previously posted articles"
        );

        if candidates.is_empty() {
            return Ok(Outcome::NothingNew { fetched });
        }

        let index = recommender.select_article(&candidates).await?;
        let article = candidates.into_iter().nth(index).ok_or_else(|| {
            Error::Llm(format!("selected article index {} is out of range", index))
        })?;
        tracing::info!(url = %article.link, title = %article.title, "Selected article");

        let comment = recommender.generate_comment(&article).await?;
        let recommendation = Recommendation {
            article,
            comment,
            fixed_message: self.profile.prompts.fixed_message.clone(),
        };

        post_all(posters, &recommendation).await?;
        cache.add_entry(&recommendation.article.link, &recommendation.article.title)?;

        Ok(Outcome::Posted(recommendation))
    }
}

/// Drive an async operation on a single-threaded runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Config(format!("failed to create runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

/// Run `pipeline` over `urls` from synchronous code.
pub fn run_blocking(pipeline: &Pipeline, urls: &[String]) -> Result<Outcome> {
    block_on(pipeline.run(urls))?
}
