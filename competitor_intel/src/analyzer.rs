//! Sequences one analysis run: fetch, extract, prompt, complete, assemble.
//!
//! Only invalid input and a missing home page abort a run. Failed side
//! pages shrink the content bundle, and failed completions become
//! `Failed` entries in the report. When the run deadline passes,
//! outstanding calls are dropped and the unfinished categories are
//! reported as timed out.

use crate::{
    ai::CompletionModel,
    config::AnalysisConfig,
    error::{AnalysisError, ModelFailure},
    extractor::{ContentBundle, ContentExtractor},
    fetcher::{FetchResult, PageFetcher},
    prompt::PromptBuilder,
    report::{self, CategoryResult, Report},
    throttle::ModelThrottle,
    AnalysisCategory, PageSlot, Target,
};
use backoff::{future::retry, ExponentialBackoff};
use futures::stream::{self, StreamExt};
use std::pin::pin;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

pub struct Analyzer<M> {
    fetcher: PageFetcher,
    extractor: ContentExtractor,
    prompts: PromptBuilder,
    model: M,
    throttle: Option<ModelThrottle>,
    max_concurrent_calls: usize,
    model_retries: u32,
    run_timeout: Duration,
}

impl<M: CompletionModel> Analyzer<M> {
    pub fn new(config: &AnalysisConfig, model: M) -> Result<Self, AnalysisError> {
        config.validate()?;

        Ok(Self {
            fetcher: PageFetcher::new(config)?,
            extractor: ContentExtractor::new(config.max_content_chars),
            prompts: PromptBuilder::new(config.sources.clone()),
            model,
            throttle: config.requests_per_minute.map(ModelThrottle::new),
            max_concurrent_calls: config.max_concurrent_calls,
            model_retries: config.model_retries,
            run_timeout: config.run_timeout,
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub async fn analyze(&self, target: &Target) -> Result<Report, AnalysisError> {
        let deadline = Instant::now() + self.run_timeout;
        info!(
            company = target.company_name(),
            url = %target.base_url(),
            model = self.model.name(),
            "starting analysis"
        );

        let fetched = match self.fetch_pages(target, deadline).await? {
            Some(results) => results,
            None => return Ok(report::assemble(target.clone(), Vec::new())),
        };

        let bundle = ContentBundle::from_results(&fetched, &self.extractor)?;
        info!(pages = bundle.len(), "content bundle ready");

        let results = self.run_categories(target, &bundle, deadline).await;
        let report = report::assemble(target.clone(), results);
        info!(
            succeeded = report.results().len() - report.failures().count(),
            failed = report.failures().count(),
            "analysis finished"
        );
        Ok(report)
    }

    /// Collects fetch results as they settle. A failed home page ends the run
    /// at once, even while other slots are in flight. `Ok(None)` means the
    /// deadline passed with the home page still pending or already acquired.
    async fn fetch_pages(
        &self,
        target: &Target,
        deadline: Instant,
    ) -> Result<Option<Vec<FetchResult>>, AnalysisError> {
        let mut fetched = Vec::with_capacity(PageSlot::ALL.len());
        let mut pages = pin!(self.fetcher.fetch_stream(target));

        loop {
            match timeout_at(deadline, pages.next()).await {
                Ok(Some(result)) => {
                    if let (PageSlot::Home, Some(reason)) = (result.slot, result.failure()) {
                        warn!(url = %result.url, %reason, "home page unavailable, aborting run");
                        return Err(AnalysisError::AcquisitionFailed {
                            url: result.url.to_string(),
                            reason: reason.clone(),
                        });
                    }
                    fetched.push(result);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(settled = fetched.len(), "run deadline reached while fetching pages");
                    return Ok(None);
                }
            }
        }

        fetched.sort_by_key(|r| r.slot);
        Ok(Some(fetched))
    }

    /// Returns the results that finished before `deadline`, in completion order.
    async fn run_categories(
        &self,
        target: &Target,
        bundle: &ContentBundle,
        deadline: Instant,
    ) -> Vec<CategoryResult> {
        let mut finished = Vec::with_capacity(AnalysisCategory::ALL.len());
        let mut pending = stream::iter(AnalysisCategory::ALL)
            .map(|category| self.analyze_category(target, category, bundle))
            .buffer_unordered(self.max_concurrent_calls);

        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some(result)) => finished.push(result),
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        finished = finished.len(),
                        "run deadline reached, abandoning outstanding model calls"
                    );
                    break;
                }
            }
        }

        finished
    }

    async fn analyze_category(
        &self,
        target: &Target,
        category: AnalysisCategory,
        bundle: &ContentBundle,
    ) -> CategoryResult {
        let prompt = self.prompts.build(target, category, bundle);
        debug!(%category, prompt_chars = prompt.chars().count(), "prompt built");

        match self.complete_with_retry(&prompt).await {
            Ok(text) => {
                info!(%category, chars = text.len(), "category analysed");
                CategoryResult::success(category, text)
            }
            Err(reason) => {
                warn!(%category, %reason, "category analysis failed");
                CategoryResult::failed(category, reason)
            }
        }
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<String, ModelFailure> {
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        let max_retries = self.model_retries;
        let mut attempt = 0u32;

        retry(policy, || {
            attempt += 1;
            let current = attempt;
            let retry_allowed = current <= max_retries;
            async move {
                if let Some(throttle) = &self.throttle {
                    throttle.acquire().await;
                }
                self.model.complete(prompt).await.map_err(|reason| {
                    if reason.is_retryable() && retry_allowed {
                        debug!(%reason, attempt = current, "retrying completion");
                        backoff::Error::transient(reason)
                    } else {
                        backoff::Error::permanent(reason)
                    }
                })
            }
        })
        .await
    }
}
