use crate::{config::AnalysisConfig, error::FetchFailure, AnalysisError, PageSlot, Target};
use backoff::{future::retry, ExponentialBackoff};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; CompetitorIntel/0.1)";

const CHALLENGE_MARKERS: &[&str] = &["Attention Required!", "Checking your browser"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Success(String),
    Failed(FetchFailure),
}

/// Outcome of probing one slot. `url` is the address that produced `status`,
/// which differs from the primary path when an alternate path was used.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub slot: PageSlot,
    pub url: Url,
    pub status: FetchStatus,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    fn new(slot: PageSlot, url: Url, status: FetchStatus) -> Self {
        Self {
            slot,
            url,
            status,
            fetched_at: Utc::now(),
        }
    }

    pub fn html(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Success(html) => Some(html),
            FetchStatus::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.status {
            FetchStatus::Success(_) => None,
            FetchStatus::Failed(reason) => Some(reason),
        }
    }
}

/// Extra paths probed, in order, when a slot's primary path fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPaths {
    alternates: BTreeMap<PageSlot, Vec<String>>,
}

impl SlotPaths {
    pub fn primary_only() -> Self {
        Self {
            alternates: BTreeMap::new(),
        }
    }

    pub fn with_alternates<I, S>(mut self, slot: PageSlot, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternates
            .insert(slot, paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn alternates(&self, slot: PageSlot) -> &[String] {
        self.alternates
            .get(&slot)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Default for SlotPaths {
    fn default() -> Self {
        Self::primary_only()
            .with_alternates(PageSlot::Pricing, ["plans", "price"])
            .with_alternates(PageSlot::Features, ["products", "solutions"])
    }
}

/// Appends `path` to the base URL's path, keeping any prefix such as `/en/`.
pub fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            segments.push(part);
        }
    }
    url
}

fn is_challenge_page(body: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|marker| body.contains(marker))
}

fn classify(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::ConnectionError(err.to_string())
    }
}

pub struct PageFetcher {
    client: Client,
    paths: SlotPaths,
    retries: u32,
    concurrent_requests: usize,
}

impl PageFetcher {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            client: Client::builder()
                .timeout(config.page_timeout)
                .user_agent(USER_AGENT)
                .redirect(reqwest::redirect::Policy::limited(5))
                .build()?,
            paths: config.slot_paths.clone(),
            retries: config.fetch_retries,
            concurrent_requests: config.max_concurrent_fetches.clamp(1, PageSlot::ALL.len()),
        })
    }

    /// Primary URL and alternates for every slot, in slot order.
    pub fn slot_urls(&self, base: &Url) -> Vec<(PageSlot, Url, Vec<Url>)> {
        PageSlot::ALL
            .iter()
            .map(|&slot| {
                let primary = match slot.path() {
                    Some(path) => join_path(base, path),
                    None => base.clone(),
                };
                let alternates = self
                    .paths
                    .alternates(slot)
                    .iter()
                    .map(|path| join_path(base, path))
                    .collect();
                (slot, primary, alternates)
            })
            .collect()
    }

    /// One result per slot, yielded as each slot settles.
    pub fn fetch_stream(&self, target: &Target) -> impl Stream<Item = FetchResult> + '_ {
        stream::iter(self.slot_urls(target.base_url()))
            .map(move |(slot, primary, alternates)| self.fetch_slot(slot, primary, alternates))
            .buffer_unordered(self.concurrent_requests)
    }

    /// Always yields one result per slot, ordered home, pricing, features, about.
    pub async fn fetch(&self, target: &Target) -> Vec<FetchResult> {
        let mut results = self.fetch_stream(target).collect::<Vec<_>>().await;
        results.sort_by_key(|r| r.slot);
        results
    }

    async fn fetch_slot(&self, slot: PageSlot, primary: Url, alternates: Vec<Url>) -> FetchResult {
        let mut outcome = self.fetch_with_retry(&primary).await;
        let mut url = primary;

        for alternate in alternates {
            if outcome.is_ok() {
                break;
            }
            debug!(%slot, from = %url, to = %alternate, "trying alternate path");
            outcome = self.fetch_with_retry(&alternate).await;
            url = alternate;
        }

        match outcome {
            Ok(html) => {
                info!(%slot, %url, bytes = html.len(), "page fetched");
                FetchResult::new(slot, url, FetchStatus::Success(html))
            }
            Err(reason) => {
                warn!(%slot, %url, %reason, "page unavailable");
                FetchResult::new(slot, url, FetchStatus::Failed(reason))
            }
        }
    }

    async fn fetch_with_retry(&self, url: &Url) -> Result<String, FetchFailure> {
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(250),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        let max_retries = self.retries;
        let mut attempt = 0u32;

        retry(policy, || {
            attempt += 1;
            let current = attempt;
            let retry_allowed = current <= max_retries;
            async move {
                self.get(url).await.map_err(|reason| {
                    if reason.is_transient() && retry_allowed {
                        debug!(%url, %reason, attempt = current, "transient fetch failure, retrying");
                        backoff::Error::transient(reason)
                    } else {
                        backoff::Error::permanent(reason)
                    }
                })
            }
        })
        .await
    }

    async fn get(&self, url: &Url) -> Result<String, FetchFailure> {
        let res = self.client.get(url.clone()).send().await.map_err(classify)?;

        // Challenges usually arrive as 403 or 503.
        let challenged = res
            .headers()
            .get("cf-mitigated")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("challenge"));
        if challenged {
            return Err(FetchFailure::Blocked);
        }

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            if is_challenge_page(&body) {
                return Err(FetchFailure::Blocked);
            }
            return Err(FetchFailure::HttpError(status.as_u16()));
        }

        let body = res.text().await.map_err(classify)?;
        if is_challenge_page(&body) {
            return Err(FetchFailure::Blocked);
        }

        Ok(body)
    }
}
