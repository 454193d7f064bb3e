//! Run configuration
//!
//! Every limit the pipeline enforces lives here: per-page and per-call
//! timeouts, the run-level deadline, the extraction budget, concurrency,
//! and the optional model throttle.

use crate::{ai::ModelSettings, error::AnalysisError, fetcher::SlotPaths, prompt::SourceMap};
use std::{env, num::NonZeroU32, str::FromStr, time::Duration};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Timeout for a single page request (default: 10s)
    pub page_timeout: Duration,
    /// Extra attempts after a transient network failure (default: 1)
    pub fetch_retries: u32,
    /// Concurrent page fetches, clamped to 1..=4 (default: 4)
    pub max_concurrent_fetches: usize,
    /// Alternate paths probed when a slot's primary path fails
    pub slot_paths: SlotPaths,
    /// Character budget per extracted page (default: 8000)
    pub max_content_chars: usize,
    /// Which pages feed each category
    pub sources: SourceMap,
    /// Completion endpoint, model, and per-call timeout
    pub model: ModelSettings,
    /// Concurrent completion calls (default: 4)
    pub max_concurrent_calls: usize,
    /// Provider cap on completion calls per minute (default: unthrottled)
    pub requests_per_minute: Option<NonZeroU32>,
    /// Retries for rate-limited or timed-out completions (default: 0)
    pub model_retries: u32,
    /// Wall-clock budget for a whole run (default: 300s)
    pub run_timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(10),
            fetch_retries: 1,
            max_concurrent_fetches: 4,
            slot_paths: SlotPaths::default(),
            max_content_chars: 8_000,
            sources: SourceMap::default(),
            model: ModelSettings::default(),
            max_concurrent_calls: 4,
            requests_per_minute: None,
            model_retries: 0,
            run_timeout: Duration::from_secs(300),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    parse_setting(key, &env::var(key).ok()?)
}

/// Malformed values are ignored with a warning; the default stays in place.
fn parse_setting<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = raw, "ignoring malformed setting");
            None
        }
    }
}

impl AnalysisConfig {
    /// Defaults overridden by `INTEL_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_parse::<u64>("INTEL_PAGE_TIMEOUT_SECS") {
            config.page_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = env_parse("INTEL_FETCH_RETRIES") {
            config.fetch_retries = retries;
        }
        if let Some(chars) = env_parse("INTEL_MAX_CONTENT_CHARS") {
            config.max_content_chars = chars;
        }
        if let Ok(model) = env::var("INTEL_MODEL") {
            config.model.model = model;
        }
        if let Ok(endpoint) = env::var("INTEL_MODEL_ENDPOINT") {
            config.model.endpoint = endpoint;
        }
        if let Some(secs) = env_parse::<u64>("INTEL_MODEL_TIMEOUT_SECS") {
            config.model.timeout = Duration::from_secs(secs);
        }
        if let Some(calls) = env_parse("INTEL_MAX_CONCURRENT_CALLS") {
            config.max_concurrent_calls = calls;
        }
        config.requests_per_minute =
            env_parse::<u32>("INTEL_REQUESTS_PER_MINUTE").and_then(NonZeroU32::new);
        if let Some(retries) = env_parse("INTEL_MODEL_RETRIES") {
            config.model_retries = retries;
        }
        if let Some(secs) = env_parse::<u64>("INTEL_RUN_TIMEOUT_SECS") {
            config.run_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: &str| -> Result<(), AnalysisError> {
            Err(AnalysisError::InvalidInput(msg.to_string()))
        };

        if self.page_timeout.is_zero() {
            return invalid("page timeout must be greater than zero");
        }
        if self.model.timeout.is_zero() {
            return invalid("model timeout must be greater than zero");
        }
        if self.run_timeout.is_zero() {
            return invalid("run timeout must be greater than zero");
        }
        if self.max_content_chars == 0 {
            return invalid("content budget must be at least one character");
        }
        if self.max_concurrent_fetches == 0 || self.max_concurrent_calls == 0 {
            return invalid("concurrency limits must be at least 1");
        }
        if self.model.model.trim().is_empty() {
            return invalid("model name must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch_retries, 1);
        assert_eq!(config.max_content_chars, 8_000);
        assert_eq!(config.model.model, "gpt-4o");
        assert!(config.requests_per_minute.is_none());
    }

    #[test]
    fn malformed_settings_are_ignored() {
        assert_eq!(parse_setting::<u64>("INTEL_RUN_TIMEOUT_SECS", " 120 "), Some(120));
        assert_eq!(parse_setting::<u64>("INTEL_RUN_TIMEOUT_SECS", "5m"), None);
        assert_eq!(parse_setting::<u32>("INTEL_FETCH_RETRIES", "-1"), None);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let config = AnalysisConfig {
            run_timeout: Duration::ZERO,
            ..AnalysisConfig::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::InvalidInput(_))));

        let config = AnalysisConfig {
            max_content_chars: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            max_concurrent_calls: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
