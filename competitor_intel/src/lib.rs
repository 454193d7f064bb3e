pub mod ai;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod fetcher;
pub mod prompt;
pub mod report;
pub mod throttle;

use serde::Serialize;
use std::fmt;
use url::Url;

pub use ai::{ApiKey, CompletionModel, ModelSettings, OpenAiClient};
pub use analyzer::Analyzer;
pub use config::AnalysisConfig;
pub use error::{AnalysisError, FetchFailure, ModelFailure};
pub use extractor::{ContentBundle, ContentExtractor};
pub use fetcher::{FetchResult, FetchStatus, PageFetcher, SlotPaths};
pub use prompt::{PromptBuilder, SourceMap, SourcePlan};
pub use report::{CategoryResult, CategoryStatus, Report};

/// The company under analysis. Only constructible through validation, so a
/// `Target` always carries a non-empty name and an absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    company_name: String,
    base_url: Url,
}

impl Target {
    pub fn new(company_name: &str, base_url: &str) -> Result<Self, AnalysisError> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "company name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            company_name: company_name.to_string(),
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Builds a target whose company name is derived from the URL host.
    pub fn from_url(base_url: &str) -> Result<Self, AnalysisError> {
        let url = parse_base_url(base_url)?;
        let company_name = derive_company_name(&url).ok_or_else(|| {
            AnalysisError::InvalidInput(format!("cannot derive a company name from {}", url))
        })?;

        Ok(Self {
            company_name,
            base_url: url,
        })
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn parse_base_url(raw: &str) -> Result<Url, AnalysisError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AnalysisError::InvalidInput(format!("malformed base URL {:?}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AnalysisError::InvalidInput(format!(
            "base URL must use http or https, got {}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(AnalysisError::InvalidInput(format!(
            "base URL has no host: {}",
            raw
        )));
    }

    Ok(url)
}

/// `https://www.acme-labs.io` -> `Acme Labs`
pub fn derive_company_name(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let label = host.split('.').next().filter(|l| !l.is_empty())?;

    let name = label
        .split(|c| c == '-' || c == '_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    (!name.is_empty()).then_some(name)
}

/// Website section probed for every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSlot {
    Home,
    Pricing,
    Features,
    About,
}

impl PageSlot {
    pub const ALL: [PageSlot; 4] = [
        PageSlot::Home,
        PageSlot::Pricing,
        PageSlot::Features,
        PageSlot::About,
    ];

    /// Path joined onto the base URL; `None` means the base URL itself.
    pub fn path(self) -> Option<&'static str> {
        match self {
            PageSlot::Home => None,
            PageSlot::Pricing => Some("pricing"),
            PageSlot::Features => Some("features"),
            PageSlot::About => Some("about"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSlot::Home => "home",
            PageSlot::Pricing => "pricing",
            PageSlot::Features => "features",
            PageSlot::About => "about",
        }
    }
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis produced for every run, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisCategory {
    Overview,
    Pricing,
    Features,
    Swot,
}

impl AnalysisCategory {
    pub const ALL: [AnalysisCategory; 4] = [
        AnalysisCategory::Overview,
        AnalysisCategory::Pricing,
        AnalysisCategory::Features,
        AnalysisCategory::Swot,
    ];

    pub fn index(self) -> usize {
        match self {
            AnalysisCategory::Overview => 0,
            AnalysisCategory::Pricing => 1,
            AnalysisCategory::Features => 2,
            AnalysisCategory::Swot => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AnalysisCategory::Overview => "Overview",
            AnalysisCategory::Pricing => "Pricing",
            AnalysisCategory::Features => "Features",
            AnalysisCategory::Swot => "SWOT",
        }
    }

    /// Section heading used in rendered reports.
    pub fn title(self) -> &'static str {
        match self {
            AnalysisCategory::Overview => "Competitive Overview",
            AnalysisCategory::Pricing => "Pricing Analysis",
            AnalysisCategory::Features => "Feature Analysis",
            AnalysisCategory::Swot => "SWOT Analysis",
        }
    }
}

impl fmt::Display for AnalysisCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
