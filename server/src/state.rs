use competitor_intel::{AnalysisConfig, ApiKey, Report};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// How long a finished job stays pollable before it is evicted.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
pub enum JobStatus {
    Pending,
    Done { report: Arc<Report> },
    Failed { error: String },
}

/// Shared by every handler: job_id -> JobStatus, plus the run configuration.
#[derive(Clone, Debug)]
pub struct AppState {
    pub jobs: Arc<DashMap<Uuid, JobStatus>>,
    pub config: Arc<AnalysisConfig>,
    /// Used when a request does not bring its own key.
    pub default_api_key: Option<ApiKey>,
    pub job_ttl: Duration,
}

impl AppState {
    pub fn new(config: AnalysisConfig, default_api_key: Option<ApiKey>) -> Self {
        AppState {
            jobs: Arc::new(DashMap::new()),
            config: Arc::new(config),
            default_api_key,
            job_ttl: DEFAULT_JOB_TTL,
        }
    }

    pub fn with_job_ttl(mut self, job_ttl: Duration) -> Self {
        self.job_ttl = job_ttl;
        self
    }
}
