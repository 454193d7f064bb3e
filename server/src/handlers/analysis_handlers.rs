use axum::{
    extract::{Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use competitor_intel::{export, AnalysisError, Analyzer, ApiKey, OpenAiClient, Report, Target};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::state::{AppState, JobStatus};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePayload {
    pub url: String,
    pub company_name: Option<String>,
    /// Overrides the server key for this job only; never stored.
    pub api_key: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCreated {
    pub job_id: Uuid,
}

#[derive(Serialize)]
pub struct JobPollResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

/// POST /api/analyses
pub async fn start_analysis(
    Extension(state): Extension<AppState>,
    Json(payload): Json<AnalyzePayload>,
) -> Response {
    // 1) Validate before anything touches the network
    let target = match payload.company_name.as_deref().filter(|n| !n.trim().is_empty()) {
        Some(name) => Target::new(name, &payload.url),
        None => Target::from_url(&payload.url),
    };
    let target = match target {
        Ok(t) => t,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let api_key = match payload.api_key.filter(|k| !k.trim().is_empty()) {
        Some(key) => ApiKey::new(key),
        None => match &state.default_api_key {
            Some(key) => key.clone(),
            None => return error_response(StatusCode::BAD_REQUEST, "no API key configured"),
        },
    };

    let analyzer = match OpenAiClient::new(api_key, state.config.model.clone())
        .and_then(|client| Analyzer::new(&state.config, client))
    {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    // 2) Register the job as pending and run it in the background
    let job_id = Uuid::new_v4();
    state.jobs.insert(job_id, JobStatus::Pending);
    info!(%job_id, company = target.company_name(), "analysis job accepted");

    let run = tokio::spawn(async move { analyzer.analyze(&target).await });
    tokio::spawn(track_job(state.jobs.clone(), job_id, run, state.job_ttl));

    // 3) Answer immediately with the job id
    (StatusCode::ACCEPTED, Json(JobCreated { job_id })).into_response()
}

/// Maps a finished analysis task to its job status. A panicked or cancelled
/// task becomes `Failed` instead of leaving the job pending.
async fn job_outcome(job_id: Uuid, run: JoinHandle<Result<Report, AnalysisError>>) -> JobStatus {
    match run.await {
        Ok(Ok(report)) => JobStatus::Done {
            report: Arc::new(report),
        },
        Ok(Err(e)) => {
            warn!(%job_id, error = %e, "analysis job failed");
            JobStatus::Failed {
                error: e.to_string(),
            }
        }
        Err(e) => {
            error!(%job_id, error = %e, "analysis task aborted");
            JobStatus::Failed {
                error: "analysis aborted unexpectedly".to_string(),
            }
        }
    }
}

/// Records the outcome, then evicts the job once `ttl` has passed.
async fn track_job(
    jobs: Arc<DashMap<Uuid, JobStatus>>,
    job_id: Uuid,
    run: JoinHandle<Result<Report, AnalysisError>>,
    ttl: Duration,
) {
    let status = job_outcome(job_id, run).await;
    jobs.insert(job_id, status);

    tokio::time::sleep(ttl).await;
    jobs.remove(&job_id);
    debug!(%job_id, "finished job evicted");
}

/// GET /api/jobs/{id}
pub async fn poll_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    let Some(status) = state.jobs.get(&id).map(|entry| entry.value().clone()) else {
        return error_response(StatusCode::NOT_FOUND, "Job not found");
    };

    let resp = match status {
        JobStatus::Pending => JobPollResponse {
            status: "pending",
            report: None,
            error: None,
        },
        JobStatus::Done { report } => match export::to_value(&report) {
            Ok(value) => JobPollResponse {
                status: "done",
                report: Some(value),
                error: None,
            },
            Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        JobStatus::Failed { error } => JobPollResponse {
            status: "failed",
            report: None,
            error: Some(error),
        },
    };
    (StatusCode::OK, Json(resp)).into_response()
}

fn attachment(report: &Report, extension: &str) -> String {
    format!(
        "attachment; filename=\"{}.{}\"",
        export::file_stem(report),
        extension
    )
}

/// GET /api/jobs/{id}/export?format=json|text
pub async fn export_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let Some(status) = state.jobs.get(&id).map(|entry| entry.value().clone()) else {
        return error_response(StatusCode::NOT_FOUND, "Job not found");
    };

    let report = match status {
        JobStatus::Done { report } => report,
        JobStatus::Pending => return error_response(StatusCode::CONFLICT, "Job is still running"),
        JobStatus::Failed { error } => return error_response(StatusCode::CONFLICT, error),
    };

    match query.format {
        ExportFormat::Json => match export::to_json(&report) {
            Ok(body) => (
                [
                    (header::CONTENT_TYPE, "application/json".to_string()),
                    (header::CONTENT_DISPOSITION, attachment(&report, "json")),
                ],
                body,
            )
                .into_response(),
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
        ExportFormat::Text => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, attachment(&report, "txt")),
            ],
            export::to_text(&report),
        )
            .into_response(),
    }
}
