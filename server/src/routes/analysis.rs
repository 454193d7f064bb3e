use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::handlers::analysis_handlers::{export_job, poll_job, start_analysis};
use crate::state::AppState;

pub fn analysis_routes(state: AppState) -> Router {
    Router::new()
        .route("/analyses", post(start_analysis))
        .route("/jobs/{id}", get(poll_job))
        .route("/jobs/{id}/export", get(export_job))
        .layer(Extension(state))
}
