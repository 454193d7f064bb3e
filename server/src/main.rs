mod handlers;
mod routes;
mod state;

use std::{env, time::Duration};

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use competitor_intel::{AnalysisConfig, ApiKey};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use routes::analysis::analysis_routes;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    EnvFilter::new("competitor_intel=info,competitor_intel_server=info,tower_http=info")
                }),
        )
        .init();

    let config = AnalysisConfig::from_env();
    config.validate()?;

    let default_api_key = env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .map(ApiKey::new);
    if default_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; every request must bring its own apiKey");
    }

    let mut state = AppState::new(config, default_api_key);
    if let Ok(raw) = env::var("JOB_TTL_SECS") {
        match raw.trim().parse::<u64>() {
            Ok(secs) => state = state.with_job_ttl(Duration::from_secs(secs)),
            Err(_) => warn!(value = %raw, "ignoring malformed JOB_TTL_SECS"),
        }
    }

    let mut app = Router::new()
        .nest("/api", analysis_routes(state))
        .layer(TraceLayer::new_for_http());

    if let Ok(client_url) = env::var("CLIENT_URL") {
        let origin = client_url
            .parse::<HeaderValue>()
            .with_context(|| format!("CLIENT_URL is not a valid origin: {}", client_url))?;
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);
        app = app.layer(cors);
    }

    let addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
