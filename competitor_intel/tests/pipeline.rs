mod common;

use axum::{http::StatusCode, response::Html, routing::get, Router};
use common::{serve, test_config, ScriptedModel, ABOUT_HTML, FEATURES_HTML, HOME_HTML, PRICING_HTML};
use competitor_intel::{
    AnalysisCategory, AnalysisConfig, AnalysisError, Analyzer, FetchFailure, ModelFailure, Target,
};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

fn full_site() -> Router {
    Router::new()
        .route("/", get(|| async { Html(HOME_HTML) }))
        .route("/pricing", get(|| async { Html(PRICING_HTML) }))
        .route("/features", get(|| async { Html(FEATURES_HTML) }))
        .route("/about", get(|| async { Html(ABOUT_HTML) }))
}

async fn stall() -> Html<&'static str> {
    tokio::time::sleep(Duration::from_secs(10)).await;
    Html("too late")
}

#[tokio::test]
async fn reachable_site_yields_four_successes_in_order() {
    let base = serve(full_site()).await;
    let model = ScriptedModel::new();
    let analyzer = Analyzer::new(&test_config(), model.clone()).unwrap();

    let report = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap();

    let categories: Vec<_> = report.results().iter().map(|r| r.category).collect();
    assert_eq!(categories, AnalysisCategory::ALL.to_vec());
    assert!(report.is_complete());
    assert_eq!(model.calls(), 4);

    let pricing = model.prompt_for(AnalysisCategory::Pricing).unwrap();
    assert!(pricing.contains("PRICING-MARKER"));
    let swot = model.prompt_for(AnalysisCategory::Swot).unwrap();
    for marker in ["HOME-MARKER", "PRICING-MARKER", "FEATURES-MARKER", "ABOUT-MARKER"] {
        assert!(swot.contains(marker), "SWOT prompt is missing {marker}");
    }
}

#[tokio::test]
async fn home_failure_is_fatal_and_no_model_calls_are_made() {
    let site = Router::new()
        .route("/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/pricing", get(|| async { Html(PRICING_HTML) }))
        .route("/features", get(|| async { Html(FEATURES_HTML) }))
        .route("/about", get(|| async { Html(ABOUT_HTML) }));
    let base = serve(site).await;
    let model = ScriptedModel::new();
    let analyzer = Analyzer::new(&test_config(), model.clone()).unwrap();

    let err = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap_err();

    match err {
        AnalysisError::AcquisitionFailed { reason, .. } => {
            assert_eq!(reason, FetchFailure::HttpError(500));
        }
        other => panic!("expected AcquisitionFailed, got {other:?}"),
    }
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn missing_pricing_page_falls_back_to_home() {
    let site = Router::new()
        .route("/", get(|| async { Html(HOME_HTML) }))
        .route("/features", get(|| async { Html(FEATURES_HTML) }))
        .route("/about", get(|| async { Html(ABOUT_HTML) }));
    let base = serve(site).await;
    let model = ScriptedModel::new();
    let analyzer = Analyzer::new(&test_config(), model.clone()).unwrap();

    let report = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap();

    assert!(report.result(AnalysisCategory::Pricing).is_success());
    let pricing = model.prompt_for(AnalysisCategory::Pricing).unwrap();
    assert!(pricing.contains("=== HOME PAGE ===\nAcme HOME-MARKER"));
    assert!(!pricing.contains("=== PRICING PAGE ==="));
}

#[tokio::test]
async fn one_failed_category_does_not_affect_the_others() {
    let base = serve(full_site()).await;
    let model = ScriptedModel::new().failing(AnalysisCategory::Pricing, ModelFailure::RateLimited);
    let analyzer = Analyzer::new(&test_config(), model.clone()).unwrap();

    let report = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap();

    assert_eq!(report.results().len(), 4);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].category, AnalysisCategory::Pricing);
    assert_eq!(failures[0].failure(), Some(&ModelFailure::RateLimited));
    for category in [AnalysisCategory::Overview, AnalysisCategory::Features, AnalysisCategory::Swot] {
        assert!(report.result(category).is_success());
    }
    assert_eq!(model.calls(), 4);
}

#[tokio::test]
async fn acme_with_timed_out_pricing_and_about_pages() {
    let site = Router::new()
        .route("/", get(|| async { Html(HOME_HTML) }))
        .route("/features", get(|| async { Html(FEATURES_HTML) }))
        .route("/pricing", get(stall))
        .route("/about", get(stall));
    let base = serve(site).await;
    let model = ScriptedModel::new();
    let analyzer = Analyzer::new(&test_config(), model.clone()).unwrap();

    let report = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap();

    assert_eq!(report.target().company_name(), "Acme");
    assert_eq!(report.results().len(), 4);
    assert!(report.is_complete());

    let pricing = model.prompt_for(AnalysisCategory::Pricing).unwrap();
    assert!(pricing.contains("HOME-MARKER"));
    assert!(!pricing.contains("=== PRICING PAGE ==="));

    let features = model.prompt_for(AnalysisCategory::Features).unwrap();
    assert!(features.contains("FEATURES-MARKER"));

    let overview = model.prompt_for(AnalysisCategory::Overview).unwrap();
    assert!(!overview.contains("=== ABOUT PAGE ==="));
}

#[tokio::test]
async fn run_deadline_during_fetch_marks_every_category_timed_out() {
    let site = Router::new().route("/", get(stall));
    let base = serve(site).await;
    let model = ScriptedModel::new();
    let config = AnalysisConfig {
        run_timeout: Duration::from_millis(1),
        ..test_config()
    };
    let analyzer = Analyzer::new(&config, model.clone()).unwrap();

    let started = Instant::now();
    let report = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(report.results().len(), 4);
    for result in report.results() {
        assert_eq!(result.failure(), Some(&ModelFailure::Timeout));
    }
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn failed_home_page_wins_over_the_run_deadline() {
    let site = Router::new()
        .route("/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/about", get(stall));
    let base = serve(site).await;
    let model = ScriptedModel::new();
    let config = AnalysisConfig {
        page_timeout: Duration::from_secs(5),
        run_timeout: Duration::from_secs(1),
        ..test_config()
    };
    let analyzer = Analyzer::new(&config, model.clone()).unwrap();

    let started = Instant::now();
    let err = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap_err();

    match err {
        AnalysisError::AcquisitionFailed { reason, .. } => {
            assert_eq!(reason, FetchFailure::HttpError(500));
        }
        other => panic!("expected AcquisitionFailed, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn throttle_gates_model_calls() {
    let base = serve(full_site()).await;
    let model = ScriptedModel::new();
    let config = AnalysisConfig {
        requests_per_minute: NonZeroU32::new(2),
        run_timeout: Duration::from_secs(2),
        ..test_config()
    };
    let analyzer = Analyzer::new(&config, model.clone()).unwrap();

    let report = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap();

    let succeeded = report.results().iter().filter(|r| r.is_success()).count();
    assert_eq!(succeeded, 2);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 2);
    for failed in failures {
        assert_eq!(failed.failure(), Some(&ModelFailure::Timeout));
    }
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn run_deadline_during_model_calls_keeps_finished_results() {
    let base = serve(full_site()).await;
    let model = ScriptedModel::new().delayed(AnalysisCategory::Swot, Duration::from_secs(30));
    let config = AnalysisConfig {
        run_timeout: Duration::from_secs(2),
        ..test_config()
    };
    let analyzer = Analyzer::new(&config, model.clone()).unwrap();

    let started = Instant::now();
    let report = analyzer
        .analyze(&Target::new("Acme", &base).unwrap())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.result(AnalysisCategory::Swot).failure(), Some(&ModelFailure::Timeout));
    for category in [AnalysisCategory::Overview, AnalysisCategory::Pricing, AnalysisCategory::Features] {
        assert!(report.result(category).is_success());
    }
}

#[tokio::test]
async fn malformed_url_fails_before_any_request() {
    let err = Target::new("Acme", "acme dot example").unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
}
