#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use competitor_intel::{AnalysisCategory, AnalysisConfig, CompletionModel, ModelFailure, SlotPaths};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HOME_HTML: &str = r#"<html><head><title>Acme</title></head>
<body><h1>HOME-MARKER Rockets for everyone</h1><p>Launch in minutes.</p></body></html>"#;
pub const PRICING_HTML: &str = "<html><body><h1>PRICING-MARKER</h1><p>Starter $10/mo</p></body></html>";
pub const FEATURES_HTML: &str = "<html><body><h1>FEATURES-MARKER</h1><ul><li>Autopilot</li></ul></body></html>";
pub const ABOUT_HTML: &str = "<html><body><h1>ABOUT-MARKER</h1><p>Founded 2020.</p></body></html>";

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn test_config() -> AnalysisConfig {
    AnalysisConfig {
        page_timeout: Duration::from_millis(300),
        slot_paths: SlotPaths::primary_only(),
        ..AnalysisConfig::default()
    }
}

pub fn marker(category: AnalysisCategory) -> String {
    format!("Analysis type: {}\n", category.label())
}

/// Completion stub that records prompts and fails or stalls on demand.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    prompts: Arc<Mutex<Vec<String>>>,
    failures: Vec<(AnalysisCategory, ModelFailure)>,
    delays: Vec<(AnalysisCategory, Duration)>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, category: AnalysisCategory, failure: ModelFailure) -> Self {
        self.failures.push((category, failure));
        self
    }

    pub fn delayed(mut self, category: AnalysisCategory, delay: Duration) -> Self {
        self.delays.push((category, delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompt_for(&self, category: AnalysisCategory) -> Option<String> {
        let marker = marker(category);
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.contains(&marker))
            .cloned()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelFailure> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let delay = self
            .delays
            .iter()
            .find(|(c, _)| prompt.contains(&marker(*c)))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((_, failure)) = self.failures.iter().find(|(c, _)| prompt.contains(&marker(*c))) {
            return Err(failure.clone());
        }
        Ok(format!("analysis from a {}-character prompt", prompt.len()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
