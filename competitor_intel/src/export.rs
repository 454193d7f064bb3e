use crate::{report::CategoryStatus, AnalysisCategory, Report};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportDocument<'a> {
    company: &'a str,
    base_url: &'a str,
    generated_at: String,
    results: Vec<ResultEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultEntry<'a> {
    category: AnalysisCategory,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
}

fn document(report: &Report) -> ReportDocument<'_> {
    ReportDocument {
        company: report.target().company_name(),
        base_url: report.target().base_url().as_str(),
        generated_at: report.generated_at().to_rfc3339(),
        results: report
            .results()
            .iter()
            .map(|r| match &r.status {
                CategoryStatus::Success(text) => ResultEntry {
                    category: r.category,
                    status: "success",
                    text: Some(text),
                    error_code: None,
                    error_reason: None,
                },
                CategoryStatus::Failed(reason) => ResultEntry {
                    category: r.category,
                    status: "failed",
                    text: None,
                    error_code: Some(reason.code()),
                    error_reason: Some(reason.to_string()),
                },
            })
            .collect(),
    }
}

pub fn to_value(report: &Report) -> Result<serde_json::Value, ExportError> {
    Ok(serde_json::to_value(document(report))?)
}

pub fn to_json(report: &Report) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&document(report))?)
}

/// One markdown section per category, in report order.
pub fn to_text(report: &Report) -> String {
    let mut out = format!(
        "# {} - Competitive Research Report\n\nSource: {}\n",
        report.target().company_name(),
        report.target().base_url()
    );

    for result in report.results() {
        out.push_str(&format!("\n## {}\n", result.category.title()));
        match &result.status {
            CategoryStatus::Success(text) => {
                out.push_str(text.trim());
                out.push('\n');
            }
            CategoryStatus::Failed(reason) => {
                out.push_str(&format!("_Analysis failed: {}_\n", reason));
            }
        }
    }

    out.push_str(&format!(
        "\n---\nGenerated on: {}\n",
        report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

/// `Acme Labs` -> `Acme_Labs_competitive_research`
pub fn file_stem(report: &Report) -> String {
    let company: String = report
        .target()
        .company_name()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_competitive_research", company)
}

pub fn save_json(report: &Report, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let mut file = File::create(path.as_ref())?;
    file.write_all(to_json(report)?.as_bytes())?;
    info!(path = %path.as_ref().display(), "JSON report written");
    Ok(())
}

pub fn save_text(report: &Report, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let mut file = File::create(path.as_ref())?;
    file.write_all(to_text(report).as_bytes())?;
    info!(path = %path.as_ref().display(), "text report written");
    Ok(())
}
