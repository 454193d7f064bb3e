use crate::{error::ModelFailure, AnalysisCategory, Target};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryStatus {
    Success(String),
    Failed(ModelFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryResult {
    pub category: AnalysisCategory,
    pub status: CategoryStatus,
}

impl CategoryResult {
    pub fn success(category: AnalysisCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            status: CategoryStatus::Success(text.into()),
        }
    }

    pub fn failed(category: AnalysisCategory, reason: ModelFailure) -> Self {
        Self {
            category,
            status: CategoryStatus::Failed(reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, CategoryStatus::Success(_))
    }

    pub fn text(&self) -> Option<&str> {
        match &self.status {
            CategoryStatus::Success(text) => Some(text),
            CategoryStatus::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ModelFailure> {
        match &self.status {
            CategoryStatus::Success(_) => None,
            CategoryStatus::Failed(reason) => Some(reason),
        }
    }
}

/// Final output of a run: one result per category, in category order.
#[derive(Debug, Clone)]
pub struct Report {
    target: Target,
    generated_at: DateTime<Utc>,
    results: Vec<CategoryResult>,
}

impl Report {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn results(&self) -> &[CategoryResult] {
        &self.results
    }

    pub fn result(&self, category: AnalysisCategory) -> &CategoryResult {
        &self.results[category.index()]
    }

    pub fn failures(&self) -> impl Iterator<Item = &CategoryResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(CategoryResult::is_success)
    }
}

/// Orders `results` by category and stamps the report with the current time.
/// A category with no result never finished, so it is recorded as
/// `Failed(Timeout)`; a duplicate keeps its first occurrence.
pub fn assemble(target: Target, results: Vec<CategoryResult>) -> Report {
    let mut slots: [Option<CategoryResult>; 4] = Default::default();
    for result in results {
        let slot = &mut slots[result.category.index()];
        if slot.is_none() {
            *slot = Some(result);
        }
    }

    let results = AnalysisCategory::ALL
        .iter()
        .zip(slots)
        .map(|(&category, result)| {
            result.unwrap_or_else(|| CategoryResult::failed(category, ModelFailure::Timeout))
        })
        .collect();

    Report {
        target,
        generated_at: Utc::now(),
        results,
    }
}
