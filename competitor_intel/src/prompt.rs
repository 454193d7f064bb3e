//! Prompt construction for each analysis category.
//!
//! Building a prompt is a pure function of the target, the category, and the
//! content bundle. Which pages feed a category is decided by a [`SourceMap`],
//! so the fallback behaviour can be inspected and changed without touching
//! the templates.

use crate::{AnalysisCategory, ContentBundle, PageSlot, Target};

/// Pages that feed one category. `fallback` is consulted only when none of
/// the `primary` pages were acquired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePlan {
    pub primary: Vec<PageSlot>,
    pub fallback: Vec<PageSlot>,
}

impl SourcePlan {
    pub fn new(primary: Vec<PageSlot>, fallback: Vec<PageSlot>) -> Self {
        Self { primary, fallback }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap {
    plans: [SourcePlan; 4],
}

impl Default for SourceMap {
    fn default() -> Self {
        use PageSlot::*;
        Self {
            plans: [
                SourcePlan::new(vec![Home, About], vec![]),
                SourcePlan::new(vec![Pricing], vec![Home]),
                SourcePlan::new(vec![Features], vec![Home]),
                SourcePlan::new(vec![Home, Pricing, Features, About], vec![]),
            ],
        }
    }
}

impl SourceMap {
    pub fn with_plan(mut self, category: AnalysisCategory, plan: SourcePlan) -> Self {
        self.plans[category.index()] = plan;
        self
    }

    pub fn plan(&self, category: AnalysisCategory) -> &SourcePlan {
        &self.plans[category.index()]
    }

    /// Slots whose text goes into the prompt for `category`: the acquired
    /// primary slots, else the acquired fallback slots, else the home page.
    pub fn resolve(&self, category: AnalysisCategory, bundle: &ContentBundle) -> Vec<PageSlot> {
        let plan = self.plan(category);
        let present = |slots: &[PageSlot]| -> Vec<PageSlot> {
            let mut found = Vec::new();
            for &slot in slots {
                if bundle.contains(slot) && !found.contains(&slot) {
                    found.push(slot);
                }
            }
            found
        };

        let primary = present(&plan.primary);
        if !primary.is_empty() {
            return primary;
        }
        let fallback = present(&plan.fallback);
        if !fallback.is_empty() {
            return fallback;
        }
        present(&[PageSlot::Home])
    }
}

struct Template {
    task: &'static str,
    sections: &'static [&'static str],
    guidance: &'static str,
}

fn template(category: AnalysisCategory) -> Template {
    match category {
        AnalysisCategory::Overview => Template {
            task: "Write a competitive overview",
            sections: &[
                "Company Summary",
                "Target Customers",
                "Value Proposition",
                "Positioning and Messaging",
                "Key Differentiators",
            ],
            guidance: "Keep each section to two or three bullet points.",
        },
        AnalysisCategory::Pricing => Template {
            task: "Analyse the pricing",
            sections: &[
                "Pricing Model",
                "Tiers",
                "Price Range",
                "Billing",
                "Free Offering",
                "Observations",
            ],
            guidance: "Quote prices exactly as shown; never estimate prices that are not on the page.",
        },
        AnalysisCategory::Features => Template {
            task: "Analyse the product features",
            sections: &[
                "Core Features",
                "Integrations",
                "Target Use Cases",
                "Unique Features",
                "Apparent Gaps",
            ],
            guidance: "List concrete capabilities rather than marketing claims.",
        },
        AnalysisCategory::Swot => Template {
            task: "Perform a SWOT analysis",
            sections: &["Strengths", "Weaknesses", "Opportunities", "Threats"],
            guidance: "Give three to five short bullet points per section, each tied to evidence from the content.",
        },
    }
}

fn page_heading(slot: PageSlot) -> &'static str {
    match slot {
        PageSlot::Home => "HOME PAGE",
        PageSlot::Pricing => "PRICING PAGE",
        PageSlot::Features => "FEATURES PAGE",
        PageSlot::About => "ABOUT PAGE",
    }
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sources: SourceMap,
}

impl PromptBuilder {
    pub fn new(sources: SourceMap) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    pub fn build(
        &self,
        target: &Target,
        category: AnalysisCategory,
        bundle: &ContentBundle,
    ) -> String {
        let template = template(category);
        let company = target.company_name();
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Act as a competitive intelligence analyst. {} for {} ({}) using only the website content below.\n",
            template.task,
            company,
            target.base_url()
        ));
        prompt.push_str(&format!("Analysis type: {}\n\n", category.label()));
        prompt.push_str(
            "Respond with exactly these sections, in this order, each as a markdown heading followed by a short bulleted list:\n",
        );
        for section in template.sections {
            prompt.push_str(&format!("## {}\n", section));
        }
        prompt.push('\n');
        prompt.push_str(template.guidance);
        prompt.push_str("\nIf the content does not support a section, write \"Not stated on the website.\" under it.\n\nWEBSITE CONTENT:\n");

        let slots = self.sources.resolve(category, bundle);
        if slots.is_empty() {
            prompt.push_str("(no content available)\n");
        }
        for slot in slots {
            let text = bundle.get(slot).unwrap_or_default();
            prompt.push_str(&format!("=== {} ===\n", page_heading(slot)));
            if text.is_empty() {
                prompt.push_str("(page contained no readable text)\n");
            } else {
                prompt.push_str(text);
                prompt.push('\n');
            }
        }

        prompt
    }
}
