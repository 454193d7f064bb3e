use crate::{error::AnalysisError, fetcher::FetchResult, FetchFailure, PageSlot};
use scraper::{Html, Node};
use std::collections::BTreeMap;
use tracing::debug;

/// Elements whose text never reaches a prompt.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Reduces raw HTML to a bounded plain-text excerpt.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    max_chars: usize,
}

impl ContentExtractor {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Visible text with whitespace collapsed, cut to the first `max_chars`
    /// characters. Markup with no text yields an empty string.
    pub fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let mut text = String::new();

        for node in document.root_element().descendants() {
            let Node::Text(fragment) = node.value() else {
                continue;
            };
            if node.ancestors().any(|a| is_skipped(a.value())) {
                continue;
            }
            for word in fragment.split_whitespace() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(word);
            }
        }

        truncate_chars(&text, self.max_chars)
    }
}

fn is_skipped(node: &Node) -> bool {
    node.as_element()
        .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Extracted text for every slot whose fetch succeeded. Always holds the
/// home page; a missing slot means its fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBundle {
    pages: BTreeMap<PageSlot, String>,
}

impl ContentBundle {
    pub fn new(pages: BTreeMap<PageSlot, String>) -> Result<Self, AnalysisError> {
        if !pages.contains_key(&PageSlot::Home) {
            return Err(AnalysisError::InvalidInput(
                "content bundle requires the home page".to_string(),
            ));
        }
        Ok(Self { pages })
    }

    /// Extracts every successful fetch. Fails with `AcquisitionFailed` when the
    /// home page is missing or failed.
    pub fn from_results(
        results: &[FetchResult],
        extractor: &ContentExtractor,
    ) -> Result<Self, AnalysisError> {
        let home = results.iter().find(|r| r.slot == PageSlot::Home);
        match home {
            Some(result) if result.html().is_some() => {}
            Some(result) => {
                return Err(AnalysisError::AcquisitionFailed {
                    url: result.url.to_string(),
                    reason: result
                        .failure()
                        .cloned()
                        .unwrap_or_else(|| FetchFailure::ConnectionError("no response".into())),
                })
            }
            None => {
                return Err(AnalysisError::AcquisitionFailed {
                    url: String::new(),
                    reason: FetchFailure::ConnectionError("home page was not requested".into()),
                })
            }
        }

        let pages = results
            .iter()
            .filter_map(|r| {
                let text = extractor.extract(r.html()?);
                debug!(slot = %r.slot, chars = text.chars().count(), "extracted page text");
                Some((r.slot, text))
            })
            .collect();

        Ok(Self { pages })
    }

    pub fn get(&self, slot: PageSlot) -> Option<&str> {
        self.pages.get(&slot).map(String::as_str)
    }

    pub fn contains(&self, slot: PageSlot) -> bool {
        self.pages.contains_key(&slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = PageSlot> + '_ {
        self.pages.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDING_PAGE: &str = r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Acme | Rockets</title>
            <style>body { color: red; }</style>
            <script>window.analytics = { track: function() {} };</script>
        </head>
        <body>
            <nav>Home   Pricing</nav>
            <h1>Rockets   for
                everyone</h1>
            <p>Launch in <b>minutes</b>.</p>
            <noscript>Enable JavaScript</noscript>
            <!-- hidden comment -->
        </body>
        </html>
    "#;

    #[test]
    fn strips_markup_scripts_and_styles() {
        let text = ContentExtractor::new(8_000).extract(LANDING_PAGE);
        assert_eq!(text, "Acme | Rockets Home Pricing Rockets for everyone Launch in minutes .");
        assert!(!text.contains("analytics"));
        assert!(!text.contains("color"));
        assert!(!text.contains("Enable JavaScript"));
        assert!(!text.contains("hidden comment"));
    }

    #[test]
    fn truncation_keeps_the_prefix() {
        let html = format!("<p>{}</p>", "word ".repeat(100));
        let text = ContentExtractor::new(12).extract(&html);
        assert_eq!(text, "word word wo");
        assert!(text.chars().count() <= 12);
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = ContentExtractor::new(3).extract("<p>Ünïcødé</p>");
        assert_eq!(text, "Ünï");
    }

    #[test]
    fn empty_markup_yields_empty_string() {
        let extractor = ContentExtractor::new(100);
        assert_eq!(extractor.extract(""), "");
        assert_eq!(extractor.extract("<html><body><script>x()</script></body></html>"), "");
    }

    #[test]
    fn bundle_requires_home() {
        let mut pages = BTreeMap::new();
        pages.insert(PageSlot::Pricing, "Plans from $10".to_string());
        assert!(ContentBundle::new(pages.clone()).is_err());

        pages.insert(PageSlot::Home, String::new());
        let bundle = ContentBundle::new(pages).unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.get(PageSlot::Home), Some(""));
        assert!(!bundle.contains(PageSlot::About));
        assert_eq!(bundle.slots().collect::<Vec<_>>(), vec![PageSlot::Home, PageSlot::Pricing]);
    }
}
