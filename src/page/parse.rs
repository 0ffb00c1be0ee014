use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3").expect("valid title selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Link and title scraped from one result node, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedResult {
    pub link: Option<String>,
    pub title: Option<String>,
}

pub struct ResultScraper {
    result_selector: Selector,
}

impl ResultScraper {
    pub fn new(result_selector: &str) -> Result<Self> {
        let result_selector = Selector::parse(result_selector)
            .map_err(|err| anyhow!("invalid result selector {result_selector:?}: {err:?}"))?;
        Ok(Self { result_selector })
    }

    pub fn scrape(&self, html: &str) -> Vec<ScrapedResult> {
        let document = Html::parse_document(html);
        document
            .select(&self.result_selector)
            .filter(|node| !has_result_ancestor(node, &self.result_selector))
            .map(|node| ScrapedResult {
                link: primary_link(&node),
                title: node
                    .select(&TITLE_SELECTOR)
                    .next()
                    .map(|title| collapse_whitespace(&title.text().collect::<String>()))
                    .filter(|title| !title.is_empty()),
            })
            .collect()
    }
}

/// Prefers the anchor wrapping the heading; falls back to the first anchor.
fn primary_link(node: &ElementRef<'_>) -> Option<String> {
    let mut anchors = node.select(&LINK_SELECTOR).peekable();
    let first = anchors.peek().copied();
    anchors
        .find(|anchor| anchor.select(&TITLE_SELECTOR).next().is_some())
        .or(first)
        .and_then(|anchor| anchor.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

// Nested markers (a result card inside a result block) count once.
fn has_result_ancestor(node: &ElementRef<'_>, selector: &Selector) -> bool {
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| selector.matches(&ancestor))
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrapes_link_and_title_from_each_result() {
        let html = r#"
            <div id="search">
              <div class="g">
                <a href="/search?q=related">Related</a>
                <a href="https://example.com/a"><h3>  Example
                   Domain </h3></a>
              </div>
              <div class="g"><h3>No link here</h3></div>
              <div class="g"><a href="https://example.org/b">plain</a></div>
            </div>"#;
        let scraped = ResultScraper::new("div.g").unwrap().scrape(html);
        assert_eq!(
            scraped,
            vec![
                ScrapedResult {
                    link: Some("https://example.com/a".into()),
                    title: Some("Example Domain".into()),
                },
                ScrapedResult {
                    link: None,
                    title: Some("No link here".into()),
                },
                ScrapedResult {
                    link: Some("https://example.org/b".into()),
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn nested_result_markers_are_not_double_counted() {
        let html = r#"<div class="g"><div class="g"><a href="https://x.test/"><h3>X</h3></a></div></div>"#;
        assert_eq!(ResultScraper::new("div.g").unwrap().scrape(html).len(), 1);
    }

    #[test]
    fn invalid_selector_is_rejected() {
        assert!(ResultScraper::new("div[").is_err());
    }
}
