use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::{AnalysisResult, ElementId};

use super::parse::ResultScraper;

/// Processing state of one result; the label, if any, lives inside it so an
/// element can never carry two.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "label", rename_all = "lowercase")]
pub enum ElementState {
    Idle,
    Processing,
    Labeled(AnalysisResult),
    Failed(String),
}

impl ElementState {
    pub fn has_label(&self) -> bool {
        matches!(self, ElementState::Labeled(_) | ElementState::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultElement {
    pub id: ElementId,
    pub link: Option<String>,
    pub title: Option<String>,
    #[serde(flatten)]
    pub state: ElementState,
}

#[derive(Debug, Default)]
struct PageState {
    elements: Vec<ResultElement>,
    epoch: u64,
}

/// In-memory stand-in for the search page DOM.
///
/// `epoch` moves forward on every reset; work started under an older epoch
/// is not allowed to write labels.
pub struct ResultPage {
    scraper: ResultScraper,
    state: Mutex<PageState>,
}

impl ResultPage {
    pub fn new(scraper: ResultScraper) -> Self {
        Self {
            scraper,
            state: Mutex::new(PageState::default()),
        }
    }

    /// Adds the result nodes found in `html`. Returns how many were added.
    pub fn append_html(&self, html: &str) -> usize {
        let scraped = self.scraper.scrape(html);
        let mut state = self.state.lock();
        let start = state.elements.len();
        state
            .elements
            .extend(scraped.into_iter().enumerate().map(|(offset, result)| ResultElement {
                id: ElementId(start + offset),
                link: result.link,
                title: result.title,
                state: ElementState::Idle,
            }));
        state.elements.len() - start
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    pub fn snapshot(&self) -> Vec<ResultElement> {
        self.state.lock().elements.clone()
    }

    pub fn element(&self, id: ElementId) -> Option<ResultElement> {
        self.state.lock().elements.get(id.0).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().elements.len()
    }

    #[cfg(test)]
    pub fn label_count(&self) -> usize {
        self.state
            .lock()
            .elements
            .iter()
            .filter(|el| el.state.has_label())
            .count()
    }

    /// Writes a cached verdict straight onto an idle element.
    pub fn apply_cached(&self, id: ElementId, epoch: u64, result: AnalysisResult) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return false;
        }
        match state.elements.get_mut(id.0) {
            Some(el) if el.state == ElementState::Idle => {
                el.state = ElementState::Labeled(result);
                true
            }
            _ => false,
        }
    }

    /// Marks the element as processing if it is idle, or failed when
    /// `allow_failed` is set (retry). The guard clears the mark on drop.
    pub fn begin_processing(
        &self,
        id: ElementId,
        epoch: u64,
        allow_failed: bool,
    ) -> Option<ProcessingGuard<'_>> {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return None;
        }
        let el = state.elements.get_mut(id.0)?;
        let startable = match el.state {
            ElementState::Idle => true,
            ElementState::Failed(_) => allow_failed,
            _ => false,
        };
        if !startable {
            return None;
        }
        el.state = ElementState::Processing;
        Some(ProcessingGuard {
            page: self,
            id,
            epoch,
            finished: false,
        })
    }

    /// Drops every label and resets nothing else. In-flight elements stay
    /// marked until their guard resolves.
    pub fn remove_labels(&self) -> usize {
        let mut state = self.state.lock();
        let mut removed = 0;
        for el in state.elements.iter_mut().filter(|el| el.state.has_label()) {
            el.state = ElementState::Idle;
            removed += 1;
        }
        removed
    }

    /// Removes all labels, clears every processing mark and starts a new
    /// epoch, so the next scan sees an unvisited page.
    pub fn reset(&self) -> usize {
        let mut state = self.state.lock();
        state.epoch += 1;
        let mut removed = 0;
        for el in state.elements.iter_mut() {
            if el.state.has_label() {
                removed += 1;
            }
            el.state = ElementState::Idle;
        }
        removed
    }

    fn settle(&self, id: ElementId, epoch: u64, next: ElementState) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return false;
        }
        match state.elements.get_mut(id.0) {
            Some(el) if el.state == ElementState::Processing => {
                el.state = next;
                true
            }
            _ => false,
        }
    }
}

/// Loading indicator for one element. Exactly one of `label`, `fail` or
/// drop moves the element out of `Processing`.
pub struct ProcessingGuard<'a> {
    page: &'a ResultPage,
    id: ElementId,
    epoch: u64,
    finished: bool,
}

impl ProcessingGuard<'_> {
    pub fn label(mut self, result: AnalysisResult) -> bool {
        self.finished = true;
        self.page
            .settle(self.id, self.epoch, ElementState::Labeled(result))
    }

    pub fn fail(mut self, message: String) -> bool {
        self.finished = true;
        self.page
            .settle(self.id, self.epoch, ElementState::Failed(message))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.page.settle(self.id, self.epoch, ElementState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrustLabel;

    fn page_with(n: usize) -> ResultPage {
        let page = ResultPage::new(ResultScraper::new("div.g").unwrap());
        let html: String = (0..n)
            .map(|i| format!(r#"<div class="g"><a href="https://site{i}.test/"><h3>Site {i}</h3></a></div>"#))
            .collect();
        assert_eq!(page.append_html(&html), n);
        page
    }

    fn verdict() -> AnalysisResult {
        AnalysisResult {
            label: TrustLabel::Trustworthy,
            confidence: 90,
            summary: "fine".into(),
            model: "m".into(),
        }
    }

    #[test]
    fn appended_elements_get_sequential_ids() {
        let page = page_with(2);
        page.append_html(r#"<div class="g"><h3>late</h3></div>"#);
        let ids: Vec<_> = page.snapshot().iter().map(|el| el.id).collect();
        assert_eq!(ids, vec![ElementId(0), ElementId(1), ElementId(2)]);
    }

    #[test]
    fn dropping_a_guard_clears_the_processing_mark() {
        let page = page_with(1);
        let epoch = page.epoch();
        {
            let _guard = page.begin_processing(ElementId(0), epoch, false).unwrap();
            assert_eq!(page.element(ElementId(0)).unwrap().state, ElementState::Processing);
            assert!(page.begin_processing(ElementId(0), epoch, false).is_none());
        }
        assert_eq!(page.element(ElementId(0)).unwrap().state, ElementState::Idle);
    }

    #[test]
    fn guard_clears_the_mark_while_unwinding() {
        let page = page_with(1);
        let epoch = page.epoch();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = page.begin_processing(ElementId(0), epoch, false).unwrap();
            panic!("renderer blew up");
        }));
        assert!(outcome.is_err());
        assert_eq!(page.element(ElementId(0)).unwrap().state, ElementState::Idle);
    }

    #[test]
    fn only_failed_elements_can_be_restarted_for_retry() {
        let page = page_with(1);
        let epoch = page.epoch();
        let guard = page.begin_processing(ElementId(0), epoch, false).unwrap();
        assert!(guard.fail("Analysis Failed".into()));
        assert!(page.begin_processing(ElementId(0), epoch, false).is_none());
        let guard = page.begin_processing(ElementId(0), epoch, true).unwrap();
        assert!(guard.label(verdict()));
        assert!(page.begin_processing(ElementId(0), epoch, true).is_none());
    }

    #[test]
    fn reset_discards_work_from_the_previous_epoch() {
        let page = page_with(2);
        let epoch = page.epoch();
        assert!(page.apply_cached(ElementId(1), epoch, verdict()));
        let guard = page.begin_processing(ElementId(0), epoch, false).unwrap();

        assert_eq!(page.reset(), 1);
        assert!(!guard.label(verdict()));
        assert_eq!(page.label_count(), 0);
        assert!(page
            .snapshot()
            .iter()
            .all(|el| el.state == ElementState::Idle));
        assert!(!page.apply_cached(ElementId(0), epoch, verdict()));
    }

    #[test]
    fn remove_labels_keeps_in_flight_marks() {
        let page = page_with(2);
        let epoch = page.epoch();
        page.apply_cached(ElementId(0), epoch, verdict());
        let _guard = page.begin_processing(ElementId(1), epoch, false).unwrap();
        assert_eq!(page.remove_labels(), 1);
        assert_eq!(page.element(ElementId(1)).unwrap().state, ElementState::Processing);
    }
}
