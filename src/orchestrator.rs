use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    analysis::AnalysisError,
    domain::{AnalysisResult, BusMessage, ElementId, Settings},
    page::{
        eligibility, render::FAILED_TEXT, target, Candidate, ElementState, ProcessingGuard,
        ResultPage,
    },
    pipeline::{AnalysisPipeline, Resolved},
    settings::{SettingsTransition, SharedSettings},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementOutcome {
    Cached,
    Labeled,
    Failed,
    Discarded,
}

/// Tally of one scan, mostly for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub candidates: usize,
    pub skipped: usize,
    pub cached: usize,
    pub labeled: usize,
    pub failed: usize,
    pub discarded: usize,
}

pub struct Orchestrator {
    page: Arc<ResultPage>,
    pipeline: Arc<AnalysisPipeline>,
    settings: SharedSettings,
    host_domain: String,
    outbound: UnboundedSender<BusMessage>,
}

impl Orchestrator {
    pub fn new(
        page: Arc<ResultPage>,
        pipeline: Arc<AnalysisPipeline>,
        settings: SharedSettings,
        host_domain: String,
        outbound: UnboundedSender<BusMessage>,
    ) -> Self {
        Self {
            page,
            pipeline,
            settings,
            host_domain,
            outbound,
        }
    }

    pub fn page(&self) -> &ResultPage {
        &self.page
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    /// Scan triggered by page load or DOM mutation; gated on `autoAnalyze`.
    pub async fn auto_scan(&self) -> Option<ScanReport> {
        if !self.settings.get().auto_analyze {
            tracing::debug!(target: "orchestrator", "auto analysis disabled; skipping scan");
            return None;
        }
        Some(self.scan().await)
    }

    /// Runs every eligible element through the pipeline. A failing element
    /// only affects its own label.
    pub async fn scan(&self) -> ScanReport {
        let mut report = ScanReport::default();
        if !self.settings.is_enabled() {
            tracing::debug!(target: "orchestrator", "extension disabled; scan skipped");
            return report;
        }

        let epoch = self.page.epoch();
        let mut candidates = Vec::new();
        for element in self.page.snapshot() {
            match eligibility(&element, &self.host_domain) {
                Ok(candidate) => candidates.push(candidate),
                Err(reason) => {
                    report.skipped += 1;
                    tracing::trace!(target: "orchestrator", id = element.id.0, ?reason, "element skipped");
                }
            }
        }
        report.candidates = candidates.len();

        let outcomes = join_all(
            candidates
                .iter()
                .map(|candidate| self.process(candidate, epoch)),
        )
        .await;
        for outcome in outcomes {
            match outcome {
                ElementOutcome::Cached => report.cached += 1,
                ElementOutcome::Labeled => report.labeled += 1,
                ElementOutcome::Failed => report.failed += 1,
                ElementOutcome::Discarded => report.discarded += 1,
            }
        }

        tracing::info!(
            target: "orchestrator",
            candidates = report.candidates,
            skipped = report.skipped,
            cached = report.cached,
            labeled = report.labeled,
            failed = report.failed,
            "scan finished"
        );
        report
    }

    /// Re-runs a failed element from the loading step, bypassing the cache.
    pub async fn retry(&self, id: ElementId) -> bool {
        if !self.settings.is_enabled() {
            return false;
        }
        let Some(element) = self.page.element(id) else {
            tracing::debug!(target: "orchestrator", id = id.0, "retry for unknown element");
            return false;
        };
        if !matches!(element.state, ElementState::Failed(_)) {
            return false;
        }
        let Ok(candidate) = target(&element, &self.host_domain) else {
            return false;
        };
        tracing::info!(target: "orchestrator", id = id.0, url = %candidate.url, "retrying analysis");
        let Some(guard) = self.page.begin_processing(id, self.page.epoch(), true) else {
            return false;
        };
        let outcome = self.pipeline.fetch(&candidate.url, &candidate.title).await;
        matches!(
            self.settle(guard, outcome),
            ElementOutcome::Labeled | ElementOutcome::Failed
        )
    }

    async fn process(&self, candidate: &Candidate, epoch: u64) -> ElementOutcome {
        let resolved = self
            .pipeline
            .analyze(&candidate.url, &candidate.title, || {
                self.page.begin_processing(candidate.id, epoch, false)
            })
            .await;
        match resolved {
            Resolved::Cached(hit) => {
                if self.page.apply_cached(candidate.id, epoch, hit) {
                    ElementOutcome::Cached
                } else {
                    ElementOutcome::Discarded
                }
            }
            Resolved::Fetched(guard, outcome) => self.settle(guard, outcome),
            Resolved::Declined => ElementOutcome::Discarded,
        }
    }

    /// Turns a network outcome into a label, unless the user disabled the
    /// extension while the request was in flight.
    fn settle(
        &self,
        guard: ProcessingGuard<'_>,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> ElementOutcome {
        if !self.settings.is_enabled() {
            return ElementOutcome::Discarded;
        }

        let (rendered, outcome) = match outcome {
            Ok(result) => (guard.label(result), ElementOutcome::Labeled),
            Err(err) => (guard.fail(format!("{FAILED_TEXT}: {err}")), ElementOutcome::Failed),
        };
        if rendered {
            outcome
        } else {
            ElementOutcome::Discarded
        }
    }

    /// Applies a full settings snapshot from the settings UI. Never yields,
    /// so snapshots take effect in the order they are applied. The caller
    /// scans on `Enabled`.
    pub fn apply_settings(&self, next: Settings) -> SettingsTransition {
        let transition = self.settings.set(next);
        match transition {
            SettingsTransition::Disabled => {
                let removed = self.page.remove_labels();
                tracing::info!(target: "orchestrator", removed, "disabled; labels removed");
            }
            SettingsTransition::Enabled => {
                tracing::info!(target: "orchestrator", "enabled");
            }
            SettingsTransition::Unchanged => {}
        }
        transition
    }

    /// Empties the cache and makes the page look unvisited, then rescans if
    /// enabled.
    pub async fn clear_cache(&self) -> Option<ScanReport> {
        let dropped = self.pipeline.clear_cache();
        let removed = self.page.reset();
        tracing::info!(target: "orchestrator", dropped, removed, "cache cleared");
        if self.settings.is_enabled() {
            Some(self.scan().await)
        } else {
            None
        }
    }

    /// Asks the background side to open the feedback form for a verdict.
    pub fn request_feedback(&self, id: ElementId) -> bool {
        let Some(element) = self.page.element(id) else {
            return false;
        };
        let ElementState::Labeled(analysis) = &element.state else {
            return false;
        };
        // Same URL string the verdict was requested and cached under.
        let Ok(candidate) = target(&element, &self.host_domain) else {
            return false;
        };
        let msg = BusMessage::OpenFeedback {
            analysis: analysis.clone(),
            url: candidate.url,
        };
        if self.outbound.send(msg).is_err() {
            tracing::warn!(target: "orchestrator", id = id.0, "message bus closed; feedback dropped");
            return false;
        }
        true
    }
}
