use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use url::Url;

use crate::{
    db::settings::SettingsRepository,
    domain::{AnalysisResult, BusMessage},
    orchestrator::Orchestrator,
    settings::SettingsTransition,
    tasks::debounce::ScanDebouncer,
};

pub const FEEDBACK_PATH: &str = "/feedback";

/// Receives feedback pages the background side should open.
pub trait FeedbackSink: Send + Sync {
    fn open(&self, feedback_url: &Url);
}

/// Prints one JSON line per feedback request on stdout.
pub struct StdoutFeedbackSink;

#[derive(Serialize)]
struct FeedbackLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    url: &'a str,
}

impl FeedbackSink for StdoutFeedbackSink {
    fn open(&self, feedback_url: &Url) {
        let line = FeedbackLine {
            kind: "FEEDBACK_OPENED",
            url: feedback_url.as_str(),
        };
        match serde_json::to_string(&line) {
            Ok(json) => println!("{json}"),
            Err(err) => tracing::warn!(target: "relay", error = %err, "failed to encode feedback line"),
        }
    }
}

pub fn feedback_url(server_url: &str, url: &str, analysis: &AnalysisResult) -> Option<Url> {
    let mut feedback = Url::parse(&format!("{server_url}{FEEDBACK_PATH}")).ok()?;
    feedback
        .query_pairs_mut()
        .append_pair("url", url)
        .append_pair("label", analysis.label.as_str())
        .append_pair("confidence", &analysis.confidence.to_string())
        .append_pair("model", &analysis.model);
    Some(feedback)
}

/// Dispatches bus messages to the orchestrator, the debouncer, the settings
/// store and the feedback collaborator.
pub struct MessageRelay {
    orchestrator: Arc<Orchestrator>,
    debouncer: ScanDebouncer,
    settings_store: Option<SettingsRepository>,
    feedback: Arc<dyn FeedbackSink>,
    server_url: String,
    // One write to the settings store at a time.
    persist: AsyncMutex<()>,
}

impl MessageRelay {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        debouncer: ScanDebouncer,
        settings_store: Option<SettingsRepository>,
        feedback: Arc<dyn FeedbackSink>,
        server_url: String,
    ) -> Self {
        Self {
            orchestrator,
            debouncer,
            settings_store,
            feedback,
            server_url,
            persist: AsyncMutex::new(()),
        }
    }

    /// Parses one JSON line from the bus. Garbage is logged and ignored.
    pub fn decode(line: &str) -> Option<BusMessage> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<BusMessage>(line) {
            Ok(msg) => Some(msg),
            Err(err) => {
                tracing::warn!(target: "relay", error = %err, "undecodable bus message ignored");
                None
            }
        }
    }

    pub async fn handle(&self, msg: BusMessage) {
        tracing::debug!(target: "relay", kind = msg.kind(), "bus message");
        match msg {
            BusMessage::SettingsUpdated { settings } => {
                // Applied before the first await so later snapshots win.
                let transition = self.orchestrator.apply_settings(settings);
                self.persist_settings().await;
                let still_enabled = self.orchestrator.settings().enabled;
                if transition == SettingsTransition::Enabled && still_enabled {
                    self.orchestrator.scan().await;
                }
            }
            BusMessage::ClearCache => {
                self.orchestrator.clear_cache().await;
            }
            BusMessage::OpenFeedback { analysis, url } => {
                match feedback_url(&self.server_url, &url, &analysis) {
                    Some(target) => self.feedback.open(&target),
                    None => tracing::warn!(target: "relay", url = %url, "could not build feedback URL"),
                }
            }
            BusMessage::PageMutated { html } => {
                let added = self.orchestrator.page().append_html(&html);
                tracing::debug!(target: "relay", added, "page mutated");
                self.debouncer.notify();
            }
            BusMessage::AnalyzePage => {
                self.orchestrator.scan().await;
            }
            BusMessage::Retry { element_id } => {
                self.orchestrator.retry(element_id).await;
            }
            BusMessage::RequestFeedback { element_id } => {
                self.orchestrator.request_feedback(element_id);
            }
            BusMessage::Unknown => {
                tracing::debug!(target: "relay", "unknown message type ignored");
            }
        }
    }
}

impl MessageRelay {
    /// Writes whatever snapshot is current once the store is free, so the
    /// last write always matches the in-memory settings.
    async fn persist_settings(&self) {
        let Some(store) = &self.settings_store else {
            return;
        };
        let _serial = self.persist.lock().await;
        let current = self.orchestrator.settings();
        if let Err(err) = store.save(&current).await {
            tracing::warn!(target: "relay", error = %err, "failed to persist settings");
        }
    }
}
