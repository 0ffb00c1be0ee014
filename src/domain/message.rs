use serde::{Deserialize, Serialize};

use super::types::{AnalysisResult, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub usize);

/// Messages exchanged over the extension bus, tagged by `type`.
///
/// The first three travel between the background process, the popup and the
/// content script. The rest are events raised by the host page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusMessage {
    SettingsUpdated {
        settings: Settings,
    },
    ClearCache,
    OpenFeedback {
        analysis: AnalysisResult,
        url: String,
    },
    PageMutated {
        html: String,
    },
    AnalyzePage,
    #[serde(rename_all = "camelCase")]
    Retry {
        element_id: ElementId,
    },
    #[serde(rename_all = "camelCase")]
    RequestFeedback {
        element_id: ElementId,
    },
    #[serde(other)]
    Unknown,
}

impl BusMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            BusMessage::SettingsUpdated { .. } => "SETTINGS_UPDATED",
            BusMessage::ClearCache => "CLEAR_CACHE",
            BusMessage::OpenFeedback { .. } => "OPEN_FEEDBACK",
            BusMessage::PageMutated { .. } => "PAGE_MUTATED",
            BusMessage::AnalyzePage => "ANALYZE_PAGE",
            BusMessage::Retry { .. } => "RETRY",
            BusMessage::RequestFeedback { .. } => "REQUEST_FEEDBACK",
            BusMessage::Unknown => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_message_types_decode_as_unknown() {
        let msg: BusMessage = serde_json::from_str(r#"{"type":"PING","payload":1}"#).unwrap();
        assert_eq!(msg, BusMessage::Unknown);
    }

    #[test]
    fn settings_update_uses_camel_case_keys() {
        let msg: BusMessage = serde_json::from_str(
            r#"{"type":"SETTINGS_UPDATED","settings":{"enabled":false,"autoAnalyze":true,"cacheResults":false}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            BusMessage::SettingsUpdated {
                settings: Settings {
                    enabled: false,
                    auto_analyze: true,
                    cache_results: false,
                }
            }
        );
    }

    #[test]
    fn retry_carries_element_id() {
        let msg: BusMessage = serde_json::from_str(r#"{"type":"RETRY","elementId":3}"#).unwrap();
        assert_eq!(
            msg,
            BusMessage::Retry {
                element_id: ElementId(3)
            }
        );
    }
}
