use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Why a single analysis failed. Every variant renders the same
/// "Analysis Failed" label with a retry affordance.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Network(#[source] reqwest::Error),
    #[error("analysis request timed out after {0:?}")]
    Timeout(Duration),
    #[error("analysis service returned HTTP {0}")]
    Status(StatusCode),
    #[error("analysis service reported an error: {0}")]
    Service(String),
    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

impl AnalysisError {
    /// Transport-class failures, as opposed to a body we could not use.
    pub fn is_network(&self) -> bool {
        !matches!(self, AnalysisError::Malformed(_))
    }
}
