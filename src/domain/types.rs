use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict returned by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLabel {
    Trustworthy,
    Untrustworthy,
}

impl TrustLabel {
    pub fn is_trustworthy(self) -> bool {
        matches!(self, TrustLabel::Trustworthy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrustLabel::Trustworthy => "trustworthy",
            TrustLabel::Untrustworthy => "untrustworthy",
        }
    }
}

impl fmt::Display for TrustLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub label: TrustLabel,
    /// Always within `0..=100`.
    pub confidence: u8,
    pub summary: String,
    pub model: String,
}

/// Flags shared with the settings UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enabled: bool,
    pub auto_analyze: bool,
    pub cache_results: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_analyze: true,
            cache_results: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_snapshot_fills_missing_keys_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"cacheResults": false}"#).unwrap();
        assert!(settings.enabled);
        assert!(settings.auto_analyze);
        assert!(!settings.cache_results);
    }
}
