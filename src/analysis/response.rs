use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AnalysisResult, TrustLabel};

use super::error::AnalysisError;

pub const SUMMARY_PLACEHOLDER: &str = "No summary available.";
pub const MODEL_PLACEHOLDER: &str = "unknown";

const TRUSTWORTHY_LABELS: &[&str] = &["real", "trustworthy", "reliable", "credible", "true"];
const UNTRUSTWORTHY_LABELS: &[&str] = &["fake", "untrustworthy", "unreliable", "misleading", "false"];

#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub url: &'a str,
    pub title: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<AnalyzeData>,
    pub error: Option<String>,
}

/// Loosely typed on purpose: a bad field must become `Malformed`, not a
/// decode error for the whole body.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeData {
    pub label: Option<Value>,
    pub confidence: Option<Value>,
    pub summary: Option<Value>,
    pub model: Option<Value>,
}

pub fn decode(body: &[u8]) -> Result<AnalysisResult, AnalysisError> {
    let response: AnalyzeResponse = serde_json::from_slice(body)
        .map_err(|err| AnalysisError::Malformed(format!("invalid JSON body: {err}")))?;
    normalize(response)
}

pub fn normalize(response: AnalyzeResponse) -> Result<AnalysisResult, AnalysisError> {
    if !response.success {
        let reason = response
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "request was not successful".to_string());
        return Err(AnalysisError::Service(reason));
    }

    let data = response
        .data
        .ok_or_else(|| AnalysisError::Malformed("response has no data".to_string()))?;

    let raw_label = data
        .label
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::Malformed("missing label".to_string()))?;
    let label = parse_label(raw_label)
        .ok_or_else(|| AnalysisError::Malformed(format!("unrecognized label {raw_label:?}")))?;

    let confidence = data
        .confidence
        .as_ref()
        .and_then(confidence_value)
        .map(normalize_confidence)
        .unwrap_or(0);

    Ok(AnalysisResult {
        label,
        confidence,
        summary: text_or(data.summary.as_ref(), SUMMARY_PLACEHOLDER),
        model: text_or(data.model.as_ref(), MODEL_PLACEHOLDER),
    })
}

pub fn parse_label(raw: &str) -> Option<TrustLabel> {
    let needle = raw.trim().to_ascii_lowercase();
    if TRUSTWORTHY_LABELS.contains(&needle.as_str()) {
        Some(TrustLabel::Trustworthy)
    } else if UNTRUSTWORTHY_LABELS.contains(&needle.as_str()) {
        Some(TrustLabel::Untrustworthy)
    } else {
        None
    }
}

/// Rounds half away from zero, then clamps into `0..=100`.
pub fn normalize_confidence(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn confidence_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
}

fn text_or(value: Option<&Value>, placeholder: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_reference_response() {
        let body = br#"{"success":true,"data":{"label":"Real","confidence":87.4,"summary":"ok","model":"X"}}"#;
        let result = decode(body).unwrap();
        assert_eq!(
            result,
            AnalysisResult {
                label: TrustLabel::Trustworthy,
                confidence: 87,
                summary: "ok".to_string(),
                model: "X".to_string(),
            }
        );
    }

    #[test]
    fn label_matching_ignores_case_and_whitespace() {
        assert_eq!(parse_label("  FAKE "), Some(TrustLabel::Untrustworthy));
        assert_eq!(parse_label("Trustworthy"), Some(TrustLabel::Trustworthy));
        assert_eq!(parse_label("maybe"), None);
    }

    #[test]
    fn missing_or_unknown_label_is_malformed() {
        for body in [
            r#"{"success":true,"data":{"confidence":50}}"#,
            r#"{"success":true,"data":{"label":"satire","confidence":50}}"#,
            r#"{"success":true,"data":{"label":42}}"#,
            r#"{"success":true}"#,
            r#"[1,2,3]"#,
            r#"<html>oops</html>"#,
        ] {
            let err = decode(body.as_bytes()).unwrap_err();
            assert!(matches!(err, AnalysisError::Malformed(_)), "{body}: {err:?}");
        }
    }

    #[test]
    fn unsuccessful_body_reports_service_error() {
        let err = decode(br#"{"success":false,"error":"quota exceeded"}"#).unwrap_err();
        match err {
            AnalysisError::Service(reason) => assert_eq!(reason, "quota exceeded"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn confidence_is_rounded_and_clamped() {
        assert_eq!(normalize_confidence(87.5), 88);
        assert_eq!(normalize_confidence(0.49), 0);
        assert_eq!(normalize_confidence(150.0), 100);
        assert_eq!(normalize_confidence(-3.2), 0);
        assert_eq!(normalize_confidence(f64::NAN), 0);
        assert_eq!(normalize_confidence(f64::INFINITY), 0);
    }

    #[test]
    fn missing_fields_fall_back_to_placeholders() {
        let result =
            decode(br#"{"success":true,"data":{"label":"fake","summary":"  ","confidence":"64%"}}"#)
                .unwrap();
        assert_eq!(result.label, TrustLabel::Untrustworthy);
        assert_eq!(result.confidence, 64);
        assert_eq!(result.summary, SUMMARY_PLACEHOLDER);
        assert_eq!(result.model, MODEL_PLACEHOLDER);
    }
}
