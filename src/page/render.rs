//! HTML snippets for the labels inserted next to each result. Class names
//! are fixed; the accompanying stylesheet depends on them.

use crate::domain::{AnalysisResult, ElementId};

use super::document::{ElementState, ResultElement};

pub const LABEL_CLASS: &str = "trustlens-label";
pub const TRUSTWORTHY_CLASS: &str = "trustlens-label--trustworthy";
pub const UNTRUSTWORTHY_CLASS: &str = "trustlens-label--untrustworthy";
pub const ERROR_CLASS: &str = "trustlens-label--error";
pub const LOADING_CLASS: &str = "trustlens-loading";
pub const SUMMARY_CLASS: &str = "trustlens-summary";
pub const FEEDBACK_CLASS: &str = "trustlens-feedback";
pub const RETRY_CLASS: &str = "trustlens-retry";

pub const FAILED_TEXT: &str = "Analysis Failed";

/// `None` for idle elements, which carry nothing.
pub fn element_html(element: &ResultElement) -> Option<String> {
    match &element.state {
        ElementState::Idle => None,
        ElementState::Processing => Some(format!(
            r#"<span class="{LOADING_CLASS}" data-element="{}">Analyzing…</span>"#,
            element.id.0
        )),
        ElementState::Labeled(result) => Some(verdict_html(element.id, result)),
        ElementState::Failed(reason) => Some(error_html(element.id, reason)),
    }
}

fn verdict_html(id: ElementId, result: &AnalysisResult) -> String {
    let (modifier, text) = if result.label.is_trustworthy() {
        (TRUSTWORTHY_CLASS, "Trustworthy")
    } else {
        (UNTRUSTWORTHY_CLASS, "Untrustworthy")
    };
    format!(
        concat!(
            r#"<div class="{label} {modifier}" data-element="{id}">"#,
            r#"<span class="trustlens-verdict">{text}</span> "#,
            r#"<span class="trustlens-confidence">{confidence}%</span>"#,
            r#"<details class="{summary}"><summary>Why?</summary><p>{body}</p>"#,
            r#"<small>{model}</small></details>"#,
            r#"<button class="{feedback}" data-element="{id}">Feedback</button>"#,
            "</div>"
        ),
        label = LABEL_CLASS,
        modifier = modifier,
        id = id.0,
        text = text,
        confidence = result.confidence,
        summary = SUMMARY_CLASS,
        body = escape_html(&result.summary),
        model = escape_html(&result.model),
        feedback = FEEDBACK_CLASS,
    )
}

fn error_html(id: ElementId, reason: &str) -> String {
    format!(
        concat!(
            r#"<div class="{label} {modifier}" data-element="{id}" title="{reason}">"#,
            "<span>{text}</span> ",
            r#"<button class="{retry}" data-element="{id}">Retry</button>"#,
            "</div>"
        ),
        label = LABEL_CLASS,
        modifier = ERROR_CLASS,
        id = id.0,
        reason = escape_html(reason),
        text = FAILED_TEXT,
        retry = RETRY_CLASS,
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
