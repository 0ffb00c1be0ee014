use url::{ParseError, Url};

use crate::domain::ElementId;

use super::document::{ElementState, ResultElement};

/// Why an element was left alone during a scan. Never surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyLabeled,
    Processing,
    MissingLink,
    MissingTitle,
    NonNavigable,
    HostDomain,
}

/// An element that should go through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: ElementId,
    /// Parsed and re-serialized href; this is the cache key.
    pub url: String,
    pub title: String,
}

/// Pure; re-running it over an unchanged page yields the same answer.
pub fn eligibility(element: &ResultElement, host_domain: &str) -> Result<Candidate, SkipReason> {
    match element.state {
        ElementState::Processing => return Err(SkipReason::Processing),
        ElementState::Labeled(_) | ElementState::Failed(_) => {
            return Err(SkipReason::AlreadyLabeled)
        }
        ElementState::Idle => {}
    }
    target(element, host_domain)
}

/// Link and title checks alone, regardless of processing state.
pub fn target(element: &ResultElement, host_domain: &str) -> Result<Candidate, SkipReason> {
    let href = element.link.as_deref().ok_or(SkipReason::MissingLink)?;
    let title = element
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(SkipReason::MissingTitle)?;

    let url = navigable_url(href, host_domain)?;
    Ok(Candidate {
        id: element.id,
        url: url.to_string(),
        title: title.to_string(),
    })
}

fn navigable_url(href: &str, host_domain: &str) -> Result<Url, SkipReason> {
    let url = match Url::parse(href) {
        Ok(url) => url,
        // Relative links resolve against the search page itself.
        Err(ParseError::RelativeUrlWithoutBase) if !href.starts_with('#') => {
            return Err(SkipReason::HostDomain)
        }
        Err(_) => return Err(SkipReason::NonNavigable),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SkipReason::NonNavigable);
    }
    let host = url.host_str().ok_or(SkipReason::NonNavigable)?;
    if is_host_domain(host, host_domain) {
        return Err(SkipReason::HostDomain);
    }
    Ok(url)
}

fn is_host_domain(host: &str, host_domain: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let domain = host_domain.trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(&domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}
