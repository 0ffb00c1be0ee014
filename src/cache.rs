use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::AnalysisResult;

#[derive(Debug, Clone)]
struct CacheEntry {
    result: AnalysisResult,
    cached_at: DateTime<Utc>,
}

/// Successful analyses keyed by the exact URL string. Lives as long as the
/// page; nothing is evicted.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<AnalysisResult> {
        self.entries.lock().get(url).map(|entry| entry.result.clone())
    }

    pub fn cached_at(&self, url: &str) -> Option<DateTime<Utc>> {
        self.entries.lock().get(url).map(|entry| entry.cached_at)
    }

    pub fn put(&self, url: &str, result: AnalysisResult) {
        self.entries.lock().insert(
            url.to_string(),
            CacheEntry {
                result,
                cached_at: Utc::now(),
            },
        );
    }

    /// Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        dropped
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TrustLabel;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            label: TrustLabel::Untrustworthy,
            confidence: 12,
            summary: "s".into(),
            model: "m".into(),
        }
    }

    #[test]
    fn lookups_are_exact_match() {
        let cache = ResultCache::new();
        cache.put("https://a.example/x", sample());
        assert_eq!(cache.get("https://a.example/x"), Some(sample()));
        assert!(cache.get("https://a.example/x/").is_none());
        assert!(cache.get("HTTPS://a.example/x").is_none());
        assert!(cache.cached_at("https://a.example/x").is_some());
    }

    #[test]
    fn clear_empties_everything() {
        let cache = ResultCache::new();
        cache.put("a", sample());
        cache.put("b", sample());
        assert_eq!(cache.clear(), 2);
        assert!(cache.get("a").is_none());
    }
}
