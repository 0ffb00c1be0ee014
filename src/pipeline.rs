use std::sync::Arc;

use crate::{
    analysis::{AnalysisClient, AnalysisError},
    cache::ResultCache,
    domain::AnalysisResult,
    settings::SharedSettings,
};

/// How [`AnalysisPipeline::analyze`] settled a request.
#[derive(Debug)]
pub enum Resolved<M> {
    Cached(AnalysisResult),
    /// The marker returned by the caller's hook, plus the network outcome.
    Fetched(M, Result<AnalysisResult, AnalysisError>),
    /// The hook refused to start a request; nothing was sent.
    Declined,
}

/// Cache-then-network resolution of one `(url, title)` pair.
///
/// Concurrent calls for the same URL before the first one is cached are not
/// deduplicated.
pub struct AnalysisPipeline {
    client: AnalysisClient,
    cache: Arc<ResultCache>,
    settings: SharedSettings,
}

impl AnalysisPipeline {
    pub fn new(client: AnalysisClient, cache: Arc<ResultCache>, settings: SharedSettings) -> Self {
        Self {
            client,
            cache,
            settings,
        }
    }

    pub fn cached(&self, url: &str) -> Option<AnalysisResult> {
        let hit = self.cache.get(url)?;
        tracing::debug!(
            target: "pipeline",
            url,
            cached_at = ?self.cache.cached_at(url),
            "cache hit"
        );
        Some(hit)
    }

    /// Looks up `url` in the cache and, on a miss, calls `mark` before the
    /// single network request. `mark` returning `None` aborts the request.
    pub async fn analyze<M, F>(&self, url: &str, title: &str, mark: F) -> Resolved<M>
    where
        F: FnOnce() -> Option<M>,
    {
        if let Some(hit) = self.cached(url) {
            return Resolved::Cached(hit);
        }
        let Some(marker) = mark() else {
            return Resolved::Declined;
        };
        let outcome = self.fetch(url, title).await;
        Resolved::Fetched(marker, outcome)
    }

    /// Skips the cache lookup but still records a successful result.
    pub async fn fetch(&self, url: &str, title: &str) -> Result<AnalysisResult, AnalysisError> {
        match self.client.analyze(url, title).await {
            Ok(result) => {
                if self.settings.get().cache_results {
                    self.cache.put(url, result.clone());
                }
                tracing::info!(
                    target: "pipeline",
                    url,
                    label = %result.label,
                    confidence = result.confidence,
                    model = %result.model,
                    "analysis completed"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(
                    target: "pipeline",
                    url,
                    network = err.is_network(),
                    error = %err,
                    "analysis failed"
                );
                Err(err)
            }
        }
    }

    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }
}
