use reqwest::Client;

use crate::{config::AnalysisConfig, domain::AnalysisResult};

use super::{
    error::AnalysisError,
    response::{decode, AnalyzeRequest},
};

pub const ANALYZE_PATH: &str = "/api/analyze-extension";

/// Thin wrapper over the remote classification endpoint. Exactly one request
/// per call, no retries.
#[derive(Clone)]
pub struct AnalysisClient {
    http: Client,
    config: AnalysisConfig,
    endpoint: String,
}

impl AnalysisClient {
    pub fn new(http: Client, config: AnalysisConfig) -> Self {
        let endpoint = format!("{}{}", config.server_url, ANALYZE_PATH);
        Self {
            http,
            config,
            endpoint,
        }
    }

    pub async fn analyze(&self, url: &str, title: &str) -> Result<AnalysisResult, AnalysisError> {
        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.config.request_timeout)
            .json(&AnalyzeRequest { url, title })
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::Status(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        decode(&body)
    }

    fn transport_error(&self, err: reqwest::Error) -> AnalysisError {
        if err.is_timeout() {
            AnalysisError::Timeout(self.config.request_timeout)
        } else {
            AnalysisError::Network(err)
        }
    }
}
