use std::{env, time::Duration};

use url::Url;

use super::env::{
    AnalysisConfig, AppConfig, ConfigError, DirectoryConfig, LoggingConfig, PageConfig,
};

const DEFAULT_RESULT_SELECTOR: &str = "div.g";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let server_url = env::var("TRUSTLENS_SERVER_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("TRUSTLENS_SERVER_URL"))?;
        let server_url = normalize_server_url(&server_url)?;

        let analysis = AnalysisConfig {
            server_url,
            request_timeout: Duration::from_millis(parse_u64("ANALYZE_TIMEOUT_MS").unwrap_or(10_000)),
        };

        let page = PageConfig {
            page_path: env::var("PAGE_PATH").ok().filter(|v| !v.is_empty()),
            host_domain: env::var("HOST_DOMAIN")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "google.com".to_string()),
            result_selector: env::var("RESULT_SELECTOR")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_RESULT_SELECTOR.to_string()),
            scan_debounce: Duration::from_millis(parse_u64("SCAN_DEBOUNCE_MS").unwrap_or(1_000)),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "settings.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            analysis,
            page,
            directories,
            logging,
        })
    }
}

fn normalize_server_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(ConfigError::Invalid {
            key: "TRUSTLENS_SERVER_URL",
            value: raw.to_string(),
        }),
    }
}

fn parse_u64(key: &str) -> Option<u64> {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_drops_trailing_slash() {
        assert_eq!(
            normalize_server_url("https://lens.example.org/ ").unwrap(),
            "https://lens.example.org"
        );
    }

    #[test]
    fn server_url_rejects_non_http_schemes() {
        assert!(matches!(
            normalize_server_url("ftp://lens.example.org"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(normalize_server_url("not a url").is_err());
    }
}
