use anyhow::Result;
use sqlx::{query, query_as, sqlite::SqlitePool};

use crate::domain::Settings;

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_AUTO_ANALYZE: &str = "autoAnalyze";
pub const KEY_CACHE_RESULTS: &str = "cacheResults";

/// Key-value store for the flags shared with the settings UI.
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Unset keys take their default, so an empty store loads as enabled.
    pub async fn load(&self) -> Result<Settings> {
        let rows: Vec<(String, i64)> = query_as(r#"SELECT key, value FROM settings"#)
            .fetch_all(&self.pool)
            .await?;

        let mut settings = Settings::default();
        for (key, value) in rows {
            let flag = value != 0;
            match key.as_str() {
                KEY_ENABLED => settings.enabled = flag,
                KEY_AUTO_ANALYZE => settings.auto_analyze = flag,
                KEY_CACHE_RESULTS => settings.cache_results = flag,
                other => {
                    tracing::debug!(target: "settings", key = other, "ignoring unknown setting")
                }
            }
        }
        Ok(settings)
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            (KEY_ENABLED, settings.enabled),
            (KEY_AUTO_ANALYZE, settings.auto_analyze),
            (KEY_CACHE_RESULTS, settings.cache_results),
        ] {
            query(
                r#"INSERT OR REPLACE INTO settings (key, value, updated_at)
                    VALUES (?1, ?2, CURRENT_TIMESTAMP)"#,
            )
            .bind(key)
            .bind(i64::from(value))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn memory_repo() -> SettingsRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::migrate(&pool).await.unwrap();
        SettingsRepository::new(pool)
    }

    #[tokio::test]
    async fn empty_store_defaults_to_enabled() {
        let repo = memory_repo().await;
        assert_eq!(repo.load().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn saved_settings_are_loaded_back() {
        let repo = memory_repo().await;
        let settings = Settings {
            enabled: false,
            auto_analyze: false,
            cache_results: true,
        };
        repo.save(&settings).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), settings);

        let flipped = Settings {
            enabled: true,
            ..settings
        };
        repo.save(&flipped).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), flipped);
    }

    #[tokio::test]
    async fn partially_written_store_keeps_defaults_for_missing_keys() {
        let repo = memory_repo().await;
        query(r#"INSERT INTO settings (key, value) VALUES ('cacheResults', 0)"#)
            .execute(&repo.pool)
            .await
            .unwrap();
        let loaded = repo.load().await.unwrap();
        assert!(loaded.enabled);
        assert!(loaded.auto_analyze);
        assert!(!loaded.cache_results);
    }

    #[tokio::test]
    async fn file_backed_pool_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("settings.db");
        let settings = Settings {
            enabled: false,
            ..Settings::default()
        };

        let repo = SettingsRepository::new(crate::db::init_pool(&db_path).await.unwrap());
        repo.save(&settings).await.unwrap();
        repo.close().await;

        let reopened = SettingsRepository::new(crate::db::init_pool(&db_path).await.unwrap());
        assert_eq!(reopened.load().await.unwrap(), settings);
        reopened.close().await;
    }
}
