use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use plexnp_core::{PreferenceStore, Preferences};
use sqlx::{Row, SqlitePool};

/// Repository for preference key/value pairs
#[derive(Clone)]
pub struct PreferenceRepository {
    pool: SqlitePool,
}

impl PreferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM preference WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get(0)))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO preference (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM preference WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM preference ORDER BY key")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|r| (r.get(0), r.get(1))).collect())
    }
}

#[async_trait]
impl PreferenceStore for PreferenceRepository {
    async fn load(&self) -> Result<Preferences> {
        let pairs = self.list_all().await.context("Failed to read preferences")?;
        Ok(Preferences::from_pairs(pairs))
    }

    async fn save(&self, prefs: &Preferences) -> Result<()> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for (key, value) in prefs.to_pairs() {
            sqlx::query(
                "INSERT INTO preference (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.context("Failed to save preferences")?;
        tracing::info!("Saved preferences for {}:{}", prefs.host, prefs.port);
        Ok(())
    }
}
