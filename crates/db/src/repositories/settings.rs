use sqlx::Row;
use tracing::warn;

use zen_core::domain::settings::{GuildSettings, SettingKey};

use super::{RepositoryError, SettingsRepository};
use crate::DbPool;

pub struct SqlSettingsRepository {
    pool: DbPool,
}

impl SqlSettingsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SettingsRepository for SqlSettingsRepository {
    async fn load(&self) -> Result<GuildSettings, RepositoryError> {
        let rows = sqlx::query("SELECT key, value FROM guild_setting").fetch_all(&self.pool).await?;

        let mut settings = GuildSettings::default();
        for row in rows {
            let key: String = row.try_get("key").map_err(RepositoryError::decode)?;
            let value: String = row.try_get("value").map_err(RepositoryError::decode)?;

            let Ok(key) = key.parse::<SettingKey>() else {
                warn!(event_name = "db.settings.unknown_key", key = %key, "ignoring unknown setting");
                continue;
            };
            let value = value.trim().parse::<u64>().map_err(|error| {
                RepositoryError::Decode(format!("setting `{key}` is not an id: {error}"))
            })?;
            settings.set(key, value);
        }

        Ok(settings)
    }

    async fn set(&self, key: SettingKey, value: u64) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO guild_setting (key, value, updated_at)
             VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key.as_str())
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
