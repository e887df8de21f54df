use std::collections::HashMap;

use sqlx::Row;

use super::{EmojiRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmojiRepository {
    pool: DbPool,
}

impl SqlEmojiRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EmojiRepository for SqlEmojiRepository {
    async fn load_all(&self) -> Result<HashMap<String, String>, RepositoryError> {
        let rows =
            sqlx::query("SELECT name, reference FROM emoji_registry").fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("name").map_err(RepositoryError::decode)?;
                let reference: String =
                    row.try_get("reference").map_err(RepositoryError::decode)?;
                Ok((name, reference))
            })
            .collect()
    }

    async fn upsert(&self, name: &str, reference: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO emoji_registry (name, reference, updated_at)
             VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(name) DO UPDATE SET
                reference = excluded.reference,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(name)
        .bind(reference)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqlEmojiRepository;
    use crate::repositories::EmojiRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn upsert_replaces_reference_for_existing_name() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlEmojiRepository::new(pool);

        repo.upsert("check", "<:check:1>").await.expect("insert");
        repo.upsert("star", "<:star:2>").await.expect("insert");
        repo.upsert("check", "<:check:3>").await.expect("replace");

        let entries = repo.load_all().await.expect("load");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("check").map(String::as_str), Some("<:check:3>"));
        assert_eq!(entries.get("star").map(String::as_str), Some("<:star:2>"));
    }
}
