use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::debug;
use zen_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens the pool described by the `database` config section.
pub async fn connect_from_config(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let max_connections = pool_size(database_url, max_connections);
    debug!(max_connections, timeout_secs, "opening sqlite pool");

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Each connection to a private in-memory database sees its own empty schema,
/// so those pools are held to a single connection.
fn pool_size(database_url: &str, requested: u32) -> u32 {
    let private_memory = database_url.contains(":memory:") && !database_url.contains("cache=shared");
    if private_memory {
        1
    } else {
        requested.max(1)
    }
}

#[cfg(test)]
mod tests {
    use zen_core::config::DatabaseConfig;

    use super::{connect_from_config, pool_size};
    use crate::migrations;

    #[test]
    fn private_memory_databases_use_one_connection() {
        assert_eq!(pool_size("sqlite::memory:", 5), 1);
        assert_eq!(pool_size("sqlite::memory:?cache=shared", 5), 5);
        assert_eq!(pool_size("sqlite://zen.db?mode=rwc", 0), 1);
        assert_eq!(pool_size("sqlite://zen.db?mode=rwc", 8), 8);
    }

    #[tokio::test]
    async fn config_pool_sees_migrated_schema_on_every_checkout() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_owned(),
            max_connections: 5,
            timeout_secs: 5,
        };
        let pool = connect_from_config(&config).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        for _ in 0..3 {
            let (tables,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'ticket'",
            )
            .fetch_one(&pool)
            .await
            .expect("schema query");
            assert_eq!(tables, 1);
        }

        let (foreign_keys,): (i64,) =
            sqlx::query_as("PRAGMA foreign_keys").fetch_one(&pool).await.expect("pragma");
        assert_eq!(foreign_keys, 1);
        pool.close().await;
    }
}
