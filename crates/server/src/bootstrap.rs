use std::sync::Arc;

use secrecy::ExposeSecret;
use serenity::all::Http;
use thiserror::Error;
use tracing::info;
use zen_core::config::{AppConfig, ConfigError};
use zen_core::emojis::EmojiRegistry;
use zen_core::transcript::TranscriptError;
use zen_db::repositories::RepositoryError;
use zen_db::{connect_from_config, migrations, DbPool, Stores};
use zen_discord::{Bot, BotContext};

use crate::discord::SerenityApi;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub bot: Arc<Bot>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("emoji registry could not be loaded: {0}")]
    EmojiRegistry(#[source] RepositoryError),
    #[error("transcript templates failed to load: {0}")]
    Transcript(#[from] TranscriptError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let stores = Stores::sql(db_pool.clone());
    let emojis =
        EmojiRegistry::new(stores.emojis.load_all().await.map_err(BootstrapError::EmojiRegistry)?);
    info!(
        event_name = "system.bootstrap.emojis_loaded",
        correlation_id = "bootstrap",
        count = emojis.len(),
        "emoji registry loaded"
    );

    let http = Arc::new(Http::new(config.discord.token.expose_secret()));
    let context = BotContext::new(
        Arc::new(SerenityApi::new(http)),
        stores,
        emojis,
        config.tickets.clone(),
    );
    let bot = Arc::new(Bot::new(context)?);

    Ok(Application { config, db_pool, bot })
}
