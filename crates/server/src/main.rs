mod bootstrap;
mod console;
mod discord;
mod gateway;
mod health;
mod render;
mod status;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use secrecy::ExposeSecret;
use serenity::Client;
use tokio::sync::watch;
use zen_core::config::{AppConfig, LoadOptions};
use zen_discord::gateway::{GatewayRunner, ReconnectPolicy};

use crate::status::BotStatus;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use zen_core::config::LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let status = Arc::new(BotStatus::new());

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
        Arc::clone(&status),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (handler, transport) =
        gateway::channel_transport(app.config.discord.guild_id, Arc::clone(&status), shutdown_rx.clone());

    let mut client = Client::builder(app.config.discord.token.expose_secret(), gateway::intents())
        .event_handler(handler)
        .await?;
    let shard_manager = Arc::clone(&client.shard_manager);
    let client_task = tokio::spawn(async move {
        if let Err(error) = client.start().await {
            tracing::error!(
                event_name = "system.discord.client_failed",
                correlation_id = "bootstrap",
                error = %error,
                "discord client stopped with an error"
            );
        }
    });

    let runner = GatewayRunner::new(Arc::new(transport), app.bot.dispatcher(), ReconnectPolicy::default());
    let runner_task = tokio::spawn(async move { runner.start().await });

    let sweeper = {
        let bot = Arc::clone(&app.bot);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let purged = bot.purge_expired_sessions().await;
                if purged > 0 {
                    tracing::debug!(
                        event_name = "system.sessions.purged",
                        purged,
                        "expired interaction sessions dropped"
                    );
                }
            }
        })
    };

    if app.config.console.enabled {
        let console = console::Console::new(app.bot.context.clone(), Arc::clone(&status), shutdown_tx.clone());
        tokio::spawn(console.run());
    }

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "zen-server started"
    );
    wait_for_shutdown(shutdown_rx).await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "zen-server stopping"
    );

    let _ = shutdown_tx.send(true);
    shard_manager.shutdown_all().await;
    sweeper.abort();

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, runner_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(error))) => tracing::warn!(error = %error, "gateway runner ended with an error"),
        Ok(Err(error)) => tracing::warn!(error = %error, "gateway runner task panicked"),
        Err(_) => tracing::warn!(
            grace_secs = grace.as_secs(),
            "in-flight handlers did not finish before the shutdown deadline"
        ),
    }
    if tokio::time::timeout(grace, client_task).await.is_err() {
        tracing::warn!("discord client did not stop before the shutdown deadline");
    }

    app.db_pool.close().await;
    tracing::info!(event_name = "system.server.stopped", correlation_id = "shutdown", "zen-server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or when the console asks to stop.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) -> Result<()> {
    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        _ = shutdown.wait_for(|stop| *stop) => {}
    }
    Ok(())
}
