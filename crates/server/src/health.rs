use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};
use zen_db::DbPool;

use crate::status::BotStatus;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    status: Arc<BotStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub gateway: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, status: Arc<BotStatus>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, status })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    db_pool: DbPool,
    status: Arc<BotStatus>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool, status)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

/// Readiness follows the database; the gateway check is informational while
/// serenity reconnects on its own.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck { status: "ready", detail: "zen-server runtime initialized".to_string() },
        database,
        gateway: gateway_check(&state.status),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

fn gateway_check(status: &BotStatus) -> HealthCheck {
    if status.is_connected() {
        HealthCheck {
            status: "ready",
            detail: format!("connected to {} guild(s)", status.guilds()),
        }
    } else {
        HealthCheck { status: "connecting", detail: "gateway session not established".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use tower::ServiceExt;
    use zen_db::connect_with_settings;

    use crate::health::{health, router, HealthState};
    use crate::status::BotStatus;

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        let status = Arc::new(BotStatus::new());
        status.mark_ready("Zen", 1);

        let (code, Json(payload)) =
            health(State(HealthState { db_pool: pool.clone(), status })).await;

        assert_eq!(code, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.gateway.status, "ready");
        assert_eq!(payload.service.status, "ready");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        pool.close().await;

        let (code, Json(payload)) =
            health(State(HealthState { db_pool: pool, status: Arc::new(BotStatus::new()) })).await;

        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.gateway.status, "connecting");
    }

    #[tokio::test]
    async fn router_serves_health_route() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");

        let response = router(pool.clone(), Arc::new(BotStatus::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        pool.close().await;
    }
}
