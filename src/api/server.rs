//! Server setup: router construction, CORS, bind and serve

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::state::AppState;
use super::{entries, habits, insights};
use crate::config::Config;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Liveness probe for the frontend
        .route("/", get(root))
        // Habit collection
        .route(
            "/habits",
            get(habits::get_habits).post(habits::create_habit),
        )
        .route(
            "/habits/:id",
            axum::routing::put(habits::update_habit).delete(habits::delete_habit),
        )
        // Entry collection
        .route(
            "/entries",
            get(entries::get_entries).post(entries::create_entry),
        )
        .route(
            "/entries/month/:year/:month",
            get(entries::get_entries_by_month),
        )
        .route(
            "/entries/:date",
            get(entries::get_entry)
                .put(entries::replace_entry)
                .patch(entries::patch_entry_habits)
                .delete(entries::delete_entry),
        )
        // Derived statistics
        .route("/stats/insights", get(insights::get_insights))
        .route(
            "/stats/monthly/:year/:month",
            get(insights::get_monthly_report),
        )
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "API is running" }))
}

/// CORS layer restricted to the configured frontend origins
fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-api-key")])
}

/// Bind and serve until ctrl-c
pub async fn serve(state: AppState) -> Result<()> {
    let bind_addr = state.config.bind_addr;
    let app = router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Habit API listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
