//! Read-only JSON view over the stored history.

use crate::models::StoredObservation;
use crate::store::SqliteStore;
use axum::{
    extract::State,
    http::{header::ACCEPT, header::CONTENT_TYPE, Method, StatusCode},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const WEATHER_DATA_PATH: &str = "/api/weather_data";

#[derive(Clone)]
pub struct ApiState {
    store: Arc<SqliteStore>,
}

impl ApiState {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .route(WEATHER_DATA_PATH, get(weather_data))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Every stored row, oldest first.
pub async fn weather_data(
    State(state): State<ApiState>,
) -> Result<Json<Vec<StoredObservation>>, (StatusCode, String)> {
    let store = Arc::clone(&state.store);
    let rows = tokio::task::spawn_blocking(move || store.all_rows())
        .await
        .map_err(|e| {
            tracing::error!(message = "read task did not complete", error = %e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        })?
        .map_err(|e| {
            tracing::error!(message = "failed to read weather data", error = %e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read weather data: {}", e),
            )
        })?;

    Ok(Json(rows))
}

/// Serve the API until `shutdown` completes.
pub async fn serve(
    bind: SocketAddr,
    state: ApiState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!(message = "server started", address = %listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}
