use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use catalogapi_catalog::CatalogStore;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod handlers;

pub use error::*;
pub use handlers::*;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::welcome))
        .route(
            "/catalogs",
            get(handlers::list_catalogs)
                .post(handlers::create_catalog)
                .patch(handlers::update_catalog),
        )
        .route(
            "/catalogs/:id",
            get(handlers::get_catalog).delete(handlers::delete_catalog),
        )
        // Health check
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, database) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "up"),
        Err(err) => {
            tracing::warn!("Health check failed: {}", err);
            (StatusCode::SERVICE_UNAVAILABLE, "down")
        }
    };

    let body = Json(json!({
        "status": if status == StatusCode::OK { "healthy" } else { "unhealthy" },
        "service": "catalog-api",
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
    }));

    (status, body)
}
