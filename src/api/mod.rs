pub mod models;
pub mod review;

// Re-exports
pub use models::*;

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Movie Reviews API is running!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the full application router
pub fn router(state: AppState, enable_cors: bool) -> Router {
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .merge(review::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
