use crate::api::models::AppState;
use crate::api::review::handlers::{create_review_handler, list_reviews_handler, review_counts_handler};
use axum::{
    routing::{get, post},
    Router,
};

/// Base path the review routes are mounted under
pub const BASE_PATH: &str = "/api/reviews";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(BASE_PATH, post(create_review_handler).get(list_reviews_handler))
        .route(&format!("{}/_counts", BASE_PATH), post(review_counts_handler))
}
