use crate::api::models::*;
use crate::storage::Review;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use std::collections::BTreeMap;
use tracing::info;

pub async fn create_review_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let Json(request) = payload?;

    // Validate before touching the catalog or the store
    let review = request.validate()?;

    info!(movie_id = review.movie_id, rating = review.rating, "Creating review");

    if !state.catalog.exists(review.movie_id).await {
        return Err(AppError::MovieNotFound(review.movie_id));
    }

    let stored = state.store.insert(review).await?;

    info!(id = %stored.id, movie_id = stored.movie_id, "Review created");

    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn list_reviews_handler(
    State(state): State<AppState>,
    query: Result<Query<ListReviewsQuery>, QueryRejection>,
) -> Result<Json<Vec<Review>>, AppError> {
    let Query(query) = query?;
    let page = query.validate()?;

    info!(
        movie_id = page.movie_id,
        limit = page.limit,
        offset = page.offset,
        "Listing reviews"
    );

    let reviews = state
        .store
        .find_by_movie(page.movie_id, page.limit, page.offset)
        .await?;

    info!(found = reviews.len(), "Reviews listed");

    Ok(Json(reviews))
}

pub async fn review_counts_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReviewCountsRequest>, JsonRejection>,
) -> Result<Json<BTreeMap<String, u64>>, AppError> {
    let Json(request) = payload?;
    let movie_ids = request.validate()?;

    info!(requested = movie_ids.len(), "Counting reviews");

    // Every requested id appears in the answer, even without reviews
    let mut result: BTreeMap<String, u64> =
        movie_ids.iter().map(|id| (id.to_string(), 0)).collect();

    if movie_ids.is_empty() {
        return Ok(Json(result));
    }

    let counts = state.store.count_by_movie(&movie_ids).await?;
    for (movie_id, count) in counts {
        result.insert(movie_id.to_string(), count);
    }

    Ok(Json(result))
}
