use crate::catalog::MovieCatalog;
use crate::storage::{NewReview, ReviewStore, StorageError, ValidationError, DEFAULT_PAGE_SIZE};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReviewStore>,
    pub catalog: Arc<dyn MovieCatalog>,
}

/// Body of `POST /api/reviews`. Every field is optional at the wire level
/// so that absence is reported by [`CreateReviewRequest::validate`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub movie_id: Option<i64>,
    pub author: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i64>,
}

/// Query string of `GET /api/reviews`, kept as raw text until validated
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub movie_id: Option<String>,
    pub size: Option<String>,
    pub from: Option<String>,
}

/// Validated list query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewPage {
    pub movie_id: i64,
    pub limit: u64,
    pub offset: u64,
}

/// Body of `POST /api/reviews/_counts`, any JSON value until validated
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct ReviewCountsRequest(pub serde_json::Value);

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateReviewRequest {
    /// Validate the request
    pub fn validate(self) -> Result<NewReview, AppError> {
        let movie_id = self.movie_id.filter(|id| *id != 0);
        let author = self.author.filter(|a| !a.trim().is_empty());
        let text = self.text.filter(|t| !t.trim().is_empty());
        let rating = self.rating.filter(|r| *r != 0);

        let (Some(movie_id), Some(author), Some(text), Some(rating)) = (movie_id, author, text, rating)
        else {
            return Err(ValidationError::MissingFields.into());
        };

        let rating = u8::try_from(rating).map_err(|_| ValidationError::RatingOutOfRange)?;
        let review = NewReview {
            movie_id,
            author,
            text,
            rating,
        };
        review.validate()?;
        Ok(review)
    }
}

impl ListReviewsQuery {
    /// Validate the query, applying the default page size and offset
    pub fn validate(&self) -> Result<ReviewPage, AppError> {
        let movie_id = present(&self.movie_id)
            .ok_or_else(|| AppError::Validation("movieId is required".to_string()))?
            .parse::<i64>()
            .map_err(|_| AppError::Validation("movieId must be an integer".to_string()))?;

        let limit = match present(&self.size) {
            None => DEFAULT_PAGE_SIZE,
            Some(size) => size
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| AppError::Validation("size must be a positive integer".to_string()))?,
        };

        let offset = match present(&self.from) {
            None => 0,
            Some(from) => from.parse::<u64>().map_err(|_| {
                AppError::Validation("from must be a non-negative integer".to_string())
            })?,
        };

        Ok(ReviewPage {
            movie_id,
            limit,
            offset,
        })
    }
}

impl ReviewCountsRequest {
    /// Validate the request, returning the requested ids in order
    pub fn validate(&self) -> Result<Vec<i64>, AppError> {
        let Some(serde_json::Value::Array(items)) = self.0.get("movieIds") else {
            return Err(AppError::Validation("movieIds must be an array".to_string()));
        };

        items
            .iter()
            .map(|item| {
                json_integer(item).ok_or_else(|| {
                    AppError::Validation("movieIds must contain only integers".to_string())
                })
            })
            .collect()
    }
}

// JavaScript clients send whole numbers such as `10.0` as floats
fn json_integer(value: &serde_json::Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Movie with ID {0} not found")]
    MovieNotFound(i64),

    #[error("{0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(e) => e.into(),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            AppError::Validation(_) | AppError::MovieNotFound(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    message,
                    error: None,
                },
            ),
            AppError::Internal(detail) => {
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: "Server Error".to_string(),
                        error: Some(detail),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: serde_json::Value) -> Result<NewReview, AppError> {
        serde_json::from_value::<CreateReviewRequest>(body)
            .unwrap()
            .validate()
    }

    fn list(movie_id: Option<&str>, size: Option<&str>, from: Option<&str>) -> Result<ReviewPage, AppError> {
        ListReviewsQuery {
            movie_id: movie_id.map(String::from),
            size: size.map(String::from),
            from: from.map(String::from),
        }
        .validate()
    }

    fn message(err: AppError) -> String {
        err.to_string()
    }

    #[test]
    fn create_accepts_complete_body() {
        let review = create(json!({
            "movieId": 101, "author": "Test Critic", "text": "Awesome movie", "rating": 9
        }))
        .unwrap();

        assert_eq!(review.movie_id, 101);
        assert_eq!(review.author, "Test Critic");
        assert_eq!(review.text, "Awesome movie");
        assert_eq!(review.rating, 9);
    }

    #[test]
    fn create_reports_missing_or_falsy_fields() {
        for body in [
            json!({ "movieId": 1 }),
            json!({ "movieId": 0, "author": "a", "text": "t", "rating": 5 }),
            json!({ "movieId": 1, "author": "", "text": "t", "rating": 5 }),
            json!({ "movieId": 1, "author": "a", "text": "  ", "rating": 5 }),
            json!({ "movieId": 1, "author": "a", "text": "t", "rating": 0 }),
        ] {
            assert_eq!(message(create(body).unwrap_err()), "All fields are required");
        }
    }

    #[test]
    fn create_rejects_rating_out_of_range() {
        for rating in [11, -3, 300] {
            let err = create(json!({ "movieId": 1, "author": "a", "text": "t", "rating": rating }))
                .unwrap_err();
            assert_eq!(message(err), "rating must be between 1 and 10");
        }
    }

    #[test]
    fn list_applies_defaults() {
        assert_eq!(
            list(Some("1"), None, None).unwrap(),
            ReviewPage { movie_id: 1, limit: 10, offset: 0 }
        );
        assert_eq!(
            list(Some("7"), Some("5"), Some("20")).unwrap(),
            ReviewPage { movie_id: 7, limit: 5, offset: 20 }
        );
    }

    #[test]
    fn list_requires_movie_id() {
        assert_eq!(message(list(None, None, None).unwrap_err()), "movieId is required");
        assert_eq!(message(list(Some(""), None, None).unwrap_err()), "movieId is required");
    }

    #[test]
    fn list_rejects_malformed_numbers() {
        assert_eq!(
            message(list(Some("abc"), None, None).unwrap_err()),
            "movieId must be an integer"
        );
        assert_eq!(
            message(list(Some("1"), Some("ten"), None).unwrap_err()),
            "size must be a positive integer"
        );
        assert_eq!(
            message(list(Some("1"), Some("0"), None).unwrap_err()),
            "size must be a positive integer"
        );
        assert_eq!(
            message(list(Some("1"), None, Some("-1")).unwrap_err()),
            "from must be a non-negative integer"
        );
    }

    #[test]
    fn counts_require_an_integer_array() {
        let ok: ReviewCountsRequest = serde_json::from_value(json!({ "movieIds": [10, 20] })).unwrap();
        assert_eq!(ok.validate().unwrap(), vec![10, 20]);

        let not_array: ReviewCountsRequest =
            serde_json::from_value(json!({ "movieIds": "not-an-array" })).unwrap();
        assert_eq!(message(not_array.validate().unwrap_err()), "movieIds must be an array");

        let missing: ReviewCountsRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(message(missing.validate().unwrap_err()), "movieIds must be an array");

        let mixed: ReviewCountsRequest =
            serde_json::from_value(json!({ "movieIds": [1, "two"] })).unwrap();
        assert_eq!(
            message(mixed.validate().unwrap_err()),
            "movieIds must contain only integers"
        );
    }

    #[test]
    fn counts_reject_bare_array_body() {
        let bare: ReviewCountsRequest = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(message(bare.validate().unwrap_err()), "movieIds must be an array");
    }

    #[test]
    fn counts_accept_whole_floats() {
        let floats: ReviewCountsRequest =
            serde_json::from_value(json!({ "movieIds": [10.0, 20] })).unwrap();
        assert_eq!(floats.validate().unwrap(), vec![10, 20]);

        let fractional: ReviewCountsRequest =
            serde_json::from_value(json!({ "movieIds": [10.5] })).unwrap();
        assert_eq!(
            message(fractional.validate().unwrap_err()),
            "movieIds must contain only integers"
        );
    }

    #[test]
    fn storage_validation_maps_to_client_error() {
        let err: AppError = StorageError::Validation(ValidationError::MissingFields).into();
        assert!(matches!(err, AppError::Validation(_)));

        let err: AppError = StorageError::Backend("down".to_string()).into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
