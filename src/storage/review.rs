use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

/// A persisted movie review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: String,
    pub movie_id: i64,
    pub author: String,
    pub text: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. Stores assign the identifier and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub movie_id: i64,
    pub author: String,
    pub text: String,
    pub rating: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,

    #[error("rating must be between 1 and 10")]
    RatingOutOfRange,
}

impl NewReview {
    /// Checks the schema rules every persisted review must satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.movie_id == 0 || self.author.trim().is_empty() || self.text.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange);
        }
        Ok(())
    }

    pub fn into_review(self, id: String, created_at: DateTime<Utc>) -> Review {
        Review {
            id,
            movie_id: self.movie_id,
            author: self.author,
            text: self.text,
            rating: self.rating,
            created_at,
        }
    }
}
