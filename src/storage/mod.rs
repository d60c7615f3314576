pub mod memory;
pub mod mongo;
pub mod review;

pub use memory::InMemoryReviewStore;
pub use mongo::MongoReviewStore;
pub use review::{NewReview, Review, ValidationError};

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for reviews.
///
/// Handlers only see this trait, so the MongoDB store and the in-memory
/// store are interchangeable at startup and in tests.
#[async_trait]
pub trait ReviewStore: Send + Sync + 'static {
    /// Persists a review, assigning its identifier and creation time.
    /// Invalid payloads are refused with [`StorageError::Validation`].
    async fn insert(&self, review: NewReview) -> StorageResult<Review>;

    /// Reviews of one movie, newest first, skipping `offset` and returning
    /// at most `limit` entries.
    async fn find_by_movie(&self, movie_id: i64, limit: u64, offset: u64)
    -> StorageResult<Vec<Review>>;

    /// Grouped review counts. Ids without reviews are absent from the map.
    async fn count_by_movie(&self, movie_ids: &[i64]) -> StorageResult<HashMap<i64, u64>>;
}
