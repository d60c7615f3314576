use crate::storage::{NewReview, Review, ReviewStore, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Review store kept in process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryReviewStore {
    reviews: RwLock<Vec<Review>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.reviews.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reviews.read().await.is_empty()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: NewReview) -> StorageResult<Review> {
        review.validate()?;

        let review = review.into_review(ObjectId::new().to_hex(), Utc::now());
        self.reviews.write().await.push(review.clone());

        debug!(id = %review.id, movie_id = review.movie_id, "Stored review in memory");
        Ok(review)
    }

    async fn find_by_movie(
        &self,
        movie_id: i64,
        limit: u64,
        offset: u64,
    ) -> StorageResult<Vec<Review>> {
        let reviews = self.reviews.read().await;

        // Reverse insertion order first so the stable sort keeps later inserts ahead on ties
        let mut matching: Vec<&Review> = reviews
            .iter()
            .rev()
            .filter(|r| r.movie_id == movie_id)
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count_by_movie(&self, movie_ids: &[i64]) -> StorageResult<HashMap<i64, u64>> {
        let reviews = self.reviews.read().await;

        let mut counts = HashMap::new();
        for review in reviews.iter().filter(|r| movie_ids.contains(&r.movie_id)) {
            *counts.entry(review.movie_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageError, ValidationError};

    fn new_review(movie_id: i64, author: &str) -> NewReview {
        NewReview {
            movie_id,
            author: author.to_string(),
            text: "Text".to_string(),
            rating: 5,
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let store = InMemoryReviewStore::new();
        let before = Utc::now();

        let stored = store.insert(new_review(1, "User1")).await.unwrap();

        assert_eq!(stored.id.len(), 24);
        assert!(stored.created_at >= before);
        assert_eq!(stored.author, "User1");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn insert_refuses_invalid_rating() {
        let store = InMemoryReviewStore::new();
        let mut review = new_review(1, "User1");
        review.rating = 42;

        let err = store.insert(review).await.unwrap_err();

        assert!(matches!(
            err,
            StorageError::Validation(ValidationError::RatingOutOfRange)
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn find_returns_newest_first_for_one_movie() {
        let store = InMemoryReviewStore::new();
        for author in ["a", "b", "c"] {
            store.insert(new_review(1, author)).await.unwrap();
        }
        store.insert(new_review(2, "other")).await.unwrap();

        let found = store.find_by_movie(1, 10, 0).await.unwrap();

        let authors: Vec<&str> = found.iter().map(|r| r.author.as_str()).collect();
        assert_eq!(authors, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn find_applies_offset_then_limit() {
        let store = InMemoryReviewStore::new();
        for author in ["a", "b", "c", "d"] {
            store.insert(new_review(1, author)).await.unwrap();
        }

        let page = store.find_by_movie(1, 2, 1).await.unwrap();

        let authors: Vec<&str> = page.iter().map(|r| r.author.as_str()).collect();
        assert_eq!(authors, vec!["c", "b"]);
        assert!(store.find_by_movie(1, 10, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_only_reports_movies_with_reviews() {
        let store = InMemoryReviewStore::new();
        for movie_id in [10, 10, 10, 20, 30] {
            store.insert(new_review(movie_id, "u")).await.unwrap();
        }

        let counts = store.count_by_movie(&[10, 20, 999]).await.unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&10], 3);
        assert_eq!(counts[&20], 1);
        assert!(!counts.contains_key(&999));
    }
}
