use crate::storage::{NewReview, Review, ReviewStore, StorageError, StorageResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson, Document},
    Client, Collection, IndexModel,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Review as laid out in the MongoDB collection
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReviewDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(rename = "movieId", deserialize_with = "lenient_i64")]
    movie_id: i64,
    author: String,
    text: String,
    #[serde(deserialize_with = "lenient_i32")]
    rating: i32,
    #[serde(rename = "createdAt")]
    created_at: bson::DateTime,
}

impl ReviewDocument {
    fn into_review(self) -> StorageResult<Review> {
        let rating = u8::try_from(self.rating).map_err(|_| {
            StorageError::Backend(format!("review {} has invalid rating {}", self.id, self.rating))
        })?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at.timestamp_millis())
            .ok_or_else(|| {
                StorageError::Backend(format!("review {} has invalid createdAt", self.id))
            })?;

        Ok(Review {
            id: self.id.to_hex(),
            movie_id: self.movie_id,
            author: self.author,
            text: self.text,
            rating,
            created_at,
        })
    }
}

/// MongoDB-backed review store
#[derive(Debug, Clone)]
pub struct MongoReviewStore {
    collection: Collection<ReviewDocument>,
}

impl MongoReviewStore {
    /// Connect, ping the server and make sure `movieId` is indexed
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Failed to parse MongoDB connection string")?;

        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("MongoDB at {} is not reachable", uri))?;

        let collection = db.collection::<ReviewDocument>(collection);
        collection
            .create_index(IndexModel::builder().keys(doc! { "movieId": 1 }).build())
            .await
            .context("Failed to create movieId index")?;

        info!(database, collection = %collection.name(), "MongoDB review store ready");

        Ok(Self { collection })
    }
}

#[async_trait]
impl ReviewStore for MongoReviewStore {
    async fn insert(&self, review: NewReview) -> StorageResult<Review> {
        review.validate()?;

        let document = ReviewDocument {
            id: ObjectId::new(),
            movie_id: review.movie_id,
            author: review.author,
            text: review.text,
            rating: i32::from(review.rating),
            created_at: bson::DateTime::now(),
        };

        self.collection.insert_one(&document).await?;
        debug!(id = %document.id, movie_id = document.movie_id, "Inserted review");

        document.into_review()
    }

    async fn find_by_movie(
        &self,
        movie_id: i64,
        limit: u64,
        offset: u64,
    ) -> StorageResult<Vec<Review>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let documents: Vec<ReviewDocument> = self
            .collection
            .find(doc! { "movieId": movie_id })
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .skip(offset)
            .limit(limit)
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(ReviewDocument::into_review).collect()
    }

    async fn count_by_movie(&self, movie_ids: &[i64]) -> StorageResult<HashMap<i64, u64>> {
        let rows: Vec<Document> = self
            .collection
            .aggregate(count_pipeline(movie_ids))
            .await?
            .try_collect()
            .await?;

        rows.iter().map(parse_count_row).collect()
    }
}

fn count_pipeline(movie_ids: &[i64]) -> Vec<Document> {
    vec![
        doc! { "$match": { "movieId": { "$in": movie_ids.to_vec() } } },
        doc! { "$group": { "_id": "$movieId", "count": { "$sum": 1 } } },
    ]
}

fn parse_count_row(row: &Document) -> StorageResult<(i64, u64)> {
    let movie_id = row.get("_id").and_then(bson_integer).ok_or_else(|| {
        StorageError::Backend(format!("count row has a non-integer _id: {}", row))
    })?;
    let count = row
        .get("count")
        .and_then(bson_integer)
        .and_then(|c| u64::try_from(c).ok())
        .ok_or_else(|| StorageError::Backend(format!("count row has an invalid count: {}", row)))?;

    Ok((movie_id, count))
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Bson::deserialize(deserializer)?;
    bson_integer(&value)
        .ok_or_else(|| de::Error::custom(format!("expected an integer, found {}", value)))
}

fn lenient_i32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = lenient_i64(deserializer)?;
    i32::try_from(value).map_err(|_| de::Error::custom(format!("integer {} out of range", value)))
}

// Numbers written by other clients may arrive as Int32 or integral doubles
fn bson_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}
