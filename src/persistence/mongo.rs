//! MongoDB-backed [`DocumentStore`].
//!
//! Collections: `comments`, `reviews` and `media`. Event and user ids are
//! stored as UUID strings; a unique `(eventId, userId)` index on `reviews`
//! enforces one review per user per event.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use super::DocumentStore;
use super::models::{CommentDoc, MediaDoc, ReviewDoc, object_id};
use crate::domain::{Comment, EventId, Media, Review};
use crate::error::ApiError;

const DUPLICATE_KEY: i32 = 11000;

/// Document store over one MongoDB database.
#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    comments: Collection<CommentDoc>,
    reviews: Collection<ReviewDoc>,
    media: Collection<MediaDoc>,
}

fn doc_err(e: mongodb::error::Error) -> ApiError {
    ApiError::DocumentStore(e.to_string())
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

fn newest_first() -> Document {
    doc! { "createdAt": -1 }
}

impl MongoDocumentStore {
    /// Connects, pings the server and ensures the review index exists.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::DocumentStore`] if the server cannot be reached.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ApiError> {
        let client = Client::with_uri_str(uri).await.map_err(doc_err)?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await.map_err(doc_err)?;

        let store = Self::new(&db);
        store.ensure_indexes().await?;
        tracing::info!(database, "mongodb ready");
        Ok(store)
    }

    /// Binds the collections of `db` without touching the server.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            comments: db.collection("comments"),
            reviews: db.collection("reviews"),
            media: db.collection("media"),
        }
    }

    async fn ensure_indexes(&self) -> Result<(), ApiError> {
        let one_per_user = IndexModel::builder()
            .keys(doc! { "eventId": 1, "userId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.reviews
            .create_index(one_per_user)
            .await
            .map_err(doc_err)?;

        for coll in [
            self.comments.clone_with_type::<Document>(),
            self.media.clone_with_type::<Document>(),
        ] {
            let by_event = IndexModel::builder()
                .keys(doc! { "eventId": 1, "createdAt": -1 })
                .build();
            coll.create_index(by_event).await.map_err(doc_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn insert_comment(&self, comment: &Comment) -> Result<(), ApiError> {
        let doc = CommentDoc::from_domain(comment)?;
        self.comments.insert_one(doc).await.map_err(doc_err)?;
        Ok(())
    }

    async fn comments_for_event(&self, event_id: EventId) -> Result<Vec<Comment>, ApiError> {
        let docs: Vec<CommentDoc> = self
            .comments
            .find(doc! { "eventId": event_id.to_string() })
            .sort(newest_first())
            .await
            .map_err(doc_err)?
            .try_collect()
            .await
            .map_err(doc_err)?;
        docs.into_iter().map(Comment::try_from).collect()
    }

    async fn insert_review(&self, review: &Review) -> Result<(), ApiError> {
        let doc = ReviewDoc::from_domain(review)?;
        match self.reviews.insert_one(doc).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(ApiError::Conflict(
                "You have already reviewed this event".to_string(),
            )),
            Err(e) => Err(doc_err(e)),
        }
    }

    async fn find_review(&self, id: &str) -> Result<Option<Review>, ApiError> {
        let Some(oid) = object_id(id) else {
            return Ok(None);
        };
        self.reviews
            .find_one(doc! { "_id": oid })
            .await
            .map_err(doc_err)?
            .map(Review::try_from)
            .transpose()
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, ApiError> {
        let docs: Vec<ReviewDoc> = self
            .reviews
            .find(doc! {})
            .sort(newest_first())
            .await
            .map_err(doc_err)?
            .try_collect()
            .await
            .map_err(doc_err)?;
        docs.into_iter().map(Review::try_from).collect()
    }

    async fn reviews_for_event(&self, event_id: EventId) -> Result<Vec<Review>, ApiError> {
        let docs: Vec<ReviewDoc> = self
            .reviews
            .find(doc! { "eventId": event_id.to_string() })
            .sort(newest_first())
            .await
            .map_err(doc_err)?
            .try_collect()
            .await
            .map_err(doc_err)?;
        docs.into_iter().map(Review::try_from).collect()
    }

    async fn update_review(&self, review: &Review) -> Result<bool, ApiError> {
        let doc = ReviewDoc::from_domain(review)?;
        let result = self
            .reviews
            .replace_one(doc! { "_id": doc.id }, &doc)
            .await
            .map_err(doc_err)?;
        Ok(result.matched_count > 0)
    }

    async fn delete_review(&self, id: &str) -> Result<bool, ApiError> {
        let Some(oid) = object_id(id) else {
            return Ok(false);
        };
        let result = self
            .reviews
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(doc_err)?;
        Ok(result.deleted_count > 0)
    }

    async fn insert_media(&self, media: &Media) -> Result<(), ApiError> {
        let doc = MediaDoc::from_domain(media)?;
        self.media.insert_one(doc).await.map_err(doc_err)?;
        Ok(())
    }

    async fn media_for_event(&self, event_id: EventId) -> Result<Vec<Media>, ApiError> {
        let docs: Vec<MediaDoc> = self
            .media
            .find(doc! { "eventId": event_id.to_string() })
            .sort(newest_first())
            .await
            .map_err(doc_err)?
            .try_collect()
            .await
            .map_err(doc_err)?;
        docs.into_iter().map(Media::try_from).collect()
    }

    async fn delete_event_documents(&self, event_id: EventId) -> Result<u64, ApiError> {
        let filter = doc! { "eventId": event_id.to_string() };
        let comments = self
            .comments
            .delete_many(filter.clone())
            .await
            .map_err(doc_err)?;
        let reviews = self
            .reviews
            .delete_many(filter.clone())
            .await
            .map_err(doc_err)?;
        let media = self.media.delete_many(filter).await.map_err(doc_err)?;
        Ok(comments.deleted_count + reviews.deleted_count + media.deleted_count)
    }
}
