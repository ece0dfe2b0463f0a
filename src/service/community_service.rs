//! Community service: comments, reviews and media uploads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use crate::domain::community::{RATING_RANGE, new_document_id};
use crate::domain::{Comment, EventId, Media, MediaKind, Review, UserId};
use crate::error::ApiError;
use crate::persistence::{DocumentStore, EventStore, UserStore};

/// A review as submitted.
#[derive(Debug, Clone)]
pub struct NewReview {
    /// Display name; the account name when absent.
    pub user_name: Option<String>,
    /// 1 to 5.
    pub rating: u8,
    /// Optional headline.
    pub title: Option<String>,
    /// Body.
    pub text: String,
}

/// Partial review edit.
#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    /// New rating.
    pub rating: Option<u8>,
    /// New headline.
    pub title: Option<String>,
    /// New body.
    pub text: Option<String>,
}

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-side file name.
    pub file_name: String,
    /// Declared content type.
    pub content_type: Option<String>,
    /// File contents.
    pub data: Vec<u8>,
    /// Optional caption.
    pub caption: Option<String>,
}

/// Orchestration of document-store content attached to events.
#[derive(Debug, Clone)]
pub struct CommunityService {
    events: Arc<dyn EventStore>,
    users: Arc<dyn UserStore>,
    documents: Arc<dyn DocumentStore>,
    upload_dir: PathBuf,
}

impl CommunityService {
    /// Creates a new `CommunityService` storing uploads under `upload_dir`.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        users: Arc<dyn UserStore>,
        documents: Arc<dyn DocumentStore>,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            events,
            users,
            documents,
            upload_dir,
        }
    }

    /// Comments on an event, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] for an unknown event.
    pub async fn list_comments(&self, event_id: EventId) -> Result<Vec<Comment>, ApiError> {
        self.ensure_event(event_id).await?;
        self.documents.comments_for_event(event_id).await
    }

    /// Adds a comment.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] for empty text,
    /// [`ApiError::EventNotFound`] for an unknown event.
    pub async fn add_comment(
        &self,
        user_id: UserId,
        event_id: EventId,
        user_name: Option<String>,
        text: String,
    ) -> Result<Comment, ApiError> {
        let text = required_text(text)?;
        self.ensure_event(event_id).await?;

        let comment = Comment {
            id: new_document_id(),
            event_id,
            user_id,
            user_name: self.display_name(user_id, user_name).await?,
            text,
            created_at: Utc::now(),
        };
        self.documents.insert_comment(&comment).await?;
        tracing::debug!(comment_id = %comment.id, %event_id, "comment added");
        Ok(comment)
    }

    /// Reviews of an event, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] for an unknown event.
    pub async fn list_event_reviews(&self, event_id: EventId) -> Result<Vec<Review>, ApiError> {
        self.ensure_event(event_id).await?;
        self.documents.reviews_for_event(event_id).await
    }

    /// Adds the caller's review of an event.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] for a bad rating or empty text,
    /// [`ApiError::EventNotFound`], [`ApiError::Conflict`] for a second
    /// review by the same user.
    pub async fn add_review(
        &self,
        user_id: UserId,
        event_id: EventId,
        review: NewReview,
    ) -> Result<Review, ApiError> {
        validate_rating(review.rating)?;
        let text = required_text(review.text)?;
        self.ensure_event(event_id).await?;

        let review = Review {
            id: new_document_id(),
            event_id,
            user_id,
            user_name: self.display_name(user_id, review.user_name).await?,
            rating: review.rating,
            title: review.title,
            text,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.documents.insert_review(&review).await?;
        tracing::info!(review_id = %review.id, %event_id, rating = review.rating, "review added");
        Ok(review)
    }

    /// Every review, newest first.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_reviews(&self) -> Result<Vec<Review>, ApiError> {
        self.documents.list_reviews().await
    }

    /// One review by id.
    ///
    /// # Errors
    ///
    /// [`ApiError::ReviewNotFound`].
    pub async fn get_review(&self, id: &str) -> Result<Review, ApiError> {
        self.documents
            .find_review(id)
            .await?
            .ok_or_else(|| ApiError::ReviewNotFound(id.to_string()))
    }

    /// Edits one of the caller's reviews.
    ///
    /// # Errors
    ///
    /// [`ApiError::ReviewNotFound`] if it does not exist or belongs to
    /// someone else, [`ApiError::InvalidRequest`] for a bad rating.
    pub async fn update_review(
        &self,
        user_id: UserId,
        id: &str,
        changes: ReviewChanges,
    ) -> Result<Review, ApiError> {
        let mut review = self.authored_review(user_id, id).await?;
        if let Some(rating) = changes.rating {
            validate_rating(rating)?;
            review.rating = rating;
        }
        if let Some(title) = changes.title {
            review.title = Some(title);
        }
        if let Some(text) = changes.text {
            review.text = required_text(text)?;
        }
        review.updated_at = Some(Utc::now());

        if !self.documents.update_review(&review).await? {
            return Err(ApiError::ReviewNotFound(id.to_string()));
        }
        Ok(review)
    }

    /// Deletes one of the caller's reviews.
    ///
    /// # Errors
    ///
    /// [`ApiError::ReviewNotFound`] if it does not exist or belongs to
    /// someone else.
    pub async fn delete_review(&self, user_id: UserId, id: &str) -> Result<(), ApiError> {
        self.authored_review(user_id, id).await?;
        if !self.documents.delete_review(id).await? {
            return Err(ApiError::ReviewNotFound(id.to_string()));
        }
        tracing::info!(review_id = id, "review deleted");
        Ok(())
    }

    /// Media of an event, newest first.
    ///
    /// # Errors
    ///
    /// [`ApiError::EventNotFound`] for an unknown event.
    pub async fn list_media(&self, event_id: EventId) -> Result<Vec<Media>, ApiError> {
        self.ensure_event(event_id).await?;
        self.documents.media_for_event(event_id).await
    }

    /// Saves an uploaded file under `{upload_dir}/events/` and records it.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] for an empty file,
    /// [`ApiError::EventNotFound`], [`ApiError::Internal`] if the file
    /// cannot be written.
    pub async fn upload_media(
        &self,
        user_id: UserId,
        event_id: EventId,
        upload: Upload,
    ) -> Result<Media, ApiError> {
        if upload.data.is_empty() {
            return Err(ApiError::InvalidRequest("No file uploaded".to_string()));
        }
        self.ensure_event(event_id).await?;

        let now = Utc::now();
        let file_name = format!(
            "{}-{}",
            now.timestamp_millis(),
            sanitize_file_name(&upload.file_name)
        );
        let dir = self.upload_dir.join("events");
        write_upload(&dir, &file_name, &upload.data).await?;

        let media = Media {
            id: new_document_id(),
            event_id,
            kind: MediaKind::from_content_type(upload.content_type.as_deref()),
            url: format!("/uploads/events/{file_name}"),
            caption: upload.caption.unwrap_or_default(),
            uploaded_by: user_id,
            created_at: now,
        };
        self.documents.insert_media(&media).await?;
        tracing::info!(
            media_id = %media.id,
            %event_id,
            bytes = upload.data.len(),
            url = %media.url,
            "media uploaded"
        );
        Ok(media)
    }

    async fn ensure_event(&self, event_id: EventId) -> Result<(), ApiError> {
        if self.events.find_event(event_id).await?.is_none() {
            return Err(ApiError::EventNotFound(*event_id.as_uuid()));
        }
        Ok(())
    }

    async fn authored_review(&self, user_id: UserId, id: &str) -> Result<Review, ApiError> {
        self.documents
            .find_review(id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| ApiError::ReviewNotFound(id.to_string()))
    }

    async fn display_name(
        &self,
        user_id: UserId,
        supplied: Option<String>,
    ) -> Result<String, ApiError> {
        if let Some(name) = supplied.map(|n| n.trim().to_string())
            && !name.is_empty()
        {
            return Ok(name);
        }
        Ok(self
            .users
            .find_user(user_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "Anonymous".to_string()))
    }
}

async fn write_upload(dir: &Path, file_name: &str, data: &[u8]) -> Result<(), ApiError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot create {}: {e}", dir.display())))?;
    tokio::fs::write(dir.join(file_name), data)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot store upload: {e}")))
}

/// Keeps the final path component of a client file name and replaces
/// anything outside `[A-Za-z0-9._-]` with `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn validate_rating(rating: u8) -> Result<(), ApiError> {
    if !RATING_RANGE.contains(&rating) {
        return Err(ApiError::InvalidRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

fn required_text(text: String) -> Result<String, ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidRequest("text is required".to_string()));
    }
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::{Event, NewEvent, Role, User};
    use crate::persistence::Stores;

    struct Fixture {
        stores: Stores,
        service: CommunityService,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let stores = Stores::in_memory();
        let service = CommunityService::new(
            Arc::clone(&stores.events),
            Arc::clone(&stores.users),
            Arc::clone(&stores.documents),
            dir.path().to_path_buf(),
        );
        Fixture {
            stores,
            service,
            dir,
        }
    }

    async fn seed(fx: &Fixture) -> (User, Event) {
        let user = User::new(
            "Grace".to_string(),
            "grace@example.com".to_string(),
            "hash".to_string(),
            Role::Customer,
            None,
        );
        assert!(fx.stores.users.insert_user(&user).await.is_ok());
        let Ok(event) = Event::create(
            UserId::new(),
            NewEvent {
                title: "Meetup".to_string(),
                description: None,
                location: "Oslo".to_string(),
                start_date: Utc::now() + Duration::days(3),
                end_date: None,
                total_seats: 50,
                price: Decimal::ZERO,
                is_published: true,
            },
        ) else {
            panic!("invalid event");
        };
        assert!(fx.stores.events.insert_event(&event).await.is_ok());
        (user, event)
    }

    fn review(rating: u8) -> NewReview {
        NewReview {
            user_name: None,
            rating,
            title: None,
            text: "Great night".to_string(),
        }
    }

    #[tokio::test]
    async fn comment_falls_back_to_account_name() {
        let fx = fixture();
        let (user, event) = seed(&fx).await;
        let Ok(comment) = fx
            .service
            .add_comment(user.id, event.id, None, "See you there".to_string())
            .await
        else {
            panic!("comment failed");
        };
        assert_eq!(comment.user_name, "Grace");
        let Ok(comments) = fx.service.list_comments(event.id).await else {
            panic!("listing failed");
        };
        assert_eq!(comments, vec![comment]);
    }

    #[tokio::test]
    async fn comments_on_unknown_event_are_rejected() {
        let fx = fixture();
        let (user, _) = seed(&fx).await;
        assert!(matches!(
            fx.service
                .add_comment(user.id, EventId::new(), None, "hi".to_string())
                .await,
            Err(ApiError::EventNotFound(_))
        ));
        assert!(matches!(
            fx.service.list_comments(EventId::new()).await,
            Err(ApiError::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn one_review_per_user_and_rating_in_range() {
        let fx = fixture();
        let (user, event) = seed(&fx).await;
        assert!(matches!(
            fx.service.add_review(user.id, event.id, review(6)).await,
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(fx.service.add_review(user.id, event.id, review(5)).await.is_ok());
        assert!(matches!(
            fx.service.add_review(user.id, event.id, review(4)).await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn only_author_updates_or_deletes() {
        let fx = fixture();
        let (user, event) = seed(&fx).await;
        let Ok(created) = fx.service.add_review(user.id, event.id, review(3)).await else {
            panic!("review failed");
        };
        let changes = ReviewChanges {
            rating: Some(4),
            ..ReviewChanges::default()
        };

        assert!(matches!(
            fx.service
                .update_review(UserId::new(), &created.id, changes.clone())
                .await,
            Err(ApiError::ReviewNotFound(_))
        ));
        let Ok(updated) = fx.service.update_review(user.id, &created.id, changes).await else {
            panic!("update failed");
        };
        assert_eq!(updated.rating, 4);
        assert!(updated.updated_at.is_some());

        assert!(matches!(
            fx.service.delete_review(UserId::new(), &created.id).await,
            Err(ApiError::ReviewNotFound(_))
        ));
        assert!(fx.service.delete_review(user.id, &created.id).await.is_ok());
        assert!(matches!(
            fx.service.get_review(&created.id).await,
            Err(ApiError::ReviewNotFound(_))
        ));
    }

    #[tokio::test]
    async fn upload_stores_file_and_classifies_kind() {
        let fx = fixture();
        let (user, event) = seed(&fx).await;
        let upload = Upload {
            file_name: "../stage photo.png".to_string(),
            content_type: Some("image/png".to_string()),
            data: vec![0x89, b'P', b'N', b'G'],
            caption: Some("Main stage".to_string()),
        };
        let Ok(media) = fx.service.upload_media(user.id, event.id, upload).await else {
            panic!("upload failed");
        };
        assert_eq!(media.kind, MediaKind::Image);
        assert!(media.url.starts_with("/uploads/events/"));
        assert!(media.url.ends_with("-stage_photo.png"));

        let Some(file_name) = media.url.rsplit('/').next() else {
            panic!("url without file name");
        };
        let stored = fx.dir.path().join("events").join(file_name);
        assert!(matches!(tokio::fs::read(&stored).await, Ok(bytes) if bytes.len() == 4));

        let Ok(listed) = fx.service.list_media(event.id).await else {
            panic!("listing failed");
        };
        assert_eq!(listed, vec![media]);
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("a/b/c d.mp4"), "c_d.mp4");
        assert_eq!(sanitize_file_name("..\\evil.sh"), "evil.sh");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
