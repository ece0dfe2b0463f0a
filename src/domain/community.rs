//! Schema-less community content attached to events: comments, reviews
//! and media. These live in the document store and are keyed by event id.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, UserId};

/// Allowed review ratings.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Generates a document id in the document store's native hex format.
#[must_use]
pub fn new_document_id() -> String {
    ObjectId::new().to_hex()
}

/// Free-form comment on an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Document id.
    pub id: String,
    /// Commented event.
    pub event_id: EventId,
    /// Author.
    pub user_id: UserId,
    /// Author display name.
    pub user_name: String,
    /// Comment body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Rated review of an event. One per user per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Document id.
    pub id: String,
    /// Reviewed event.
    pub event_id: EventId,
    /// Author.
    pub user_id: UserId,
    /// Author display name.
    pub user_name: String,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Optional headline.
    pub title: Option<String>,
    /// Review body.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set on every edit.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Kind of uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
}

impl MediaKind {
    /// Classifies an upload by its content type: anything `image/*` is an
    /// image, everything else a video.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.starts_with("image/") => Self::Image,
            _ => Self::Video,
        }
    }
}

/// Image or video uploaded for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    /// Document id.
    pub id: String,
    /// Owning event.
    pub event_id: EventId,
    /// Image or video.
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// Public URL under `/uploads`.
    pub url: String,
    /// Optional caption.
    pub caption: String,
    /// Uploading user.
    pub uploaded_by: UserId,
    /// Upload timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_from_content_type() {
        assert_eq!(
            MediaKind::from_content_type(Some("image/png")),
            MediaKind::Image
        );
        assert_eq!(
            MediaKind::from_content_type(Some("video/mp4")),
            MediaKind::Video
        );
        assert_eq!(MediaKind::from_content_type(None), MediaKind::Video);
    }

    #[test]
    fn document_ids_are_24_hex_chars() {
        let id = new_document_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_document_id());
    }

    #[test]
    fn media_serializes_kind_as_type() {
        let media = Media {
            id: new_document_id(),
            event_id: EventId::new(),
            kind: MediaKind::Image,
            url: "/uploads/events/1-a.png".to_string(),
            caption: String::new(),
            uploaded_by: UserId::new(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&media).unwrap_or_default();
        assert_eq!(json["type"], "image");
        assert!(json.get("uploadedBy").is_some());
    }
}
