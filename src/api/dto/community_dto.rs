//! Comment, review and media DTOs.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::service::community_service::{NewReview, ReviewChanges};

/// Request body for `POST /api/events/{id}/comments`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    /// Display name; the account name when absent.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Comment body.
    #[serde(default)]
    pub text: String,
}

/// Request body for `POST /api/events/{id}/reviews`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    /// Display name; the account name when absent.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Optional headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Review body.
    #[serde(default)]
    pub text: String,
}

impl From<CreateReviewRequest> for NewReview {
    fn from(req: CreateReviewRequest) -> Self {
        Self {
            user_name: req.user_name,
            rating: req.rating,
            title: req.title,
            text: req.text,
        }
    }
}

/// Request body for `PUT /api/reviews/{id}`. Absent fields are unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    /// New rating.
    #[serde(default)]
    pub rating: Option<u8>,
    /// New headline.
    #[serde(default)]
    pub title: Option<String>,
    /// New body.
    #[serde(default)]
    pub text: Option<String>,
}

impl From<UpdateReviewRequest> for ReviewChanges {
    fn from(req: UpdateReviewRequest) -> Self {
        Self {
            rating: req.rating,
            title: req.title,
            text: req.text,
        }
    }
}

/// Multipart form of `POST /api/events/{id}/media`.
#[derive(Debug, ToSchema)]
pub struct MediaUploadForm {
    /// Image or video file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Optional caption.
    pub caption: Option<String>,
}
