//! Community handlers: comments, reviews and media uploads.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    CreateCommentRequest, CreateReviewRequest, MediaUploadForm, MessageResponse,
    UpdateReviewRequest,
};
use crate::app_state::AppState;
use crate::auth::{AuthUser, OrganizerUser};
use crate::domain::{Comment, EventId, Media, Review};
use crate::error::{ApiError, ErrorResponse};
use crate::service::community_service::Upload;

/// `GET /events/{id}/comments` — Comments on an event, newest first.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] for an unknown event.
#[utoipa::path(
    get,
    path = "/api/events/{id}/comments",
    tag = "Community",
    summary = "List comments",
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Comments", body = Vec<Comment>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.community.list_comments(event_id).await?))
}

/// `POST /events/{id}/comments` — Comment on an event.
///
/// # Errors
///
/// Returns [`ApiError`] for an empty text or an unknown event.
#[utoipa::path(
    post,
    path = "/api/events/{id}/comments",
    tag = "Community",
    summary = "Add a comment",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Event UUID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment stored", body = Comment),
        (status = 400, description = "Empty text", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn add_comment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(event_id): Path<EventId>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .community
        .add_comment(caller.id, event_id, req.user_name, req.text)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// `GET /events/{id}/reviews` — Reviews of an event, newest first.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] for an unknown event.
#[utoipa::path(
    get,
    path = "/api/events/{id}/reviews",
    tag = "Community",
    summary = "List event reviews",
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Reviews", body = Vec<Review>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_event_reviews(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.community.list_event_reviews(event_id).await?))
}

/// `POST /events/{id}/reviews` — Review an event, once per user.
///
/// # Errors
///
/// Returns [`ApiError`] for a rating outside 1 to 5, an unknown event or a
/// second review by the same user.
#[utoipa::path(
    post,
    path = "/api/events/{id}/reviews",
    tag = "Community",
    summary = "Add a review",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Event UUID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review stored", body = Review),
        (status = 400, description = "Invalid rating or text", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Already reviewed", body = ErrorResponse),
    )
)]
pub async fn add_review(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(event_id): Path<EventId>,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state
        .community
        .add_review(caller.id, event_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /reviews` — All reviews, newest first.
///
/// # Errors
///
/// Returns [`ApiError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/reviews",
    tag = "Community",
    summary = "List all reviews",
    responses(
        (status = 200, description = "Reviews", body = Vec<Review>),
    )
)]
pub async fn list_reviews(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.community.list_reviews().await?))
}

/// `GET /reviews/{id}` — One review.
///
/// # Errors
///
/// Returns [`ApiError::ReviewNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    tag = "Community",
    summary = "Get review",
    params(("id" = String, Path, description = "Review document id")),
    responses(
        (status = 200, description = "Review", body = Review),
        (status = 404, description = "Review not found", body = ErrorResponse),
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.community.get_review(&id).await?))
}

/// `PUT /reviews/{id}` — Edit an own review.
///
/// # Errors
///
/// Returns [`ApiError::ReviewNotFound`] unless the caller wrote the review.
#[utoipa::path(
    put,
    path = "/api/reviews/{id}",
    tag = "Community",
    summary = "Update review",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Review document id")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated review", body = Review),
        (status = 400, description = "Invalid rating or text", body = ErrorResponse),
        (status = 404, description = "Review not found or not yours", body = ErrorResponse),
    )
)]
pub async fn update_review(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let review = state
        .community
        .update_review(caller.id, &id, req.into())
        .await?;
    Ok(Json(review))
}

/// `DELETE /reviews/{id}` — Remove an own review.
///
/// # Errors
///
/// Returns [`ApiError::ReviewNotFound`] unless the caller wrote the review.
#[utoipa::path(
    delete,
    path = "/api/reviews/{id}",
    tag = "Community",
    summary = "Delete review",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Review document id")),
    responses(
        (status = 200, description = "Review deleted", body = MessageResponse),
        (status = 404, description = "Review not found or not yours", body = ErrorResponse),
    )
)]
pub async fn delete_review(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.community.delete_review(caller.id, &id).await?;
    Ok(Json(MessageResponse::new("Review deleted successfully")))
}

/// `GET /events/{id}/media` — Media of an event, newest first.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] for an unknown event.
#[utoipa::path(
    get,
    path = "/api/events/{id}/media",
    tag = "Community",
    summary = "List media",
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Media", body = Vec<Media>),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_media(
    State(state): State<AppState>,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.community.list_media(event_id).await?))
}

/// `POST /events/{id}/media` — Upload an image or video.
///
/// # Errors
///
/// Returns [`ApiError`] when the form has no `file` part, the event is
/// unknown or the file cannot be written.
#[utoipa::path(
    post,
    path = "/api/events/{id}/media",
    tag = "Community",
    summary = "Upload media",
    description = "Multipart form with a `file` part and an optional `caption` part. The stored file is served back under `/uploads`.",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Event UUID")),
    request_body(content = MediaUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Media stored", body = Media),
        (status = 400, description = "No file uploaded", body = ErrorResponse),
        (status = 403, description = "Caller is not an organizer", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn upload_media(
    State(state): State<AppState>,
    OrganizerUser(caller): OrganizerUser,
    Path(event_id): Path<EventId>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart).await?;
    let media = state
        .community
        .upload_media(caller.id, event_id, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(media)))
}

/// Collects the `file` and `caption` parts of an upload form. Other parts
/// are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut caption = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(bad_form)?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            Some("caption") => {
                caption = Some(field.text().await.map_err(bad_form)?);
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| ApiError::InvalidRequest("No file uploaded".to_string()))?;
    Ok(Upload {
        file_name,
        content_type,
        data,
        caption,
    })
}

fn bad_form(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::InvalidRequest(format!("malformed upload: {e}"))
}

/// Community routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/events/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/events/{id}/reviews",
            get(list_event_reviews).post(add_review),
        )
        .route("/events/{id}/media", get(list_media).post(upload_media))
        .route("/reviews", get(list_reviews))
        .route(
            "/reviews/{id}",
            get(get_review).put(update_review).delete(delete_review),
        )
}
