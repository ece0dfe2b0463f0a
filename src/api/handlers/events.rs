//! Event handlers: listing, CRUD and the seat counter.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{
    CreateEventRequest, EventListQuery, EventListResponse, MessageResponse, PaginationMeta,
    SeatsResponse, UpdateEventRequest,
};
use crate::app_state::AppState;
use crate::auth::OrganizerUser;
use crate::domain::{Event, EventId};
use crate::error::{ApiError, ErrorResponse};

/// `GET /events` — Published events, paginated and filtered.
///
/// # Errors
///
/// Returns [`ApiError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Events",
    summary = "List published events",
    description = "Returns published events ordered by start date. Supports filtering by organizer, venue substring and earliest start.",
    params(EventListQuery),
    responses(
        (status = 200, description = "Paginated event list", body = EventListResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (window, filter) = query.into_filter();
    let page = state.events.list(&filter).await?;
    Ok(Json(EventListResponse {
        data: page.events,
        pagination: PaginationMeta::new(window.page, window.per_page, page.total),
    }))
}

/// `POST /events` — Create an event owned by the caller.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] on bad fields.
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "Events",
    summary = "Create an event",
    security(("bearer" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 403, description = "Caller is not an organizer", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    OrganizerUser(caller): OrganizerUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.create(&caller, req.into()).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events/{id}` — Event details.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Get event",
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.events.get(id).await?))
}

/// `PUT /events/{id}` — Partial update by the owner or an admin.
///
/// # Errors
///
/// Returns [`ApiError`] if the event is missing, not the caller's, or the
/// new capacity is below the seats already sold.
#[utoipa::path(
    put,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Update event",
    description = "Changing `totalSeats` shifts `availableSeats` by the same delta.",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Event UUID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    OrganizerUser(caller): OrganizerUser,
    Path(id): Path<EventId>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state.events.update(id, &caller, req.into()).await?;
    Ok(Json(event))
}

/// `DELETE /events/{id}` — Remove an event with its tickets and documents.
///
/// # Errors
///
/// Returns [`ApiError`] if the event is missing or not the caller's.
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = "Events",
    summary = "Delete event",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    OrganizerUser(caller): OrganizerUser,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    state.events.delete(id, &caller).await?;
    Ok(Json(MessageResponse::new("Event deleted successfully")))
}

/// `GET /events/{id}/seats` — Seats still for sale.
///
/// # Errors
///
/// Returns [`ApiError::EventNotFound`] for an unknown id.
#[utoipa::path(
    get,
    path = "/api/events/{id}/seats",
    tag = "Events",
    summary = "Available seats",
    params(("id" = String, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Seat counter", body = SeatsResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn event_seats(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ApiError> {
    let available_seats = state.events.available_seats(id).await?;
    Ok(Json(SeatsResponse {
        event_id: id,
        available_seats,
    }))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/{id}/seats", get(event_seats))
}
