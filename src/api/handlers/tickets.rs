//! Ticketing handlers: reserve, purchase, listings and cancellation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    CancelResponse, PurchaseRequest, PurchaseResponse, ReservationResponse, ReserveRequest,
    TicketWithEvent,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{Payment, TicketId};
use crate::error::{ApiError, ErrorResponse};

/// `POST /tickets/reserve` — Hold seats for a limited time.
///
/// # Errors
///
/// Returns [`ApiError`] for a bad quantity, an unknown or started event, or
/// too few seats.
#[utoipa::path(
    post,
    path = "/api/tickets/reserve",
    tag = "Tickets",
    summary = "Reserve seats",
    description = "Places a hold on up to 10 seats. The hold expires on its own; seats are only taken from the event on purchase.",
    security(("bearer" = [])),
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Hold placed", body = ReservationResponse),
        (status = 400, description = "Invalid quantity", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 422, description = "Event started or not enough seats", body = ErrorResponse),
    )
)]
pub async fn reserve(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<ReserveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let hold = state
        .tickets
        .reserve(caller.id, req.event_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(ReservationResponse::from(hold))))
}

/// `POST /tickets/purchase` — Pay for a hold.
///
/// # Errors
///
/// Returns [`ApiError`] if the hold expired, belongs to someone else or the
/// seats sold out meanwhile.
#[utoipa::path(
    post,
    path = "/api/tickets/purchase",
    tag = "Tickets",
    summary = "Purchase a reservation",
    description = "Issues one ticket per held seat and a single completed payment, atomically decrementing the event's available seats.",
    security(("bearer" = [])),
    request_body = PurchaseRequest,
    responses(
        (status = 201, description = "Tickets issued", body = PurchaseResponse),
        (status = 403, description = "Hold belongs to another user", body = ErrorResponse),
        (status = 404, description = "Reservation expired or not found", body = ErrorResponse),
        (status = 422, description = "Not enough seats", body = ErrorResponse),
    )
)]
pub async fn purchase(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state
        .tickets
        .purchase(caller.id, req.reservation_id, req.payment_info.into())
        .await?;
    Ok((StatusCode::CREATED, Json(PurchaseResponse::from(receipt))))
}

/// `GET /tickets/my-tickets` — The caller's tickets, newest first.
///
/// # Errors
///
/// Returns [`ApiError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/tickets/my-tickets",
    tag = "Tickets",
    summary = "List own tickets",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Tickets with event summaries", body = Vec<TicketWithEvent>),
    )
)]
pub async fn my_tickets(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let tickets: Vec<TicketWithEvent> = state
        .tickets
        .my_tickets(caller.id)
        .await?
        .into_iter()
        .map(TicketWithEvent::from)
        .collect();
    Ok(Json(tickets))
}

/// `GET /tickets/my-payments` — The caller's payments, newest first.
///
/// # Errors
///
/// Returns [`ApiError`] on store failures.
#[utoipa::path(
    get,
    path = "/api/tickets/my-payments",
    tag = "Tickets",
    summary = "List own payments",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Payments", body = Vec<Payment>),
    )
)]
pub async fn my_payments(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.tickets.my_payments(caller.id).await?))
}

/// `PUT /tickets/{id}/cancel` — Cancel a ticket and release its seat.
///
/// # Errors
///
/// Returns [`ApiError`] if the ticket is not the caller's, is already
/// cancelled, or its event has started.
#[utoipa::path(
    put,
    path = "/api/tickets/{id}/cancel",
    tag = "Tickets",
    summary = "Cancel a ticket",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Ticket UUID")),
    responses(
        (status = 200, description = "Ticket cancelled", body = CancelResponse),
        (status = 404, description = "Ticket not found", body = ErrorResponse),
        (status = 409, description = "Already cancelled", body = ErrorResponse),
        (status = 422, description = "Event already started", body = ErrorResponse),
    )
)]
pub async fn cancel_ticket(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<TicketId>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = state.tickets.cancel(caller.id, id).await?;
    Ok(Json(CancelResponse {
        message: "Ticket cancelled successfully".to_string(),
        ticket,
    }))
}

/// Ticketing routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tickets/reserve", post(reserve))
        .route("/tickets/purchase", post(purchase))
        .route("/tickets/my-tickets", get(my_tickets))
        .route("/tickets/my-payments", get(my_payments))
        .route("/tickets/{id}/cancel", put(cancel_ticket))
}
