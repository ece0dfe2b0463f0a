//! API error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "not enough available seats: requested 3, available 1",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                      |
/// |-----------|---------------------|----------------------------------|
/// | 1000–1999 | Request / Auth      | 400 / 401 / 403                  |
/// | 2000–2999 | Not Found/Conflict  | 404 Not Found / 409 Conflict     |
/// | 3000–3999 | Server / Stores     | 500 Internal Server Error        |
/// | 4000–4999 | Ticketing Rules     | 422 Unprocessable Entity         |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No bearer token on a protected route.
    #[error("Access token required")]
    MissingToken,

    /// Bearer token failed verification or has expired.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Login with unknown email or wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Authenticated caller lacks the required role or ownership.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// User with the given ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(uuid::Uuid),

    /// Event with the given ID was not found, or is not owned by the caller.
    #[error("event not found: {0}")]
    EventNotFound(uuid::Uuid),

    /// Ticket with the given ID was not found for the caller.
    #[error("ticket not found or you are not authorized: {0}")]
    TicketNotFound(uuid::Uuid),

    /// Reservation hold does not exist or has expired.
    #[error("reservation expired or not found: {0}")]
    ReservationNotFound(uuid::Uuid),

    /// Review with the given ID was not found, or is not authored by the caller.
    #[error("review not found or you are not authorized: {0}")]
    ReviewNotFound(String),

    /// Write would violate a uniqueness or state rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Not enough seats left to satisfy the request.
    #[error("not enough available seats: requested {requested}, available {available}")]
    InsufficientSeats {
        /// Seats asked for.
        requested: u32,
        /// Seats remaining.
        available: i32,
    },

    /// The event has already started.
    #[error("event has already started: {0}")]
    EventStarted(String),

    /// Relational store failure.
    #[error("database error: {0}")]
    Database(String),

    /// Document store failure.
    #[error("document store error: {0}")]
    DocumentStore(String),

    /// Cache failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MissingToken => 1101,
            Self::InvalidToken => 1102,
            Self::InvalidCredentials => 1103,
            Self::Forbidden(_) => 1104,
            Self::UserNotFound(_) => 2001,
            Self::EventNotFound(_) => 2002,
            Self::TicketNotFound(_) => 2003,
            Self::ReservationNotFound(_) => 2004,
            Self::ReviewNotFound(_) => 2005,
            Self::Conflict(_) => 2101,
            Self::InsufficientSeats { .. } => 4001,
            Self::EventStarted(_) => 4002,
            Self::Internal(_) => 3000,
            Self::Database(_) => 3001,
            Self::DocumentStore(_) => 3002,
            Self::Cache(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingToken | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidToken | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UserNotFound(_)
            | Self::EventNotFound(_)
            | Self::TicketNotFound(_)
            | Self::ReservationNotFound(_)
            | Self::ReviewNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientSeats { .. } | Self::EventStarted(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Database(_) | Self::DocumentStore(_) | Self::Cache(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
