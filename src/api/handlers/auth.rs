//! Account handlers: register, login and profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, UserResponse,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::{ApiError, ErrorResponse};

/// `POST /auth/register` — Create an account and return a token.
///
/// # Errors
///
/// Returns [`ApiError`] on invalid fields, a taken email or an `admin` role.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    summary = "Register",
    description = "Creates a customer or organizer account. The response carries a bearer token so the client is logged in right away.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 403, description = "Admin accounts cannot self-register", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.users.register(req.into()).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

/// `POST /auth/login` — Exchange credentials for a token.
///
/// # Errors
///
/// Returns [`ApiError::InvalidCredentials`] for an unknown email or a wrong
/// password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    summary = "Log in",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.users.login(&req.email, &req.password).await?;
    Ok(Json(AuthResponse::from(session)))
}

/// `GET /auth/profile` — The caller's account.
///
/// # Errors
///
/// Returns [`ApiError::UserNotFound`] if the account was removed after the
/// token was issued.
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Auth",
    summary = "Get own profile",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Account", body = UserResponse),
        (status = 401, description = "Missing token", body = ErrorResponse),
        (status = 403, description = "Invalid token", body = ErrorResponse),
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.profile(caller.id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// `PUT /auth/profile` — Update name, email, phone or password.
///
/// # Errors
///
/// Returns [`ApiError`] on invalid fields or a taken email.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "Auth",
    summary = "Update own profile",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.update_profile(caller.id, req.into()).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(get_profile).put(update_profile))
}
