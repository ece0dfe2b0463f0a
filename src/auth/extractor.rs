//! Axum extractors for authenticated callers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{Role, UserId};
use crate::error::ApiError;

/// Caller identified by a valid bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Account id from the `sub` claim.
    pub id: UserId,
    /// Email from the token.
    pub email: String,
    /// Role from the token.
    pub role: Role,
}

impl AuthUser {
    /// Whether the caller may manage the event owned by `organizer_id`.
    #[must_use]
    pub fn can_manage(&self, organizer_id: UserId) -> bool {
        self.role == Role::Admin || self.id == organizer_id
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut words = value.split_whitespace();
    let scheme = words.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    words.next()
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::MissingToken)?;
        let claims = state.tokens.verify(token)?;
        Ok(Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// Authenticated caller holding the organizer or admin role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerUser(pub AuthUser);

impl FromRequestParts<AppState> for OrganizerUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.can_organize() {
            return Err(ApiError::Forbidden(
                "only organizers can perform this action".to_string(),
            ));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap_or_default().into_parts();
        parts
    }

    #[test]
    fn bearer_token_is_second_word() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_foreign_scheme_yields_none() {
        assert_eq!(bearer_token(&parts_with(None)), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Basic dXNlcg=="))), None);
    }

    #[test]
    fn admins_manage_every_event() {
        let owner = UserId::new();
        let admin = AuthUser {
            id: UserId::new(),
            email: "root@example.com".to_string(),
            role: Role::Admin,
        };
        let stranger = AuthUser {
            role: Role::Organizer,
            ..admin.clone()
        };
        assert!(admin.can_manage(owner));
        assert!(!stranger.can_manage(owner));
    }
}
