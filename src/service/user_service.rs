//! Account service: registration, login and profile maintenance.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::TokenIssuer;
use crate::auth::password::{hash_password, verify_password};
use crate::domain::user::{is_valid_email, normalize_email};
use crate::domain::{Role, User, UserId};
use crate::error::ApiError;
use crate::persistence::UserStore;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Fields accepted at registration.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Requested role; customer when absent.
    pub role: Option<Role>,
    /// Optional phone.
    pub phone: Option<String>,
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    /// New display name.
    pub name: Option<String>,
    /// New login email.
    pub email: Option<String>,
    /// New phone.
    pub phone: Option<String>,
    /// New plain-text password.
    pub password: Option<String>,
}

/// An account together with a freshly issued access token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The account.
    pub user: User,
    /// Bearer token for subsequent requests.
    pub token: String,
}

/// Account orchestration over the relational store.
#[derive(Debug, Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    tokens: TokenIssuer,
    bcrypt_cost: u32,
}

impl UserService {
    /// Creates a new `UserService`.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer, bcrypt_cost: u32) -> Self {
        Self {
            users,
            tokens,
            bcrypt_cost,
        }
    }

    /// Creates an account and signs the caller in.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] on bad fields, [`ApiError::Forbidden`]
    /// when asking for the admin role, [`ApiError::Conflict`] when the email
    /// is taken.
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, ApiError> {
        let name = validate_name(&registration.name)?;
        let email = validate_email(&registration.email)?;
        validate_password(&registration.password)?;

        let role = registration.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(ApiError::Forbidden(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(registration.password, self.bcrypt_cost).await?;
        let user = User::new(name, email, password_hash, role, registration.phone);
        self.users.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        let token = self.tokens.issue(&user)?;
        Ok(AuthSession { user, token })
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidCredentials`] for an unknown email or a wrong
    /// password alike.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            return Err(ApiError::InvalidCredentials);
        };
        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "wrong password");
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        Ok(AuthSession { user, token })
    }

    /// Loads the caller's account.
    ///
    /// # Errors
    ///
    /// [`ApiError::UserNotFound`] if the account was removed after the
    /// token was issued.
    pub async fn profile(&self, id: UserId) -> Result<User, ApiError> {
        self.users
            .find_user(id)
            .await?
            .ok_or(ApiError::UserNotFound(*id.as_uuid()))
    }

    /// Applies a partial profile update and returns the stored account.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidRequest`] on bad fields, [`ApiError::Conflict`]
    /// if the new email belongs to another account.
    pub async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> Result<User, ApiError> {
        let mut user = self.profile(id).await?;

        if let Some(name) = changes.name {
            user.name = validate_name(&name)?;
        }
        if let Some(email) = changes.email {
            let email = validate_email(&email)?;
            if email != user.email
                && let Some(other) = self.users.find_user_by_email(&email).await?
                && other.id != user.id
            {
                return Err(ApiError::Conflict(
                    "User with this email already exists".to_string(),
                ));
            }
            user.email = email;
        }
        if let Some(phone) = changes.phone {
            user.phone = Some(phone);
        }
        if let Some(password) = changes.password {
            validate_password(&password)?;
            user.password_hash = hash_password(password, self.bcrypt_cost).await?;
        }
        user.updated_at = Utc::now();

        self.users.update_user(&user).await?;
        tracing::info!(user_id = %user.id, "profile updated");
        Ok(user)
    }
}

fn validate_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::InvalidRequest("name is required".to_string()));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ApiError::InvalidRequest("a valid email is required".to_string()));
    }
    Ok(email)
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
