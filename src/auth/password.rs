//! Bcrypt hashing, run on the blocking pool.

use crate::error::ApiError;

/// Hashes `password` with the given bcrypt cost.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if hashing fails or the blocking task
/// panics.
pub async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Checks `password` against a stored hash. A malformed hash never matches.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] if the blocking task panics.
pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))
}
