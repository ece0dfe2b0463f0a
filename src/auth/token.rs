//! HS256 access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::{Role, User, UserId};
use crate::error::ApiError;

/// Longest accepted token lifetime, one year.
pub const MAX_TTL_HOURS: i64 = 24 * 365;

/// Lifetime used when the requested one is out of range.
const FALLBACK_TTL_HOURS: i64 = 24;

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: UserId,
    /// Account email at issue time.
    pub email: String,
    /// Account role at issue time.
    pub role: Role,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Signs and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Creates an issuer whose tokens live for `ttl_hours`. Values outside
    /// `1..=MAX_TTL_HOURS` fall back to 24 hours.
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        let ttl = Some(ttl_hours)
            .filter(|h| (1..=MAX_TTL_HOURS).contains(h))
            .and_then(Duration::try_hours)
            .or_else(|| Duration::try_hours(FALLBACK_TTL_HOURS))
            .unwrap_or_else(Duration::zero);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl,
        }
    }

    /// Issues a token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, ApiError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidToken`] for any malformed, forged or
    /// expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ApiError::InvalidToken
            })
    }
}
