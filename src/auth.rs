//! Bearer token authentication for the cart routes.
//!
//! Tokens have the form `<user-id>.<expires-at>.<signature>` where
//! `expires-at` is a unix timestamp in seconds and `signature` is the hex
//! HMAC-SHA256 of `<user-id>.<expires-at>` under the shared secret.
//!
//! [`require_auth`] verifies the token and stores the caller in the request
//! extensions; handlers read it back with the [`AuthUser`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::value_objects::UserId;
use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Malformed token")]
    Malformed,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Token expired")]
    Expired,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self { Self::Unauthorized(err.to_string()) }
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: SecretString,
}

impl TokenVerifier {
    pub fn new(secret: SecretString) -> Self { Self { secret } }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
        mac.update(payload.as_bytes());
        mac
    }

    /// Issues a token for `user` valid for `ttl`.
    pub fn issue(&self, user: UserId, ttl: Duration) -> String {
        let payload = format!("{user}.{}", (Utc::now() + ttl).timestamp());
        let signature = hex::encode(self.mac(&payload).finalize().into_bytes());
        format!("{payload}.{signature}")
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (user, expires_at) = payload.split_once('.').ok_or(AuthError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| AuthError::Malformed)?;

        // Constant-time comparison
        self.mac(payload).verify_slice(&signature).map_err(|_| AuthError::BadSignature)?;

        let expires_at: i64 = expires_at.parse().map_err(|_| AuthError::Malformed)?;
        if expires_at <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        user.parse().map_err(|_| AuthError::Malformed)
    }
}

fn bearer_token(headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Rejects requests without a valid bearer token.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, AppError> {
    let user = bearer_token(request.headers()).and_then(|token| state.tokens().verify(token, Utc::now()));
    match user {
        Ok(user) => {
            request.extensions_mut().insert(AuthUser(user));
            Ok(next.run(request).await)
        }
        Err(err) => {
            tracing::debug!(error = %err, "Rejected unauthenticated request");
            Err(err.into())
        }
    }
}

/// The authenticated caller, set by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().copied().ok_or(AuthError::MissingToken.into())
    }
}
