use std::sync::Arc;

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use jsonwebtoken::{DecodingKey, Validation, decode};
use registry_common::UserId;
use serde::{Deserialize, Serialize};

use crate::domain::access::Caller;
use crate::domain::error::ResearchError;
use crate::domain::{AppState, SessionVerifier};
use crate::infrastructure::http::api::ApiError;

const BEARER_PREFIX: &str = "Bearer ";

/// JWT claims of a session token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Verifies HS256 session tokens issued by the institution's sign in service
#[derive(Clone)]
pub struct JwtSessionVerifier {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtSessionVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(Validation::default()),
        }
    }
}

impl SessionVerifier for JwtSessionVerifier {
    fn verify(&self, token: &str) -> Result<UserId, ResearchError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("rejected session token: {}", e);
                ResearchError::Unauthorized
            })?;
        UserId::try_new(claims.sub).map_err(|_| ResearchError::Unauthorized)
    }
}

/// The signed in user of a request, if any.
///
/// A request without an Authorization header is anonymous. A header that
/// is not a valid bearer token rejects the request with 401, and a valid
/// token of a user that no longer exists with 404.
#[derive(Debug, Clone)]
pub struct CurrentCaller(pub Option<Caller>);

impl CurrentCaller {
    /// The caller, or Unauthorized for anonymous requests
    pub fn required(self) -> Result<Caller, ApiError> {
        self.0.ok_or_else(|| ResearchError::Unauthorized.into())
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.0.as_ref()
    }
}

impl<S: AppState> FromRequestParts<S> for CurrentCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_id = match bearer_token(parts)? {
            Some(token) => Some(state.sessions().verify(token)?),
            None => None,
        };
        let caller = state.research().resolve_caller(user_id.as_ref()).await?;
        Ok(CurrentCaller(caller))
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ResearchError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or(ResearchError::Unauthorized)
}

/// Signs a session token the way the sign in service does
#[cfg(test)]
pub fn issue_token(secret: &str, user_id: &str, ttl: chrono::Duration) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
