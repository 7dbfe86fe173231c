//! Bearer-token authentication.
//!
//! Access tokens are HS256 JWTs signed with the configured secret. The `id` claim holds
//! the user id as a JSON number; `exp` is required. Revoked tokens are kept in the
//! user repository's blacklist and rejected here.

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use citizenx_model::UserId;
use headers::authorization::Bearer;
use headers::{Authorization, HeaderMapExt};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

pub const INVALID_USER_ID: &str = "Invalid userID format";

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    id: Value,
}

/// The caller behind a valid, unrevoked bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Some(Authorization(bearer)) = parts.headers.typed_get::<Authorization<Bearer>>()
        else {
            return Err(ApiError::Unauthorized);
        };
        let token = bearer.token();

        let claims = decode_claims(token, &state.jwt_secret).map_err(|e| {
            debug!("rejecting token: {e}");
            ApiError::Unauthorized
        })?;

        if state.users.is_token_blacklisted(token).await? {
            debug!("rejecting revoked token");
            return Err(ApiError::Unauthorized);
        }

        let id = user_id_from_claim(&claims.id)
            .ok_or_else(|| ApiError::bad_request(INVALID_USER_ID))?;
        Ok(AuthUser {
            id,
            token: token.to_string(),
        })
    }
}

fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<Claims>(token, &key, &validation).map(|data| data.claims)
}

/// Accepts any JSON number with an integral, non-negative value.
fn user_id_from_claim(claim: &Value) -> Option<UserId> {
    if let Some(id) = claim.as_u64() {
        return UserId::try_from(id).ok();
    }
    let id = claim.as_f64()?;
    if id >= 0.0 && id.fract() == 0.0 && id <= UserId::MAX as f64 {
        Some(id as UserId)
    } else {
        None
    }
}

/// Signs an access token for `user_id` that expires after `ttl`.
pub fn issue_token(
    user_id: UserId,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = Utc::now().timestamp() + ttl.as_secs() as i64;
    issue_token_with_claims(json!({ "id": user_id, "exp": exp }), secret)
}

/// Signs arbitrary claims; lets tests build malformed or expired tokens.
pub fn issue_token_with_claims(
    claims: Value,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
