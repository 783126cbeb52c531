use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{ApiError, AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: u64,
    pub exp: u64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingToken,
    #[error("invalid authorization header")]
    MalformedHeader,
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    InvalidToken,
}

impl AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::Expired => "TOKEN_EXPIRED",
            _ => "UNAUTHORIZED",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiError {
                error: self.to_string(),
                code: self.code().to_string(),
            }),
        )
            .into_response()
    }
}

pub fn create_token(
    secret: &str,
    user_id: i64,
    email: &str,
    expire_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + expire_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::InvalidToken,
    })
}

fn bearer_token(req: &Request<Body>) -> Result<&str, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Validates the bearer token and stores the claims as a request extension
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let claims = match bearer_token(&req).and_then(|t| validate_token(&state.jwt_secret, t)) {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected request: {}", e);
            return e.into_response();
        }
    };

    req.extensions_mut().insert(claims);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_token_roundtrip() {
        let token = create_token(SECRET, 42, "marie@example.fr", 3600).unwrap();
        let claims = validate_token(SECRET, &token).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.email, "marie@example.fr");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token(SECRET, 1, "a@example.fr", 3600).unwrap();
        assert!(matches!(
            validate_token("other-secret", &token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: "1".to_string(),
            email: "a@example.fr".to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            validate_token(SECRET, &token),
            Err(AuthError::Expired)
        ));
    }
}
