/*!
 * Authentication and authorization.
 *
 * Token issuance lives in the identity service; this API only verifies
 * HS256 bearer tokens and enforces the customer/admin role split.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Claims carried in a bearer token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub email: Option<String>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
}

/// Authenticated caller, inserted into request extensions by
/// [`require_auth`] and read back by the [`SessionUser`] extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid authentication token")]
    InvalidToken,
    #[error("Authentication token has expired")]
    ExpiredToken,
    #[error("Insufficient permissions")]
    Forbidden,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "AUTH_MISSING_TOKEN"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            Self::ExpiredToken => (StatusCode::UNAUTHORIZED, "AUTH_EXPIRED_TOKEN"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "AUTH_FORBIDDEN"),
        };
        let body = Json(serde_json::json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

/// Stateless verifier for bearer tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(jwt_secret.as_bytes())),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<SessionUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => {
                    debug!(error = %e, "token verification failed");
                    AuthError::InvalidToken
                }
            }
        })?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(SessionUser {
            user_id,
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}

fn bearer_token(parts_headers: &axum::http::HeaderMap) -> Result<&str, AuthError> {
    let value = parts_headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidToken)
}

/// Middleware: require a valid bearer token, insert [`SessionUser`].
pub async fn require_auth(
    State(verifier): State<TokenVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };
    match verifier.verify(token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Middleware: require a valid bearer token with the admin role.
pub async fn require_admin(
    State(verifier): State<TokenVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(request.headers()) {
        Ok(t) => t,
        Err(e) => return e.into_response(),
    };
    match verifier.verify(token) {
        Ok(user) if user.is_admin() => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(_) => AuthError::Forbidden.into_response(),
        Err(e) => e.into_response(),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn issue(secret: &str, role: Role, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: Some("shopper@example.com".into()),
            role,
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_valid_token() {
        let verifier = TokenVerifier::new("test-secret");
        let token = issue("test-secret", Role::Customer, 3600);
        let user = verifier.verify(&token).unwrap();
        assert_eq!(user.role, Role::Customer);
        assert!(!user.is_admin());
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = TokenVerifier::new("test-secret");
        let token = issue("other-secret", Role::Customer, 3600);
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let verifier = TokenVerifier::new("test-secret");
        let token = issue("test-secret", Role::Admin, -3600);
        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn admin_role_round_trips() {
        let verifier = TokenVerifier::new("test-secret");
        let token = issue("test-secret", Role::Admin, 3600);
        assert!(verifier.verify(&token).unwrap().is_admin());
    }
}
