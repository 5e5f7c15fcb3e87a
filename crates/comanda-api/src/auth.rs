use std::fmt;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Tokens live for one hour.
pub const TOKEN_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    MissingToken,
    InvalidScheme,
    InvalidToken,
    Signing(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::MissingToken => write!(f, "No token provided"),
            AuthError::InvalidScheme => write!(f, "Invalid token format"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::Signing(msg) => write!(f, "failed to sign token: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// HS256 tokens for a fixed set of accounts.
pub struct Authenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    accounts: Vec<Credentials>,
}

impl Authenticator {
    pub fn new(secret: &str, accounts: Vec<Credentials>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            accounts,
        }
    }

    /// Token for `user` when the password matches a configured account.
    pub fn login(&self, user: &str, password: &str) -> Result<String, AuthError> {
        let known = self
            .accounts
            .iter()
            .any(|a| a.user == user && a.password == password);
        if !known {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue(user)
    }

    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Check an `Authorization` header value and mint a replacement token for
    /// the same subject.
    pub fn refresh(&self, header: Option<&str>) -> Result<String, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidScheme)?;
        let claims = self.verify(token.trim())?;
        self.issue(&claims.sub)
    }
}

/// Reject requests without a valid bearer token and hand back a fresh one in
/// the `Authorization` response header.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidScheme)?),
        None => None,
    };
    let fresh = state.auth.refresh(header)?;

    let mut response = next.run(request).await;
    match HeaderValue::from_str(&format!("Bearer {fresh}")) {
        Ok(value) => {
            response.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(e) => tracing::warn!(error = %e, "refreshed token is not a valid header value"),
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Authenticator {
        Authenticator::new(
            "test-secret",
            vec![Credentials {
                user: "admin".into(),
                password: "pw".into(),
            }],
        )
    }

    #[test]
    fn login_round_trips_subject() {
        let auth = auth();
        let token = auth.login("admin", "pw").unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
    }

    #[test]
    fn wrong_password_is_rejected() {
        assert_eq!(
            auth().login("admin", "nope").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn refresh_checks_scheme_and_signature() {
        let auth = auth();
        assert_eq!(auth.refresh(None).unwrap_err(), AuthError::MissingToken);
        assert_eq!(
            auth.refresh(Some("Token abc")).unwrap_err(),
            AuthError::InvalidScheme
        );
        assert_eq!(
            auth.refresh(Some("Bearer abc")).unwrap_err(),
            AuthError::InvalidToken
        );

        let other = Authenticator::new("other-secret", Vec::new());
        let foreign = other.issue("admin").unwrap();
        assert_eq!(
            auth.refresh(Some(&format!("Bearer {foreign}"))).unwrap_err(),
            AuthError::InvalidToken
        );

        let token = auth.issue("admin").unwrap();
        let fresh = auth.refresh(Some(&format!("Bearer {token}"))).unwrap();
        assert_eq!(auth.verify(&fresh).unwrap().sub, "admin");
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = auth();
        let past = jsonwebtoken::get_current_timestamp() - 2 * TOKEN_TTL_SECS;
        let claims = Claims {
            sub: "admin".into(),
            iat: past,
            exp: past + TOKEN_TTL_SECS,
        };
        let token = jsonwebtoken::encode(&Header::default(), &claims, &auth.encoding).unwrap();
        assert_eq!(auth.verify(&token).unwrap_err(), AuthError::InvalidToken);
    }
}
