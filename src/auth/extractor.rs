// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(caller): Auth) -> impl IntoResponse {
//!     // caller.email identifies the user
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::claims::TokenClaims;
use super::{AuthError, Caller};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated callers.
///
/// ## Authentication Modes
///
/// - **Production mode** (`VAULT_JWT_SECRET` set): HS256 signature and expiry verification
/// - **Development mode** (no secret): decode only, expiry still checked
pub struct Auth(pub Caller);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        let caller = verify_jwt(token, &state.auth_config)?;

        Ok(Auth(caller))
    }
}

/// Verify a bearer token and extract the caller.
pub fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<Caller, AuthError> {
    let claims = match auth_config.jwt_secret {
        Some(ref secret) => verify_jwt_production(token, secret)?,
        None => verify_jwt_development(token)?,
    };

    let email = claims
        .email
        .as_deref()
        .map(Caller::normalize_email)
        .filter(|email| !email.is_empty())
        .ok_or(AuthError::MissingEmail)?;

    Ok(Caller {
        email,
        subject: claims.sub,
        expires_at: claims.exp,
    })
}

/// HS256 verification with the shared secret.
fn verify_jwt_production(token: &str, secret: &str) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_aud = false;

    decode::<TokenClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::MalformedToken,
        })
}

/// Development decoding (no signature check).
///
/// WARNING: This should only be used in development environments.
fn verify_jwt_development(token: &str) -> Result<TokenClaims, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<TokenClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;

    let claims = token_data.claims;
    let now = chrono::Utc::now().timestamp();

    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentStorage, StoragePaths};
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use tempfile::TempDir;

    const SECRET: &str = "test-secret";

    fn create_test_state(jwt_secret: Option<&str>) -> (AppState, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut storage = DocumentStorage::new(StoragePaths::new(temp_dir.path()));
        storage.initialize().expect("Failed to initialize storage");

        let state = AppState::new(storage).with_auth_config(AuthConfig {
            jwt_secret: jwt_secret.map(str::to_string),
        });
        (state, temp_dir)
    }

    /// Unsigned token, accepted only in development mode.
    fn create_test_jwt(email: &str, exp: i64) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"HS256","typ":"JWT"}"#;
        let claims = json!({ "sub": "acct_1", "email": email, "exp": exp }).to_string();

        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.as_bytes());

        format!("{header_b64}.{claims_b64}.fake_signature")
    }

    fn signed_jwt(email: &str, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &json!({ "sub": "acct_1", "email": email, "exp": 9_999_999_999i64 }),
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn parts_with(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let (state, _temp_dir) = create_test_state(None);
        let mut parts = parts_with(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn development_mode_accepts_unsigned_token() {
        let (state, _temp_dir) = create_test_state(None);
        let token = create_test_jwt("Friend@Example.com", 9_999_999_999);
        let mut parts = parts_with(Some(&token));

        let Auth(caller) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(caller.email, "friend@example.com");
        assert_eq!(caller.subject, "acct_1");
    }

    #[tokio::test]
    async fn development_mode_checks_expiry() {
        let (state, _temp_dir) = create_test_state(None);
        let token = create_test_jwt("friend@example.com", 1_600_000_000);
        let mut parts = parts_with(Some(&token));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn token_without_email_is_rejected() {
        let (state, _temp_dir) = create_test_state(None);
        let token = create_test_jwt("", 9_999_999_999);
        let mut parts = parts_with(Some(&token));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingEmail)));
    }

    #[tokio::test]
    async fn production_mode_verifies_signature() {
        let (state, _temp_dir) = create_test_state(Some(SECRET));

        let mut parts = parts_with(Some(&signed_jwt("friend@example.com", SECRET)));
        let Auth(caller) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(caller.email, "friend@example.com");

        let mut parts = parts_with(Some(&signed_jwt("friend@example.com", "other-secret")));
        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));

        let unsigned = create_test_jwt("friend@example.com", 9_999_999_999);
        let mut parts = parts_with(Some(&unsigned));
        assert!(Auth::from_request_parts(&mut parts, &state).await.is_err());
    }
}
