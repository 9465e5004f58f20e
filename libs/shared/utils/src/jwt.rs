//! Supabase issues HS256 tokens; verifying one only needs an HMAC over the
//! first two segments, so this stays a hand-rolled check rather than a full
//! JOSE dependency.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token verification is not configured")]
    MissingSecret,
    #[error("malformed token")]
    Malformed,
    #[error("token signature mismatch")]
    BadSignature,
    #[error("unreadable token claims")]
    BadClaims,
    #[error("token expired")]
    Expired,
}

/// Verifies a bearer token against the project JWT secret and turns its
/// claims into the authenticated [`User`].
pub fn verify_bearer_token(token: &str, secret: &str) -> Result<User, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let (signing_input, signature_b64) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
    let (_, claims_b64) = signing_input.split_once('.').ok_or(TokenError::Malformed)?;
    if claims_b64.contains('.') {
        return Err(TokenError::Malformed);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::BadSignature)?;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| TokenError::MissingSecret)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature).map_err(|_| {
        debug!("token signature verification failed");
        TokenError::BadSignature
    })?;

    let claims = decode_claims(claims_b64)?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("token expired at {} (now {})", exp, now);
            return Err(TokenError::Expired);
        }
    }

    Ok(user_from_claims(claims))
}

fn decode_claims(claims_b64: &str) -> Result<JwtClaims, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| TokenError::BadClaims)?;

    serde_json::from_slice(&bytes).map_err(|e| {
        debug!("failed to parse token claims: {}", e);
        TokenError::BadClaims
    })
}

fn user_from_claims(claims: JwtClaims) -> User {
    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret-long-enough-for-hmac";

    #[test]
    fn test_valid_token_yields_user() {
        let issued_to = TestUser::practitioner("doc@example.com");
        let token = JwtTestUtils::create_test_token(&issued_to, SECRET, Some(1));

        let user = verify_bearer_token(&token, SECRET).unwrap();
        assert_eq!(user.id, issued_to.id);
        assert_eq!(user.email, Some(issued_to.email.clone()));
        assert_eq!(user.role, Some("practitioner".to_string()));
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issued_to = TestUser::default();
        let token = JwtTestUtils::create_test_token(&issued_to, "some-other-secret", Some(1));

        assert_eq!(
            verify_bearer_token(&token, SECRET),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issued_to = TestUser::default();
        let token = JwtTestUtils::create_expired_token(&issued_to, SECRET);

        assert_eq!(verify_bearer_token(&token, SECRET), Err(TokenError::Expired));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        for token in ["", "only-one-segment", "two.segments", "a.b.c.d"] {
            let result = verify_bearer_token(token, SECRET);
            assert!(result.is_err(), "accepted {:?}", token);
        }
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        let issued_to = TestUser::default();
        let token = JwtTestUtils::create_test_token(&issued_to, "", Some(1));

        assert_eq!(
            verify_bearer_token(&token, ""),
            Err(TokenError::MissingSecret)
        );
    }
}
