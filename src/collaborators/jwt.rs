//! JWT-backed session verification.
//!
//! The platform issues HS256-signed session tokens when a user signs in
//! on the web app; the dashboard socket presents the same token during
//! its handshake. [`JwtSessionVerifier`] checks signature and expiry
//! and extracts the identity claims.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{SessionIdentity, SessionVerifier};
use crate::domain::Role;
use crate::error::GatewayError;

/// Claims payload embedded in every platform session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — the user ID.
    pub sub: Uuid,
    /// Role granted at sign-in.
    pub role: Role,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Validates session tokens against the platform's shared HMAC secret.
#[derive(Clone)]
pub struct JwtSessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtSessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtSessionVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionVerifier for JwtSessionVerifier {
    async fn verify(&self, token: &str) -> Result<Option<SessionIdentity>, GatewayError> {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(Some(SessionIdentity {
                user_id: data.claims.sub.into(),
                role: data.claims.role,
            })),
            Err(e) => {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        debug!("session token expired");
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        debug!("session token signature invalid");
                    }
                    other => {
                        debug!(reason = ?other, "session token rejected");
                    }
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use super::*;

    const SECRET: &str = "test-secret";

    fn sign(claims: &SessionClaims, secret: &str) -> String {
        let Ok(token) = encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        ) else {
            panic!("token signing must succeed");
        };
        token
    }

    fn claims_for(role: Role, exp_offset_secs: i64) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: Uuid::new_v4(),
            role,
            iat: now,
            exp: now + exp_offset_secs,
        }
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let verifier = JwtSessionVerifier::new(SECRET);
        let claims = claims_for(Role::Admin, 3600);
        let token = sign(&claims, SECRET);

        let identity = verifier.verify(&token).await;
        let Ok(Some(identity)) = identity else {
            panic!("valid token must verify");
        };
        assert_eq!(*identity.user_id.as_uuid(), claims.sub);
        assert_eq!(identity.role, Role::Admin);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let verifier = JwtSessionVerifier::new(SECRET);
        let token = sign(&claims_for(Role::User, -3600), SECRET);

        let result = verifier.verify(&token).await;
        let Ok(outcome) = result else {
            panic!("rejection is not an infrastructure error");
        };
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let verifier = JwtSessionVerifier::new(SECRET);
        let token = sign(&claims_for(Role::User, 3600), "other-secret");

        let Ok(outcome) = verifier.verify(&token).await else {
            panic!("rejection is not an infrastructure error");
        };
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let verifier = JwtSessionVerifier::new(SECRET);
        let Ok(outcome) = verifier.verify("not-a-jwt").await else {
            panic!("rejection is not an infrastructure error");
        };
        assert!(outcome.is_none());
    }
}
