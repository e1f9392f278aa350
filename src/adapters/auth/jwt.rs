//! HS256 session tokens.
//!
//! Tokens carry a `userId` claim plus `iat`/`exp`. The same secret signs
//! and verifies, so one `JwtSessionValidator` can both issue tokens (for
//! operators and tests) and validate the ones callers present.

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, AuthenticatedUser, Timestamp, UserId};
use crate::ports::SessionValidator;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Validates and issues HS256 session tokens.
pub struct JwtSessionValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_secs: i64,
}

impl JwtSessionValidator {
    pub fn new(secret: &[u8], token_ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_ttl_secs: token_ttl_secs as i64,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.expose_secret().as_bytes(),
            config.token_ttl_secs,
        )
    }

    /// Issues a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: &UserId) -> Result<String, AuthError> {
        let now = Timestamp::now().as_unix_secs();
        self.issue_with_window(user_id, now, now + self.token_ttl_secs)
    }

    fn issue_with_window(&self, user_id: &UserId, iat: i64, exp: i64) -> Result<String, AuthError> {
        let claims = SessionClaims {
            user_id: user_id.as_str().to_string(),
            iat,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session token");
            AuthError::service_unavailable("token signing failed")
        })
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "Session token rejected");
                    AuthError::InvalidToken
                }
            },
        )?;

        let user_id = UserId::new(data.claims.user_id).map_err(|_| AuthError::InvalidToken)?;
        Ok(AuthenticatedUser::new(
            user_id,
            Some(Timestamp::from_unix_secs(data.claims.exp)),
        ))
    }
}
