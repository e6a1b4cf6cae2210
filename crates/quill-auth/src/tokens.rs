use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use quill_core::ids::UserId;

use crate::error::AuthError;

/// Default credential lifetime.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Header naming the user a service credential acts for.
pub const ACTING_USER_HEADER: &str = "x-acting-user-id";

/// Role carried in the token. `Service` tokens may act on behalf of an
/// arbitrary user id carried in the call, and are only minted for the
/// configured workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRole {
    User,
    Service,
}

/// Signed claims: subject, role, issue/expiry instants, token id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: TokenRole,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// The authenticated identity attached to an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Principal {
    User(UserId),
    /// A trusted worker. The user it acts for travels in the call itself.
    Service,
}

/// Mints and verifies HS256 bearer credentials. The secret is shared
/// between TaskCore and the trusted workers and never leaves config.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn with_default_ttl(secret: &str) -> Self {
        Self::new(secret, Duration::hours(DEFAULT_TOKEN_TTL_HOURS))
    }

    /// Mint a user credential.
    pub fn mint_user(&self, user_id: UserId) -> Result<String, AuthError> {
        self.mint(user_id.to_string(), TokenRole::User)
    }

    /// Mint a service credential for a named worker.
    pub fn mint_service(&self, worker: &str) -> Result<String, AuthError> {
        self.mint(format!("service:{worker}"), TokenRole::Service)
    }

    fn mint(&self, sub: String, role: TokenRole) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::now_v7().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| AuthError::InvalidToken)
    }

    /// Verify a bearer credential and resolve its principal.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;

        match data.claims.role {
            TokenRole::Service => Ok(Principal::Service),
            TokenRole::User => {
                let user_id = data
                    .claims
                    .sub
                    .parse::<UserId>()
                    .map_err(|_| AuthError::InvalidToken)?;
                Ok(Principal::User(user_id))
            }
        }
    }
}
