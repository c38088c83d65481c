use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::error::record_guard_failure;
use crate::model::address::Address;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated caller of a request: whoever holds the account address
/// the token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthToken {
    address: Address,
}

/// Token claims: the caller's address plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    sub: Address,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign this token, valid until `expire_at`.
    pub fn encode(&self, secret: &[u8], expire_at: DateTime<Utc>) -> Result<String, JwtError> {
        let claims = Claims {
            sub: self.address,
            expire_at,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
    }

    /// Check the signature and expiry of a signed token.
    pub fn decode(token: &str, secret: &[u8]) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(secret),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data: TokenData<Claims>| Self::new(data.claims.sub))
    }

    /// Wrap an already signed token in a session cookie.
    pub fn cookie(signed: String, config: &Config) -> Cookie<'static> {
        Cookie::build(AUTH_TOKEN_COOKIE, signed)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .same_site(SameSite::Strict)
            .http_only(true)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No authentication token provided.")]
    Missing,
    #[error("Invalid authentication token: {0}")]
    Invalid(#[from] JwtError),
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = AuthError;

    /// Read the token from an `Authorization: Bearer` header, falling back to
    /// the session cookie.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<Config>>().await {
            Outcome::Success(config) => config,
            _ => {
                error!("Authentication attempted without a managed config");
                return Outcome::Failure((Status::InternalServerError, AuthError::Missing));
            }
        };

        let header = req
            .headers()
            .get_one("Authorization")
            .and_then(|value| value.strip_prefix(BEARER_PREFIX));
        let cookie = req.cookies().get(AUTH_TOKEN_COOKIE);
        let token = match (header, cookie) {
            (Some(token), _) => token,
            (None, Some(cookie)) => cookie.value(),
            (None, None) => {
                record_guard_failure(req, AuthError::Missing);
                return Outcome::Failure((Status::Unauthorized, AuthError::Missing));
            }
        };

        match Self::decode(token, config.jwt_secret()) {
            Ok(token) => Outcome::Success(token),
            Err(err) => {
                debug!("Rejected authentication token: {err}");
                let err = AuthError::Invalid(err);
                record_guard_failure(req, &err);
                Outcome::Failure((Status::Unauthorized, err))
            }
        }
    }
}
