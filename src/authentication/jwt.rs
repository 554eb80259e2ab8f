use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User};
use crate::error::ConfigError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub email: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, email: String, ttl: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = now
            .checked_add_signed(ttl)
            .map_or(i64::MAX, |exp| exp.timestamp());

        Self {
            user_id: id,
            email,
            iat,
            exp,
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Local::now().timestamp()).is_negative()
    }
}

/// The authenticated requester, resolved from a verified token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Id,
    pub email: String,
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            email: value.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenError {
    Invalid,
    Expired,
}

impl TokenError {
    pub fn info(&self) -> &'static str {
        match self {
            TokenError::Invalid => "Invalid token.",
            TokenError::Expired => "Token has expired.",
        }
    }
}

/// Signs and verifies HMAC-SHA256 session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    key: Hmac<Sha256>,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, ConfigError> {
        let key = Hmac::new_from_slice(secret)
            .map_err(|_e| ConfigError::new("JWT_SECRET cannot be used as an HMAC key"))?;

        Ok(Self { key, ttl })
    }

    pub fn generate_jwt_session(&self, user: &User) -> Result<String, jwt::Error> {
        let claims = JwtSessionData::new(user.id, user.email.to_owned(), self.ttl);

        claims.sign_with_key(&self.key)
    }

    pub fn verify_jwt_session(&self, token: &str) -> Result<JwtSessionData, TokenError> {
        let session: JwtSessionData = token
            .verify_with_key(&self.key)
            .map_err(|_e| TokenError::Invalid)?;

        if session.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(session)
    }
}
