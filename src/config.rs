use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use chrono::Duration;

use crate::{
    constants::{
        DEFAULT_BIND_ADDRESS, DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_UPLOAD_BYTES,
        DEFAULT_MEDIA_ROOT, DEFAULT_TOKEN_TTL_HOURS,
    },
    error::ConfigError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseUrl {
    Postgres(String),
    /// Keeps everything in process; nothing survives a restart.
    Memory,
}

impl FromStr for DatabaseUrl {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "memory" => Ok(Self::Memory),
            url if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
                Ok(Self::Postgres(url.to_string()))
            }
            _ => Err(ConfigError::new(
                "DATABASE_URL must be a postgres:// URL or `memory`",
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: DatabaseUrl,
    pub max_connections: u32,
    pub bind_address: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub media_root: PathBuf,
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so tests need not touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::new("DATABASE_URL is not set"))?
            .parse()?;

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| ConfigError::new("JWT_SECRET is not set"))?;

        Ok(Self {
            database_url,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", &lookup, DEFAULT_MAX_CONNECTIONS)?,
            bind_address: parse_or(
                "BIND_ADDRESS",
                &lookup,
                SocketAddr::from_str(DEFAULT_BIND_ADDRESS)
                    .map_err(|_e| ConfigError::new("Invalid default bind address"))?,
            )?,
            jwt_secret,
            token_ttl: token_ttl(parse_or("TOKEN_TTL_HOURS", &lookup, DEFAULT_TOKEN_TTL_HOURS)?)?,
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT)),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", &lookup, DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

/// Token lifetime in whole hours; must be positive and representable.
fn token_ttl(hours: i64) -> Result<Duration, ConfigError> {
    Duration::try_hours(hours)
        .filter(|ttl| *ttl > Duration::zero())
        .ok_or_else(|| ConfigError::new("TOKEN_TTL_HOURS must be a positive number of hours"))
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_e| ConfigError::new(&format!("{key} has an invalid value"))),
        None => Ok(default),
    }
}
