use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::payment::PaymentOutcome;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ticketing";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub payment_outcome: PaymentOutcome,
    pub allowed_origins: String,
    pub production: bool,
    pub admin: Option<AdminAccount>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Unparseable values are
    /// logged and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_TOKEN")) {
            (Some(username), Some(token)) if !username.trim().is_empty() && !token.is_empty() => {
                Some(AdminAccount {
                    username: username.trim().to_string(),
                    token,
                })
            }
            (None, None) => None,
            _ => {
                tracing::warn!("Config: ADMIN_USERNAME and ADMIN_TOKEN must be set together, ignoring");
                None
            }
        };

        Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            bind_addr: parse_or(&lookup, "BIND_ADDR", default_bind_addr()),
            storage: parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres),
            payment_outcome: parse_or(&lookup, "PAYMENT_SIMULATION", PaymentOutcome::Approve),
            allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            admin,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Config: Invalid {} '{}': {}, using default", key, raw, e);
                default
            }
        },
        None => default,
    }
}
