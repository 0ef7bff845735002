//! Server configuration.
//!
//! Values are resolved at startup in three tiers: CLI flags override
//! environment variables (`KANBAN_*`, `JWT_SECRET`) override built-in
//! defaults. The JWT signing secret has no default on purpose; starting
//! without one is a fatal error.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::net::SocketAddr;

/// Default SQLite database path.
pub const DEFAULT_DATABASE_PATH: &str = "kanban.db";

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8700";

/// Default token lifetime in hours (7 days).
pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 168;

/// Default bcrypt work factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SQLite database path (default: kanban.db).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Address the HTTP server binds to (default: 127.0.0.1:8700).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Secret used to sign and verify JWTs. Required.
    #[serde(default)]
    pub jwt_secret: String,

    /// Token lifetime in hours (default: 168).
    #[serde(default = "default_jwt_expiry_hours")]
    pub jwt_expiry_hours: i64,

    /// bcrypt work factor for password hashing (default: 10).
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            jwt_secret: String::new(),
            jwt_expiry_hours: default_jwt_expiry_hours(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Config {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset. CLI overrides are applied afterwards in `main`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("KANBAN_DATABASE") {
            config.database_path = path;
        }
        if let Ok(addr) = std::env::var("KANBAN_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.jwt_secret = secret;
        }
        if let Ok(hours) = std::env::var("KANBAN_JWT_EXPIRY_HOURS") {
            config.jwt_expiry_hours = hours
                .parse()
                .context("KANBAN_JWT_EXPIRY_HOURS must be an integer")?;
        }
        if let Ok(cost) = std::env::var("KANBAN_BCRYPT_COST") {
            config.bcrypt_cost = cost
                .parse()
                .context("KANBAN_BCRYPT_COST must be an integer")?;
        }

        Ok(config)
    }

    /// Validate the resolved configuration. Called once at startup; any
    /// failure here aborts the server before it binds a socket.
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.is_empty() {
            bail!("JWT_SECRET is not set; refusing to start without a signing secret");
        }
        if self.jwt_secret.len() < 16 {
            bail!("JWT_SECRET must be at least 16 characters");
        }
        self.socket_addr()?;
        if self.jwt_expiry_hours <= 0 {
            bail!("jwt_expiry_hours must be positive");
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            bail!("bcrypt_cost must be between 4 and 31");
        }
        Ok(())
    }

    /// Parse the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("invalid bind address '{}'", self.bind_addr))
    }
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_jwt_expiry_hours() -> i64 {
    DEFAULT_JWT_EXPIRY_HOURS
}

fn default_bcrypt_cost() -> u32 {
    DEFAULT_BCRYPT_COST
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: Config =
            serde_json::from_value(json!({ "jwt_secret": "0123456789abcdef" })).unwrap();
        assert_eq!(config.database_path, "kanban.db");
        assert_eq!(config.bind_addr, "127.0.0.1:8700");
        assert_eq!(config.jwt_expiry_hours, 168);
        assert_eq!(config.bcrypt_cost, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = Config {
            jwt_secret: "short".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_bind_addr_rejected() {
        let config = Config {
            jwt_secret: "0123456789abcdef".to_string(),
            bind_addr: "not-an-address".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bcrypt_cost_bounds() {
        let config = Config {
            jwt_secret: "0123456789abcdef".to_string(),
            bcrypt_cost: 2,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
