// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the configuration structs built
//! from them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory of the vault store | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `VAULT_JWT_SECRET` | HS256 secret verifying bearer tokens | unset (development mode) |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `VAULT_STORE_URL` | Base URL of the vault store (client side) | `http://127.0.0.1:8080` |
//! | `TRANSFER_MODE` | Local-storage delivery (`direct` or `mailbox`) | `direct` |
//! | `MAILBOX_KEY` | Pending-write key (`url` or `host`) | `url` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Environment variable name for the vault store data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "./data";

pub const HOST_ENV: &str = "HOST";
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const PORT_ENV: &str = "PORT";
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable holding the HS256 secret for bearer tokens.
///
/// When unset, tokens are decoded without signature verification. Only
/// suitable for local development.
pub const JWT_SECRET_ENV: &str = "VAULT_JWT_SECRET";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const STORE_URL_ENV: &str = "VAULT_STORE_URL";
pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:8080";

pub const TRANSFER_MODE_ENV: &str = "TRANSFER_MODE";
pub const MAILBOX_KEY_ENV: &str = "MAILBOX_KEY";

/// Timeout applied to every vault store request made by the client.
pub const STORE_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How long a receipt listing stays cached in the client.
pub const LISTING_CACHE_TTL: Duration = Duration::from_secs(60);

/// Maximum number of receipt listings cached in the client.
pub const LISTING_CACHE_CAPACITY: usize = 64;

/// Configuration errors raised at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}: expected {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

fn invalid(name: &'static str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        expected,
    }
}

/// Read an environment variable, treating empty values as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Selectors
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(invalid(LOG_FORMAT_ENV, s, "json or pretty")),
        }
    }
}

/// How local storage reaches the page agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    /// Request/response over the extension messaging channel.
    #[default]
    Direct,
    /// Pending write stored in the extension key-value store.
    Mailbox,
}

impl FromStr for TransferMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "mailbox" => Ok(Self::Mailbox),
            _ => Err(invalid(TRANSFER_MODE_ENV, s, "direct or mailbox")),
        }
    }
}

/// Which part of the tab URL keys a pending write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailboxKey {
    /// The full tab URL.
    #[default]
    Url,
    /// The tab's hostname, matching any page on that host.
    Host,
}

impl FromStr for MailboxKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "url" => Ok(Self::Url),
            "host" => Ok(Self::Host),
            _ => Err(invalid(MAILBOX_KEY_ENV, s, "url or host")),
        }
    }
}

fn parse_env<T: FromStr<Err = ConfigError> + Default>(name: &str) -> Result<T, ConfigError> {
    env_var(name).map_or_else(|| Ok(T::default()), |v| v.parse())
}

// =============================================================================
// Server
// =============================================================================

/// Vault store server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: Option<String>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env_var(PORT_ENV) {
            Some(v) => v.parse().map_err(|_| invalid(PORT_ENV, &v, "a port number"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            data_dir: env_var(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            host: env_var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            jwt_secret: env_var(JWT_SECRET_ENV),
            log_format: parse_env(LOG_FORMAT_ENV)?,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| invalid(HOST_ENV, &self.host, "an IP address"))
    }
}

// =============================================================================
// Client
// =============================================================================

/// Coordinator-side configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub store_url: Url,
    pub transfer_mode: TransferMode,
    pub mailbox_key: MailboxKey,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = env_var(STORE_URL_ENV).unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        let store_url = Url::parse(&raw).map_err(|_| invalid(STORE_URL_ENV, &raw, "a URL"))?;

        Ok(Self {
            store_url,
            transfer_mode: parse_env(TRANSFER_MODE_ENV)?,
            mailbox_key: parse_env(MAILBOX_KEY_ENV)?,
        })
    }
}
