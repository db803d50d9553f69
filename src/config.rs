// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `ledger.redb` | `./data` |
//! | `SESSION_TOKEN_SECRET` | HS256 secret for session tokens | Required |
//! | `PAYSTACK_SECRET_KEY` | Paystack API key, also the webhook HMAC key | Required |
//! | `PAYSTACK_BASE_URL` | Paystack API base URL | `https://api.paystack.co` |
//! | `PROVIDER_TIMEOUT_SECS` | Outbound provider call timeout | `30` |
//! | `API_KEY_ENV_TAG` | `env` segment of issued API keys | `live` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::HashingParams;
use crate::providers::paystack::DEFAULT_BASE_URL;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const SESSION_TOKEN_SECRET_ENV: &str = "SESSION_TOKEN_SECRET";
pub const PAYSTACK_SECRET_KEY_ENV: &str = "PAYSTACK_SECRET_KEY";
pub const PAYSTACK_BASE_URL_ENV: &str = "PAYSTACK_BASE_URL";
pub const PROVIDER_TIMEOUT_SECS_ENV: &str = "PROVIDER_TIMEOUT_SECS";
pub const API_KEY_ENV_TAG_ENV: &str = "API_KEY_ENV_TAG";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_KEY_ENV_TAG: &str = "live";

/// File name of the ledger database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone)]
pub struct LedgerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub data_dir: PathBuf,
    pub session_token_secret: String,
    pub paystack_secret_key: String,
    pub paystack_base_url: String,
    pub provider_timeout: Duration,
    pub api_key_env_tag: String,
    pub hashing: HashingParams,
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("session_token_secret", &"<redacted>")
            .field("paystack_secret_key", &"<redacted>")
            .field("paystack_base_url", &self.paystack_base_url)
            .field("provider_timeout", &self.provider_timeout)
            .field("api_key_env_tag", &self.api_key_env_tag)
            .field("hashing", &self.hashing)
            .finish()
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let host = host
            .parse::<IpAddr>()
            .map_err(|e| invalid(HOST_ENV, e))?;
        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| invalid(PORT_ENV, e))?,
            None => DEFAULT_PORT,
        };
        let provider_timeout_secs = match get(PROVIDER_TIMEOUT_SECS_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| invalid(PROVIDER_TIMEOUT_SECS_ENV, e))?,
            None => DEFAULT_PROVIDER_TIMEOUT_SECS,
        };
        if provider_timeout_secs == 0 {
            return Err(invalid(PROVIDER_TIMEOUT_SECS_ENV, "must be at least 1"));
        }

        let api_key_env_tag =
            get(API_KEY_ENV_TAG_ENV).unwrap_or_else(|| DEFAULT_API_KEY_ENV_TAG.to_string());
        if !api_key_env_tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid(
                API_KEY_ENV_TAG_ENV,
                "only ASCII letters and digits are allowed",
            ));
        }

        let paystack_base_url =
            get(PAYSTACK_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        url::Url::parse(&paystack_base_url).map_err(|e| invalid(PAYSTACK_BASE_URL_ENV, e))?;

        Ok(Self {
            host,
            port,
            data_dir: get(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            session_token_secret: required(SESSION_TOKEN_SECRET_ENV)?,
            paystack_secret_key: required(PAYSTACK_SECRET_KEY_ENV)?,
            paystack_base_url,
            provider_timeout: Duration::from_secs(provider_timeout_secs),
            api_key_env_tag,
            hashing: HashingParams::production(),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn invalid(name: &'static str, reason: impl fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}
