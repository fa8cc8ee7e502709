use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::session::DEFAULT_DEBOUNCE;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid value: {value}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} must be set when IDENTITY_PROVIDER=firebase")]
    Missing(&'static str),
    #[error("unknown identity provider `{0}`; expected `memory` or `firebase`")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSettings {
    InMemory,
    Firebase {
        api_key: String,
        /// Overrides the Identity Toolkit endpoint, e.g. for the local emulator.
        base_url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub provider: ProviderSettings,
    pub sign_in_debounce: Duration,
    /// Peers allowed to report the client address in forwarding headers.
    pub trusted_proxies: Vec<IpAddr>,
}

impl AppConfig {
    /// Reads configuration from the process environment, loading `.env` first.
    ///
    /// - `TALENT_VAULT_ADDR` listen address (default `0.0.0.0:3000`)
    /// - `IDENTITY_PROVIDER` `memory` or `firebase` (default `memory`)
    /// - `FIREBASE_API_KEY` required for `firebase`
    /// - `FIREBASE_BASE_URL` optional endpoint override
    /// - `SIGN_IN_DEBOUNCE_MS` sign-in password debounce (default 300)
    /// - `TRUSTED_PROXIES` comma-separated proxy addresses (default none)
    #[tracing::instrument(name = "load_config")]
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        let config = Self::from_lookup(|var| std::env::var(var).ok())?;

        tracing::debug!(
            addr = %config.addr,
            debounce_ms = config.sign_in_debounce.as_millis() as u64,
            trusted_proxies = config.trusted_proxies.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let addr_raw = get("TALENT_VAULT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "TALENT_VAULT_ADDR",
            value: addr_raw.clone(),
        })?;

        let provider = match get("IDENTITY_PROVIDER").as_deref() {
            None | Some("memory") => ProviderSettings::InMemory,
            Some("firebase") => ProviderSettings::Firebase {
                api_key: get("FIREBASE_API_KEY")
                    .ok_or(ConfigError::Missing("FIREBASE_API_KEY"))?,
                base_url: get("FIREBASE_BASE_URL"),
            },
            Some(other) => return Err(ConfigError::UnknownProvider(other.to_string())),
        };

        let sign_in_debounce = match get("SIGN_IN_DEBOUNCE_MS") {
            None => DEFAULT_DEBOUNCE,
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    var: "SIGN_IN_DEBOUNCE_MS",
                    value: raw,
                })?,
        };

        let trusted_proxies = match get("TRUSTED_PROXIES") {
            None => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| {
                    entry.parse().map_err(|_| ConfigError::Invalid {
                        var: "TRUSTED_PROXIES",
                        value: entry.to_string(),
                    })
                })
                .collect::<Result<_, _>>()?,
        };

        Ok(Self {
            addr,
            provider,
            sign_in_debounce,
            trusted_proxies,
        })
    }
}
