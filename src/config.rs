//! Service configuration loaded from environment variables.
//!
//! ## Optional
//! - `STORE_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `STORE_DELIVERY_FEE` - Flat delivery fee in rupees (default: 500)
//! - `STORE_SEED_DEFAULTS` - Seed the default catalogue into an empty store (default: true)
//! - `NATS_URL` - Publish collection changes to NATS when set

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

use crate::pricing::DELIVERY_FEE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub host: IpAddr,
    pub port: u16,
    pub delivery_fee: i64,
    pub seed_defaults: bool,
    pub nats_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { host: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 8083, delivery_fee: DELIVERY_FEE, seed_defaults: true, nats_url: None }
    }
}

impl StoreConfig {
    /// Reads the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let delivery_fee = parse_or(&lookup, "STORE_DELIVERY_FEE", defaults.delivery_fee)?;
        if delivery_fee < 0 {
            return Err(ConfigError::InvalidEnvVar("STORE_DELIVERY_FEE".into(), "must not be negative".into()));
        }
        Ok(Self {
            host: parse_or(&lookup, "STORE_HOST", defaults.host)?,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            delivery_fee,
            seed_defaults: match lookup("STORE_SEED_DEFAULTS").as_deref().map(str::trim) {
                None | Some("") => defaults.seed_defaults,
                Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
                Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
                Some(v) => return Err(ConfigError::InvalidEnvVar("STORE_SEED_DEFAULTS".into(), format!("expected true or false, got {v}"))),
            },
            nats_url: lookup("NATS_URL").filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        StoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8083");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[("PORT", "9000"), ("STORE_HOST", "127.0.0.1"), ("STORE_DELIVERY_FEE", "750"), ("STORE_SEED_DEFAULTS", "false"), ("NATS_URL", "nats://localhost:4222")]).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.delivery_fee, 750);
        assert!(!config.seed_defaults);
        assert_eq!(config.nats_url.as_deref(), Some("nats://localhost:4222"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(load(&[("PORT", "eighty")]), Err(ConfigError::InvalidEnvVar(key, _)) if key == "PORT"));
        assert!(load(&[("STORE_DELIVERY_FEE", "-1")]).is_err());
        assert!(load(&[("STORE_SEED_DEFAULTS", "maybe")]).is_err());
    }
}
