//! Application configuration

use std::env;

use crate::routing::AliasMap;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,

    // Database (absent means the in-memory store)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Admin API
    pub admin_api_token: Option<String>,

    // Site resolution
    pub hostname_aliases: AliasMap,
    pub site_cache_ttl_secs: u64,

    // Mirroring
    pub mirror_max_nodes: usize,
    pub mirror_sync_timeout_ms: u64,
    pub mirror_single_pair: bool,

    // Logging
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            database_url: None,
            database_max_connections: 5,
            admin_api_token: None,
            hostname_aliases: AliasMap::default(),
            site_cache_ttl_secs: 300,
            mirror_max_nodes: 10_000,
            mirror_sync_timeout_ms: 30_000,
            mirror_single_pair: false,
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let admin_api_token = match env::var("ADMIN_API_TOKEN") {
            Ok(token) if token.len() < 32 => {
                return Err(ConfigError::WeakSecret(
                    "ADMIN_API_TOKEN must be at least 32 characters",
                ));
            }
            Ok(token) => Some(token),
            Err(_) => None,
        };

        let hostname_aliases = match env::var("HOSTNAME_ALIASES") {
            Ok(raw) => AliasMap::parse(&raw).map_err(ConfigError::InvalidAliases)?,
            Err(_) => AliasMap::default(),
        };

        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address),

            // Database
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,

            admin_api_token,

            // Site resolution
            hostname_aliases,
            site_cache_ttl_secs: parse_var("SITE_CACHE_TTL_SECS", defaults.site_cache_ttl_secs)?,

            // Mirroring
            mirror_max_nodes: parse_var("MIRROR_MAX_NODES", defaults.mirror_max_nodes)?,
            mirror_sync_timeout_ms: parse_var(
                "MIRROR_SYNC_TIMEOUT_MS",
                defaults.mirror_sync_timeout_ms,
            )?,
            mirror_single_pair: parse_var("MIRROR_SINGLE_PAIR", defaults.mirror_single_pair)?,

            // Logging
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
    #[error("Invalid HOSTNAME_ALIASES: {0}")]
    InvalidAliases(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for name in [
            "ADMIN_API_TOKEN",
            "HOSTNAME_ALIASES",
            "MIRROR_MAX_NODES",
            "MIRROR_SINGLE_PAIR",
            "DATABASE_URL",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    #[serial(env)]
    fn test_defaults() {
        clear();
        let config = Config::from_env().unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.mirror_max_nodes, 10_000);
        assert!(!config.mirror_single_pair);
        assert!(config.hostname_aliases.is_empty());
    }

    #[test]
    #[serial(env)]
    fn test_overrides() {
        clear();
        env::set_var("MIRROR_MAX_NODES", "50");
        env::set_var("MIRROR_SINGLE_PAIR", "true");
        env::set_var("HOSTNAME_ALIASES", "canon.example=alt.example");
        let config = Config::from_env().unwrap();
        assert_eq!(config.mirror_max_nodes, 50);
        assert!(config.mirror_single_pair);
        assert_eq!(config.hostname_aliases.canonical("alt.example"), "canon.example");
        clear();
    }

    #[test]
    #[serial(env)]
    fn test_rejects_bad_values() {
        clear();
        env::set_var("MIRROR_MAX_NODES", "lots");
        assert!(matches!(Config::from_env(), Err(ConfigError::Invalid("MIRROR_MAX_NODES"))));
        clear();

        env::set_var("ADMIN_API_TOKEN", "short");
        assert!(matches!(Config::from_env(), Err(ConfigError::WeakSecret(_))));
        clear();
    }
}
