//! Configuration Module
//!
//! Handles loading node configuration from environment variables.

use std::env;

use crate::cache::CacheSettings;
use crate::cluster::NodeId;

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of this cluster member
    pub node_id: NodeId,
    /// HTTP admin server port
    pub server_port: u16,
    /// Expiration sweep interval in seconds
    pub cleanup_interval: u64,
    /// Advisory maximum size applied to every cache
    pub default_max_size: i64,
    /// Time to live in milliseconds for every write, negative = never expire
    pub default_max_lifetime_ms: i64,
    /// Caches this node creates at startup; empty = every registered name
    pub cache_names: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NODE_ID` - Cluster member id (default: node-1)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `DEFAULT_MAX_SIZE` - Advisory cache size (default: -1)
    /// - `DEFAULT_MAX_LIFETIME_MS` - Entry time to live (default: -1)
    /// - `CACHE_NAMES` - Comma-separated cache names (default: registry names)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            node_id: env::var("NODE_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(NodeId::new)
                .unwrap_or(defaults.node_id),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            default_max_size: parse_var("DEFAULT_MAX_SIZE").unwrap_or(defaults.default_max_size),
            default_max_lifetime_ms: parse_var("DEFAULT_MAX_LIFETIME_MS")
                .unwrap_or(defaults.default_max_lifetime_ms),
            cache_names: env::var("CACHE_NAMES")
                .map(|v| parse_names(&v))
                .unwrap_or_default(),
        }
    }

    /// Settings handed to every cache this node creates.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings::new(self.default_max_size, self.default_max_lifetime_ms, true)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: NodeId::new("node-1"),
            server_port: 3000,
            cleanup_interval: 1,
            default_max_size: -1,
            default_max_lifetime_ms: -1,
            cache_names: Vec::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn parse_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.node_id, NodeId::new("node-1"));
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.default_max_lifetime_ms, -1);
        assert!(config.cache_names.is_empty());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("NODE_ID");
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("DEFAULT_MAX_SIZE");
        env::remove_var("DEFAULT_MAX_LIFETIME_MS");
        env::remove_var("CACHE_NAMES");

        let config = Config::from_env();
        assert_eq!(config.node_id, NodeId::new("node-1"));
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.default_max_size, -1);
        assert!(config.cache_names.is_empty());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            parse_names(" Roster, Routing Users Cache ,,"),
            vec!["Roster".to_string(), "Routing Users Cache".to_string()]
        );
    }

    #[test]
    fn test_cache_settings() {
        let config = Config {
            default_max_size: 50,
            default_max_lifetime_ms: 50_000,
            ..Config::default()
        };
        assert_eq!(config.cache_settings(), CacheSettings::new(50, 50_000, true));
    }
}
