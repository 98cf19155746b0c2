// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Default name of the variable carrying the runtime secret identifier.
pub const DEFAULT_SECRET_ENV_VAR: &str = "DATABASE_SECRET_ARN";

/// Handler configuration.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Invocation environment variable holding the secret identifier
    pub secret_env_var: String,
    /// Upper bound on establishing a database session
    pub connect_timeout: Duration,
    /// Upper bound on the query round trip
    pub query_timeout: Duration,
    /// Upper bound on one invocation, from secret retrieval to the query
    pub invocation_timeout: Duration,
    /// Database used when the secret omits `dbname`. `None` keeps `dbname`
    /// required.
    pub default_dbname: Option<String>,
    /// Cache retrieved secrets for this long. `None` retrieves per invocation.
    pub secret_cache_ttl: Option<Duration>,
    /// Port of the HTTP surface
    pub http_port: u16,
    /// JSON file of secrets for local runs
    pub secrets_file: Option<PathBuf>,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            secret_env_var: DEFAULT_SECRET_ENV_VAR.to_string(),
            connect_timeout: Duration::from_millis(5000),
            query_timeout: Duration::from_millis(10_000),
            invocation_timeout: Duration::from_millis(30_000),
            default_dbname: None,
            secret_cache_ttl: None,
            http_port: 3000,
            secrets_file: None,
        }
    }
}

impl HandlerConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `AURORA_SECRET_ENV_VAR` (default: `DATABASE_SECRET_ARN`)
    /// - `AURORA_CONNECT_TIMEOUT_MS` (default: 5000)
    /// - `AURORA_QUERY_TIMEOUT_MS` (default: 10000)
    /// - `AURORA_INVOCATION_TIMEOUT_MS` (default: 30000)
    /// - `AURORA_DEFAULT_DBNAME` (default: unset)
    /// - `AURORA_SECRET_CACHE_TTL_SECS` (default: 0, no cache)
    /// - `AURORA_HTTP_PORT` (default: 3000)
    /// - `AURORA_SECRETS_FILE` (default: unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let connect_timeout_ms: u64 = parse_var(
            "AURORA_CONNECT_TIMEOUT_MS",
            defaults.connect_timeout.as_millis() as u64,
        )?;
        let query_timeout_ms: u64 = parse_var(
            "AURORA_QUERY_TIMEOUT_MS",
            defaults.query_timeout.as_millis() as u64,
        )?;
        let invocation_timeout_ms: u64 = parse_var(
            "AURORA_INVOCATION_TIMEOUT_MS",
            defaults.invocation_timeout.as_millis() as u64,
        )?;
        for (key, value) in [
            ("AURORA_CONNECT_TIMEOUT_MS", connect_timeout_ms),
            ("AURORA_QUERY_TIMEOUT_MS", query_timeout_ms),
            ("AURORA_INVOCATION_TIMEOUT_MS", invocation_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        let cache_ttl_secs: u64 = parse_var("AURORA_SECRET_CACHE_TTL_SECS", 0)?;
        let http_port: u16 = parse_var("AURORA_HTTP_PORT", defaults.http_port)?;

        Ok(Self {
            secret_env_var: non_empty_var("AURORA_SECRET_ENV_VAR")
                .unwrap_or(defaults.secret_env_var),
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            query_timeout: Duration::from_millis(query_timeout_ms),
            invocation_timeout: Duration::from_millis(invocation_timeout_ms),
            default_dbname: non_empty_var("AURORA_DEFAULT_DBNAME"),
            secret_cache_ttl: (cache_ttl_secs > 0).then(|| Duration::from_secs(cache_ttl_secs)),
            http_port,
            secrets_file: non_empty_var("AURORA_SECRETS_FILE").map(PathBuf::from),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Serializes tests that modify environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 8] = [
        "AURORA_SECRET_ENV_VAR",
        "AURORA_CONNECT_TIMEOUT_MS",
        "AURORA_QUERY_TIMEOUT_MS",
        "AURORA_INVOCATION_TIMEOUT_MS",
        "AURORA_DEFAULT_DBNAME",
        "AURORA_SECRET_CACHE_TTL_SECS",
        "AURORA_HTTP_PORT",
        "AURORA_SECRETS_FILE",
    ];

    /// Sets env vars for a test and restores them afterwards
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            let saved = VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
            for key in VARS {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe { env::remove_var(key) };
            }
            Self { saved }
        }

        fn set(&self, key: &str, value: &str) {
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(key, v),
                        None => env::remove_var(key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::new();

        let config = HandlerConfig::from_env().unwrap();

        assert_eq!(config.secret_env_var, "DATABASE_SECRET_ARN");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.query_timeout, Duration::from_secs(10));
        assert_eq!(config.invocation_timeout, Duration::from_secs(30));
        assert!(config.default_dbname.is_none());
        assert!(config.secret_cache_ttl.is_none());
        assert_eq!(config.http_port, 3000);
        assert!(config.secrets_file.is_none());
    }

    #[test]
    fn test_custom_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::new();
        guard.set("AURORA_SECRET_ENV_VAR", "databaseSecretArn");
        guard.set("AURORA_CONNECT_TIMEOUT_MS", "250");
        guard.set("AURORA_INVOCATION_TIMEOUT_MS", "1500");
        guard.set("AURORA_DEFAULT_DBNAME", "postgres");
        guard.set("AURORA_SECRET_CACHE_TTL_SECS", "60");
        guard.set("AURORA_SECRETS_FILE", "/tmp/secrets.json");

        let config = HandlerConfig::from_env().unwrap();

        assert_eq!(config.secret_env_var, "databaseSecretArn");
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.invocation_timeout, Duration::from_millis(1500));
        assert_eq!(config.default_dbname.as_deref(), Some("postgres"));
        assert_eq!(config.secret_cache_ttl, Some(Duration::from_secs(60)));
        assert_eq!(config.secrets_file, Some(PathBuf::from("/tmp/secrets.json")));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::new();
        guard.set("AURORA_SECRET_ENV_VAR", "  ");
        guard.set("AURORA_DEFAULT_DBNAME", "");

        let config = HandlerConfig::from_env().unwrap();

        assert_eq!(config.secret_env_var, DEFAULT_SECRET_ENV_VAR);
        assert!(config.default_dbname.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let guard = EnvGuard::new();
        guard.set("AURORA_HTTP_PORT", "70000");

        let err = HandlerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("AURORA_HTTP_PORT"));

        guard.set("AURORA_HTTP_PORT", "3000");
        guard.set("AURORA_QUERY_TIMEOUT_MS", "0");
        assert!(matches!(
            HandlerConfig::from_env(),
            Err(ConfigError::Invalid { key: "AURORA_QUERY_TIMEOUT_MS", .. })
        ));

        guard.set("AURORA_QUERY_TIMEOUT_MS", "100");
        guard.set("AURORA_INVOCATION_TIMEOUT_MS", "0");
        assert!(matches!(
            HandlerConfig::from_env(),
            Err(ConfigError::Invalid { key: "AURORA_INVOCATION_TIMEOUT_MS", .. })
        ));
    }
}
