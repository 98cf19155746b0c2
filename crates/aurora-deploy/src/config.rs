// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::path::PathBuf;

use crate::resources::{AutoPause, ScalingConfig};

/// Stack configuration.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Stack name, used as prefix for secret names
    pub stack_name: String,
    /// Region resources are planned in
    pub region: String,
    /// Network address range
    pub vpc_cidr: String,
    /// Database protocol port opened on the access rule and the cluster
    pub db_port: u16,
    /// Username seeded into the generated credentials
    pub db_username: String,
    /// Default database created on the cluster
    pub db_name: String,
    /// Cluster capacity bounds and auto-pause policy
    pub scaling: ScalingConfig,
    /// Endpoint host reported by offline emulators
    pub placeholder_host: String,
    /// Host substituted for the placeholder in the runtime secret
    pub override_host: String,
    /// Where to write the planned secrets as JSON, for local handler runs
    pub secrets_export: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            stack_name: "AuroraServerlessV2Stack".to_string(),
            region: "us-east-1".to_string(),
            vpc_cidr: "10.0.0.0/16".to_string(),
            db_port: 5432,
            db_username: "serverless".to_string(),
            db_name: "serverless".to_string(),
            scaling: ScalingConfig::default(),
            placeholder_host: "localhost.localstack.cloud".to_string(),
            override_host: "host.docker.internal".to_string(),
            secrets_export: None,
        }
    }
}

impl DeployConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `AURORA_STACK_NAME` (default: `AuroraServerlessV2Stack`)
    /// - `AURORA_REGION` (default: `us-east-1`)
    /// - `AURORA_VPC_CIDR` (default: `10.0.0.0/16`)
    /// - `AURORA_DB_PORT` (default: 5432)
    /// - `AURORA_DB_USERNAME` (default: `serverless`)
    /// - `AURORA_DB_NAME` (default: `serverless`)
    /// - `AURORA_MIN_CAPACITY` (default: 2)
    /// - `AURORA_MAX_CAPACITY` (default: 16)
    /// - `AURORA_AUTO_PAUSE_MINUTES` (default: 0, auto-pause disabled)
    /// - `AURORA_PLACEHOLDER_HOST` (default: `localhost.localstack.cloud`)
    /// - `AURORA_OVERRIDE_HOST` (default: `host.docker.internal`)
    /// - `AURORA_SECRETS_EXPORT` (default: unset)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let db_port: u16 = parse_var("AURORA_DB_PORT", defaults.db_port, "must be a valid port")?;
        if db_port == 0 {
            return Err(ConfigError::Invalid {
                key: "AURORA_DB_PORT",
                reason: "must be a valid port".to_string(),
            });
        }

        let min_capacity: f64 = parse_var(
            "AURORA_MIN_CAPACITY",
            defaults.scaling.min_capacity,
            "must be a number of capacity units",
        )?;
        let max_capacity: f64 = parse_var(
            "AURORA_MAX_CAPACITY",
            defaults.scaling.max_capacity,
            "must be a number of capacity units",
        )?;
        let auto_pause_minutes: u32 = parse_var(
            "AURORA_AUTO_PAUSE_MINUTES",
            0,
            "must be a whole number of minutes",
        )?;

        let scaling = ScalingConfig {
            min_capacity,
            max_capacity,
            auto_pause: AutoPause::from_minutes(auto_pause_minutes),
        };
        if scaling.validate().is_err() {
            return Err(ConfigError::Invalid {
                key: "AURORA_MIN_CAPACITY/AURORA_MAX_CAPACITY",
                reason: "must satisfy 0.5 <= min <= max <= 128".to_string(),
            });
        }

        let placeholder_host = string_var("AURORA_PLACEHOLDER_HOST", defaults.placeholder_host);
        let override_host = string_var("AURORA_OVERRIDE_HOST", defaults.override_host);
        if placeholder_host == override_host {
            return Err(ConfigError::Invalid {
                key: "AURORA_OVERRIDE_HOST",
                reason: "must differ from AURORA_PLACEHOLDER_HOST".to_string(),
            });
        }

        Ok(Self {
            stack_name: string_var("AURORA_STACK_NAME", defaults.stack_name),
            region: string_var("AURORA_REGION", defaults.region),
            vpc_cidr: string_var("AURORA_VPC_CIDR", defaults.vpc_cidr),
            db_port,
            db_username: string_var("AURORA_DB_USERNAME", defaults.db_username),
            db_name: string_var("AURORA_DB_NAME", defaults.db_name),
            scaling,
            placeholder_host,
            override_host,
            secrets_export: std::env::var("AURORA_SECRETS_EXPORT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn string_var(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn parse_var<T: std::str::FromStr>(
    key: &'static str,
    default: T,
    reason: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key,
                reason: reason.to_string(),
            }),
        Err(_) => Ok(default),
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

    const VARS: [&str; 12] = [
        "AURORA_STACK_NAME",
        "AURORA_REGION",
        "AURORA_VPC_CIDR",
        "AURORA_DB_PORT",
        "AURORA_DB_USERNAME",
        "AURORA_DB_NAME",
        "AURORA_MIN_CAPACITY",
        "AURORA_MAX_CAPACITY",
        "AURORA_AUTO_PAUSE_MINUTES",
        "AURORA_PLACEHOLDER_HOST",
        "AURORA_OVERRIDE_HOST",
        "AURORA_SECRETS_EXPORT",
    ];

    /// Sets env vars for a test and restores them afterwards
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn clean() -> Self {
            let mut guard = Self { vars: Vec::new() };
            for key in VARS {
                guard.remove(key);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::set_var(key, value) };
        }

        fn remove(&mut self, key: &str) {
            let old = env::var(key).ok();
            self.vars.push((key.to_string(), old));
            // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
            unsafe { env::remove_var(key) };
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.drain(..).rev() {
                // SAFETY: Tests are serialized via ENV_MUTEX, so no concurrent access
                unsafe {
                    match value {
                        Some(v) => env::set_var(&key, v),
                        None => env::remove_var(&key),
                    }
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let _guard = EnvGuard::clean();

        let config = DeployConfig::from_env().unwrap();

        assert_eq!(config.stack_name, "AuroraServerlessV2Stack");
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.db_username, "serverless");
        assert_eq!(config.scaling.min_capacity, 2.0);
        assert_eq!(config.scaling.max_capacity, 16.0);
        assert_eq!(config.scaling.auto_pause, AutoPause::Disabled);
        assert_eq!(config.override_host, "host.docker.internal");
        assert!(config.secrets_export.is_none());
    }

    #[test]
    fn test_auto_pause_minutes_enable_pause() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("AURORA_AUTO_PAUSE_MINUTES", "5");

        let config = DeployConfig::from_env().unwrap();

        assert_eq!(
            config.scaling.auto_pause,
            AutoPause::AfterMinutes { minutes: 5 }
        );
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("AURORA_MIN_CAPACITY", "32");
        guard.set("AURORA_MAX_CAPACITY", "4");

        assert!(matches!(
            DeployConfig::from_env(),
            Err(ConfigError::Invalid {
                key: "AURORA_MIN_CAPACITY/AURORA_MAX_CAPACITY",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("AURORA_DB_PORT", "not-a-port");

        let err = DeployConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("AURORA_DB_PORT"));
    }

    #[test]
    fn test_override_must_differ_from_placeholder() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("AURORA_PLACEHOLDER_HOST", "localhost");
        guard.set("AURORA_OVERRIDE_HOST", "localhost");

        assert!(matches!(
            DeployConfig::from_env(),
            Err(ConfigError::Invalid {
                key: "AURORA_OVERRIDE_HOST",
                ..
            })
        ));
    }

    #[test]
    fn test_custom_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut guard = EnvGuard::clean();
        guard.set("AURORA_STACK_NAME", "Staging");
        guard.set("AURORA_DB_NAME", "orders");
        guard.set("AURORA_SECRETS_EXPORT", "/tmp/secrets.json");

        let config = DeployConfig::from_env().unwrap();

        assert_eq!(config.stack_name, "Staging");
        assert_eq!(config.db_name, "orders");
        assert_eq!(
            config.secrets_export,
            Some(PathBuf::from("/tmp/secrets.json"))
        );
    }
}
