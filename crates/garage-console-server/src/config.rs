//! Server configuration for the Garage console.
//!
//! Loaded once at startup from environment variables. Secrets (cipher key,
//! session secret, admin password) are required and validated here, so a
//! misconfigured process refuses to start instead of failing on the first
//! request.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use garage_console_core::crypto::CipherKey;
use garage_console_core::error::CipherError;
use garage_console_core::forward::DEFAULT_UPSTREAM_TIMEOUT;
use garage_console_core::session::{DEFAULT_SESSION_TTL_HOURS, MIN_SECRET_LEN};

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 3001);

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required environment variable {var}")]
    Missing { var: &'static str },

    /// A variable is set but cannot be used.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    /// The cipher key is not 32 bytes or 64 hex characters.
    #[error("invalid ENCRYPTION_KEY: {0}")]
    Key(#[source] CipherError),
}

/// Supported cluster registry backends.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// PostgreSQL persistent storage.
    Postgres { url: String },
}

impl StorageBackendType {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }
}

impl fmt::Debug for StorageBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Log level filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Cluster registry backend.
    pub storage_backend: StorageBackendType,
    /// Process-wide key for the token cipher.
    pub encryption_key: CipherKey,
    /// Session signing secret, at least [`MIN_SECRET_LEN`] bytes.
    pub session_secret: String,
    /// Password accepted by `POST /auth/login`.
    pub admin_password: String,
    pub session_ttl: chrono::Duration,
    pub upstream_timeout: Duration,
    /// Whether to skip `mlock` (for development without `CAP_IPC_LOCK`).
    pub disable_mlock: bool,
    /// Browser origin allowed by CORS. `None` allows any origin.
    pub cors_origin: Option<HeaderValue>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `CONSOLE_BIND_ADDR`: full bind address (overrides `PORT`, default `127.0.0.1:3001`)
    /// - `PORT`: port to bind on `0.0.0.0`
    /// - `CONSOLE_LOG_LEVEL`: log filter (default `info`)
    /// - `ENCRYPTION_KEY`: 32 raw bytes or 64 hex characters (required)
    /// - `JWT_SECRET`: session signing secret, at least 32 bytes (required)
    /// - `ADMIN_PASSWORD`: console login password (required)
    /// - `CONSOLE_SESSION_TTL_HOURS`: session lifetime (default `24`)
    /// - `CONSOLE_UPSTREAM_TIMEOUT_SECS`: per-call upstream timeout (default `30`)
    /// - `CONSOLE_STORAGE`: `memory` or `postgres` (default `memory`)
    /// - `DATABASE_URL`: PostgreSQL connection string (required for `postgres`)
    /// - `CONSOLE_DISABLE_MLOCK`: skip `mlockall` for dev environments (default `false`)
    /// - `CONSOLE_CORS_ORIGIN`: allowed browser origin (default: any)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or any
    /// variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        // Priority: CONSOLE_BIND_ADDR > PORT > default.
        let bind_addr = if let Some(addr) = var("CONSOLE_BIND_ADDR") {
            addr.parse().map_err(|e| ConfigError::Invalid {
                var: "CONSOLE_BIND_ADDR",
                reason: format!("{e}"),
            })?
        } else if let Some(port) = var("PORT") {
            let port: u16 = parse_number("PORT", &port)?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(DEFAULT_BIND_ADDR)
        };

        let log_level = var("CONSOLE_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let storage_backend = match var("CONSOLE_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendType::Memory,
            "postgres" | "postgresql" => StorageBackendType::Postgres {
                url: var("DATABASE_URL").ok_or(ConfigError::Missing {
                    var: "DATABASE_URL",
                })?,
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "CONSOLE_STORAGE",
                    reason: format!("unknown backend '{other}', expected memory or postgres"),
                });
            }
        };

        let encryption_key = var("ENCRYPTION_KEY")
            .ok_or(ConfigError::Missing {
                var: "ENCRYPTION_KEY",
            })
            .and_then(|raw| CipherKey::from_config(&raw).map_err(ConfigError::Key))?;

        let session_secret = var("JWT_SECRET").ok_or(ConfigError::Missing { var: "JWT_SECRET" })?;
        if session_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                reason: format!(
                    "must be at least {MIN_SECRET_LEN} bytes, got {}",
                    session_secret.len()
                ),
            });
        }

        let admin_password = var("ADMIN_PASSWORD").ok_or(ConfigError::Missing {
            var: "ADMIN_PASSWORD",
        })?;

        let ttl_hours = match var("CONSOLE_SESSION_TTL_HOURS") {
            Some(v) => parse_number::<i64>("CONSOLE_SESSION_TTL_HOURS", &v)?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "CONSOLE_SESSION_TTL_HOURS",
                reason: "must be positive".to_owned(),
            });
        }
        let session_ttl =
            chrono::Duration::try_hours(ttl_hours).ok_or_else(|| ConfigError::Invalid {
                var: "CONSOLE_SESSION_TTL_HOURS",
                reason: "out of range".to_owned(),
            })?;

        let upstream_timeout = match var("CONSOLE_UPSTREAM_TIMEOUT_SECS") {
            Some(v) => match parse_number::<u64>("CONSOLE_UPSTREAM_TIMEOUT_SECS", &v)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        var: "CONSOLE_UPSTREAM_TIMEOUT_SECS",
                        reason: "must be positive".to_owned(),
                    });
                }
                secs => Duration::from_secs(secs),
            },
            None => DEFAULT_UPSTREAM_TIMEOUT,
        };

        let disable_mlock = var("CONSOLE_DISABLE_MLOCK").is_some_and(|v| v == "true" || v == "1");

        let cors_origin = var("CONSOLE_CORS_ORIGIN")
            .map(|origin| {
                HeaderValue::from_str(&origin).map_err(|e| ConfigError::Invalid {
                    var: "CONSOLE_CORS_ORIGIN",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            bind_addr,
            log_level,
            storage_backend,
            encryption_key,
            session_secret,
            admin_password,
            session_ttl,
            upstream_timeout,
            disable_mlock,
            cors_origin,
        })
    }
}

fn parse_number<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("storage_backend", &self.storage_backend)
            .field("encryption_key", &"[REDACTED]")
            .field("session_secret", &"[REDACTED]")
            .field("admin_password", &"[REDACTED]")
            .field("session_ttl", &self.session_ttl)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("disable_mlock", &self.disable_mlock)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    const SECRET: &str = "an-adequately-long-session-secret-0123";

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let mut env: HashMap<String, String> = [
            ("ENCRYPTION_KEY", KEY_HEX),
            ("JWT_SECRET", SECRET),
            ("ADMIN_PASSWORD", "hunter2"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        for (k, v) in pairs {
            env.insert((*k).to_owned(), (*v).to_owned());
        }
        ServerConfig::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:3001".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.storage_backend, StorageBackendType::Memory);
        assert_eq!(config.session_ttl, chrono::Duration::hours(24));
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
        assert!(!config.disable_mlock);
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn port_binds_all_interfaces() {
        let config = load(&[("PORT", "8080")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn bind_addr_overrides_port() {
        let config = load(&[("PORT", "8080"), ("CONSOLE_BIND_ADDR", "10.0.0.5:9000")]).unwrap();
        assert_eq!(config.bind_addr, "10.0.0.5:9000".parse().unwrap());
    }

    #[test]
    fn malformed_bind_addr_is_rejected() {
        assert!(matches!(
            load(&[("CONSOLE_BIND_ADDR", "localhost")]),
            Err(ConfigError::Invalid { var: "CONSOLE_BIND_ADDR", .. })
        ));
    }

    #[test]
    fn missing_secrets_are_fatal() {
        for var in ["ENCRYPTION_KEY", "JWT_SECRET", "ADMIN_PASSWORD"] {
            let result = load(&[(var, "")]);
            assert!(
                matches!(result, Err(ConfigError::Missing { var: v }) if v == var),
                "{var}"
            );
        }
    }

    #[test]
    fn short_key_is_rejected() {
        assert!(matches!(
            load(&[("ENCRYPTION_KEY", "too-short")]),
            Err(ConfigError::Key(CipherError::InvalidKeyLength { .. }))
        ));
    }

    #[test]
    fn raw_32_byte_key_is_accepted() {
        assert!(load(&[("ENCRYPTION_KEY", "0123456789abcdef0123456789ABCDEF")]).is_ok());
    }

    #[test]
    fn short_session_secret_is_rejected() {
        assert!(matches!(
            load(&[("JWT_SECRET", "short")]),
            Err(ConfigError::Invalid { var: "JWT_SECRET", .. })
        ));
    }

    #[test]
    fn postgres_requires_database_url() {
        assert!(matches!(
            load(&[("CONSOLE_STORAGE", "postgres")]),
            Err(ConfigError::Missing { var: "DATABASE_URL" })
        ));

        let config = load(&[
            ("CONSOLE_STORAGE", "postgres"),
            ("DATABASE_URL", "postgres://u:p@db/console"),
        ])
        .unwrap();
        assert_eq!(
            config.storage_backend,
            StorageBackendType::Postgres {
                url: "postgres://u:p@db/console".to_owned()
            }
        );
    }

    #[test]
    fn unknown_storage_is_rejected() {
        assert!(matches!(
            load(&[("CONSOLE_STORAGE", "rocksdb")]),
            Err(ConfigError::Invalid { var: "CONSOLE_STORAGE", .. })
        ));
    }

    #[test]
    fn durations_are_parsed() {
        let config = load(&[
            ("CONSOLE_SESSION_TTL_HOURS", "8"),
            ("CONSOLE_UPSTREAM_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.session_ttl, chrono::Duration::hours(8));
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));

        assert!(load(&[("CONSOLE_SESSION_TTL_HOURS", "0")]).is_err());
        assert!(load(&[("CONSOLE_UPSTREAM_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("CONSOLE_UPSTREAM_TIMEOUT_SECS", "soon")]).is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = load(&[
            ("CONSOLE_STORAGE", "postgres"),
            ("DATABASE_URL", "postgres://u:dbpass@db/console"),
        ])
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(SECRET));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("dbpass"));
        assert!(!debug.contains(KEY_HEX));
    }
}
