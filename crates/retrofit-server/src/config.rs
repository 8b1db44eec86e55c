//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/retrofit";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Register Job Constants
// ============================================================================

/// Default cap on errors collected per job.
pub const DEFAULT_MAX_ERRORS_COUNT: usize = 100;

/// Default largest accepted CSV file (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Default time a dispatched job may run before it is failed (15 minutes).
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 900;

/// Default number of VRNs removed per DELETE statement.
pub const DEFAULT_DELETE_BATCH_SIZE: usize = 10_000;

// ============================================================================
// Audit Constants
// ============================================================================

/// Default age after which audit entries are removed (one year).
pub const DEFAULT_AUDIT_RETENTION_DAYS: u32 = 365;

/// Default pause between audit cleanup runs (one day).
pub const DEFAULT_AUDIT_CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub register: RegisterConfig,
    pub audit: AuditConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Limits applied to register jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterConfig {
    pub max_errors_count: usize,
    pub max_file_size_bytes: u64,
    pub job_timeout_secs: u64,
    pub delete_batch_size: usize,
}

impl RegisterConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            max_errors_count: DEFAULT_MAX_ERRORS_COUNT,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
        }
    }
}

/// Retention of the audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub retention_days: u32,
    pub cleanup_interval_secs: u64,
}

impl AuditConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_AUDIT_RETENTION_DAYS,
            cleanup_interval_secs: DEFAULT_AUDIT_CLEANUP_INTERVAL_SECS,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("RETROFIT_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("RETROFIT_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "RETROFIT_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            },
            register: RegisterConfig {
                max_errors_count: env_or("REGISTER_MAX_ERRORS_COUNT", DEFAULT_MAX_ERRORS_COUNT),
                max_file_size_bytes: env_or(
                    "REGISTER_MAX_FILE_SIZE_BYTES",
                    DEFAULT_MAX_FILE_SIZE_BYTES,
                ),
                job_timeout_secs: env_or("REGISTER_JOB_TIMEOUT_SECS", DEFAULT_JOB_TIMEOUT_SECS),
                delete_batch_size: env_or(
                    "REGISTER_DELETE_BATCH_SIZE",
                    DEFAULT_DELETE_BATCH_SIZE,
                ),
            },
            audit: AuditConfig {
                retention_days: env_or("AUDIT_RETENTION_DAYS", DEFAULT_AUDIT_RETENTION_DAYS),
                cleanup_interval_secs: env_or(
                    "AUDIT_CLEANUP_INTERVAL_SECS",
                    DEFAULT_AUDIT_CLEANUP_INTERVAL_SECS,
                ),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.register.max_errors_count == 0 {
            anyhow::bail!("REGISTER_MAX_ERRORS_COUNT must be greater than 0");
        }

        if self.register.max_file_size_bytes == 0 {
            anyhow::bail!("REGISTER_MAX_FILE_SIZE_BYTES must be greater than 0");
        }

        if self.register.job_timeout_secs == 0 {
            anyhow::bail!("REGISTER_JOB_TIMEOUT_SECS must be greater than 0");
        }

        if self.register.delete_batch_size == 0 {
            anyhow::bail!("REGISTER_DELETE_BATCH_SIZE must be greater than 0");
        }

        if self.audit.retention_days == 0 {
            anyhow::bail!("AUDIT_RETENTION_DAYS must be greater than 0");
        }

        if self.audit.cleanup_interval_secs == 0 {
            anyhow::bail!("AUDIT_CLEANUP_INTERVAL_SECS must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            register: RegisterConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}
