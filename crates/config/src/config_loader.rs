use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{info, warn};

use app_error::{AppError, AppResult};

/// Complete application configuration loaded from JSON file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub database: SurrealDbConfig,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SurrealDbConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub namespace: String,
    pub database: String,
    pub pool: DbPoolConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DbPoolConfig {
    pub size: usize,
    pub connection_timeout: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: u64,
    pub body_limit: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SecurityConfig {
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub lockout: LockoutConfig,
    pub rate_limiting: RateLimitingConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_hours: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PasswordConfig {
    pub min_length: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockoutConfig {
    pub max_failed_attempts: u32,
    pub lock_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitingConfig {
    pub auth: RateLimitSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitSettings {
    pub max_requests: usize,
    pub window_secs: u64,
    /// Expired window entries are swept this often.
    pub cleanup_interval_secs: u64,
    /// Hard bound on tracked clients; the entry closest to expiry is evicted
    /// when the table is full.
    pub max_entries: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    pub sentry: SentryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SentryConfig {
    pub dsn: String,
    pub environment: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(config)
    }

    /// Load the compiled-in configuration, falling back to defaults when the
    /// bundled file does not parse.
    pub fn load() -> AppResult<Self> {
        let config_content =
            std::str::from_utf8(include_bytes!("../res/app-config.json")).expect("Invalid UTF-8");

        let config = match serde_json::from_str::<AppConfig>(config_content) {
            Ok(conf) => {
                info!("Loaded configuration for environment: {}", conf.environment);
                conf
            }
            Err(e) => {
                warn!(
                    "Failed to load config file: {}. Using default configuration.",
                    e
                );
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = Vec::new();
        let is_production = self.environment == "production";

        if self.server.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        if self.server.host.trim().is_empty() {
            errors.push("Server host cannot be empty".to_string());
        }

        if self.database.endpoint.trim().is_empty() {
            errors.push("Database endpoint cannot be empty".to_string());
        }

        if self.database.namespace.trim().is_empty() {
            errors.push("Database namespace cannot be empty".to_string());
        }

        if self.database.database.trim().is_empty() {
            errors.push("Database name cannot be empty".to_string());
        }

        if self.security.jwt.secret.trim().is_empty() {
            errors.push("JWT secret cannot be empty".to_string());
        }

        if self.security.jwt.expiry_hours == 0 {
            errors.push("JWT expiry must be at least one hour".to_string());
        }

        if self.security.lockout.max_failed_attempts == 0 {
            errors.push("Lockout threshold must be at least 1".to_string());
        }

        if self.security.rate_limiting.auth.max_requests == 0 {
            errors.push("Rate limit must allow at least 1 request".to_string());
        }

        if self.security.rate_limiting.auth.max_entries == 0 {
            errors.push("Rate limit entry bound must be at least 1".to_string());
        }

        if is_production {
            if self.security.jwt.secret.len() < 32 {
                errors.push("Production JWT secret must be at least 32 bytes".to_string());
            }

            if !self.database.endpoint.starts_with("wss://")
                && !self.database.endpoint.contains("memory")
            {
                errors.push("Production should use a secure 'wss://' connection".to_string());
            }

            if self.database.username == "root" || self.database.password == "root" {
                errors
                    .push("Using default 'root' database credentials in production".to_string());
            }
        }

        if !errors.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Invalid configuration: {}",
                errors.join(", ")
            )));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database: SurrealDbConfig {
                endpoint: "memory".to_string(),
                username: "root".to_string(),
                password: "root".to_string(),
                namespace: "splitledger".to_string(),
                database: "main".to_string(),
                pool: DbPoolConfig {
                    size: 10,
                    connection_timeout: 5,
                },
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
                request_timeout: 30,
                body_limit: 1024 * 1024,
            },
            security: SecurityConfig {
                jwt: JwtConfig {
                    secret: "development-only-jwt-secret".to_string(),
                    // Sessions live for a week.
                    expiry_hours: 168,
                },
                password: PasswordConfig { min_length: 6 },
                lockout: LockoutConfig {
                    max_failed_attempts: 5,
                    lock_duration_secs: 2 * 60 * 60,
                },
                rate_limiting: RateLimitingConfig {
                    auth: RateLimitSettings {
                        max_requests: 5,
                        window_secs: 15 * 60,
                        cleanup_interval_secs: 5 * 60,
                        max_entries: 10_000,
                    },
                },
                cors: CorsConfig {
                    allowed_origins: vec!["http://localhost:3000".to_string()],
                    allowed_methods: vec![
                        "GET".to_string(),
                        "POST".to_string(),
                        "PUT".to_string(),
                        "DELETE".to_string(),
                    ],
                    allowed_headers: vec![
                        "authorization".to_string(),
                        "content-type".to_string(),
                    ],
                },
            },
            monitoring: MonitoringConfig {
                sentry: SentryConfig {
                    dsn: String::new(),
                    environment: "development".to_string(),
                },
                logging: LoggingConfig {
                    level: "info".to_string(),
                },
            },
        }
    }
}
