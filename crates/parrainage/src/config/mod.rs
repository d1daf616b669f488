use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::ceremony::SessionTimings;

/// Distinguishes runtime behavior for different stages of the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the ceremony host.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub storage: StorageConfig,
    pub draw: DrawConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let data_dir = env::var("PARRAINAGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let seed = match env::var("PARRAINAGE_SEED") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidSeed)?,
            ),
            _ => None,
        };

        let tick_ms = env::var("PARRAINAGE_TICK_MS")
            .unwrap_or_else(|_| "100".to_string())
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTickInterval)?;
        if tick_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            storage: StorageConfig { data_dir },
            draw: DrawConfig {
                seed,
                tick_interval: Duration::from_millis(tick_ms),
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Where the roster, match and settings snapshots live.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Randomness and pacing of the draw.
#[derive(Debug, Clone)]
pub struct DrawConfig {
    pub seed: Option<u64>,
    pub tick_interval: Duration,
}

impl DrawConfig {
    pub fn timings(&self) -> SessionTimings {
        SessionTimings::ceremony().with_tick_interval(self.tick_interval)
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSeed,
    InvalidTickInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSeed => write!(f, "PARRAINAGE_SEED must be a valid u64"),
            ConfigError::InvalidTickInterval => {
                write!(f, "PARRAINAGE_TICK_MS must be a positive number of milliseconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
