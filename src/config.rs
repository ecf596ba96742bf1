//! Configuration loader for the Aire Limpio backend service.
//!
//! This module centralizes all runtime configuration values and their
//! defaults, loading from environment variables (with optional `.env` file
//! support provided by the caller). By consolidating configuration logic
//! here, we avoid scattering `env::var` calls throughout the codebase.

use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent
/// configuration snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Map-tile (Mapbox) access token handed to the map view.
    pub mapbox_token: String,

    /// Path to the sensor reference catalog CSV.
    pub sites_csv: String,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `MAPBOX_TOKEN` – map-tile access token
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `SENSORES_CSV` – sensor catalog path (default: `assets/sensores.csv`)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let mapbox_token = require_env!("MAPBOX_TOKEN");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let sites_csv =
        env::var("SENSORES_CSV").unwrap_or_else(|_| "assets/sensores.csv".to_string());

    Ok(Config {
        db_url,
        db_pool_max,
        mapbox_token,
        sites_csv,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information (database password, map token) while
    /// showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL : {}", masked_db_url);
        tracing::info!("  MAPBOX_TOKEN : ****");
        tracing::info!("  DB_POOL_MAX  : {}", self.db_pool_max);
        tracing::info!("  SENSORES_CSV : {}", self.sites_csv);
    }
}
