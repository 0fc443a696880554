//! Engine configuration loaded from environment variables.

use h3o::Resolution;
use std::env;

/// Leaderboard cache document key for the global ranking.
pub const GLOBAL_LEADERBOARD: &str = "global";

/// Engine configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// H3 grid resolution used for all tiles. Changing this invalidates
    /// every stored tile id, so it is fixed per deployment.
    pub hex_resolution: Resolution,
    /// Maximum start/end distance (meters) for a route to count as a
    /// closed loop and be captured as an area.
    pub area_close_threshold_m: f64,
    /// Minutes between scheduled leaderboard recomputations.
    pub leaderboard_refresh_minutes: u64,
    /// GCP project ID (Firestore). Empty selects the in-memory ledger.
    pub gcp_project_id: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            hex_resolution: Resolution::Nine,
            area_close_threshold_m: 100.0,
            leaderboard_refresh_minutes: 60,
            gcp_project_id: "test-project".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All values have local-dev defaults; only a malformed value errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let resolution_raw = env::var("HEX_RESOLUTION").unwrap_or_else(|_| "9".to_string());
        let resolution: u8 = resolution_raw
            .parse()
            .map_err(|_| ConfigError::Invalid("HEX_RESOLUTION", resolution_raw.clone()))?;
        let hex_resolution = Resolution::try_from(resolution)
            .map_err(|_| ConfigError::Invalid("HEX_RESOLUTION", resolution_raw))?;

        let threshold_raw =
            env::var("AREA_CLOSE_THRESHOLD_M").unwrap_or_else(|_| "100.0".to_string());
        let area_close_threshold_m: f64 = threshold_raw
            .parse()
            .map_err(|_| ConfigError::Invalid("AREA_CLOSE_THRESHOLD_M", threshold_raw))?;

        let refresh_raw =
            env::var("LEADERBOARD_REFRESH_MINUTES").unwrap_or_else(|_| "60".to_string());
        let leaderboard_refresh_minutes: u64 = refresh_raw
            .parse()
            .map_err(|_| ConfigError::Invalid("LEADERBOARD_REFRESH_MINUTES", refresh_raw))?;

        Ok(Self {
            hex_resolution,
            area_close_threshold_m,
            leaderboard_refresh_minutes,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_default(),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
