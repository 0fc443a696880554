// SPDX-License-Identifier: MIT

//! Hexturf: territory capture over a global hexagonal grid.
//!
//! This crate is the capture engine behind the game: it converts GPS
//! routes into hex tile claims, applies them to the ownership ledger with
//! reversible history, rolls captures back when activities are deleted,
//! and keeps a periodically recomputed leaderboard cache.
//!
//! Transport, auth, and rendering live in the callers; they hand the
//! engine validated users, activities, and decoded routes.

pub mod config;
pub mod db;
pub mod error;
pub mod geo_utils;
pub mod models;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::Ledger;
use error::{EngineError, Result};
use models::{Activity, LeaderboardCache, User};
use services::{
    CaptureEngine, CaptureStats, LeaderboardService, RollbackEngine, RollbackStats,
    RouteClassifier, RouteConversion,
};

/// The assembled capture engine.
///
/// Bundles the route classifier, the capture/rollback engines, and the
/// leaderboard service over one shared ledger.
pub struct TerritoryEngine {
    pub config: Config,
    pub ledger: Arc<dyn Ledger>,
    pub classifier: RouteClassifier,
    pub capture: CaptureEngine,
    pub rollback: RollbackEngine,
    pub leaderboard: Arc<LeaderboardService>,
}

impl TerritoryEngine {
    pub fn new(config: Config, ledger: Arc<dyn Ledger>) -> Self {
        let classifier = RouteClassifier::new(&config);
        let capture = CaptureEngine::new(ledger.clone());
        let rollback = RollbackEngine::new(ledger.clone());
        let leaderboard = Arc::new(LeaderboardService::new(
            ledger.clone(),
            Arc::new(tokio::sync::Mutex::new(())),
            config.leaderboard_refresh_minutes,
        ));

        Self {
            config,
            ledger,
            classifier,
            capture,
            rollback,
            leaderboard,
        }
    }

    /// Convert a `(lat, lng)` route into tile ids and a capture shape.
    pub fn convert_route(&self, points: &[(f64, f64)]) -> RouteConversion {
        self.classifier.convert_route(points)
    }

    /// Convert an encoded polyline (precision 5) into tile ids.
    pub fn convert_route_from_polyline(&self, encoded: &str) -> Result<RouteConversion> {
        self.classifier
            .convert_route_from_polyline(encoded)
            .map_err(|e| EngineError::InvalidRoute(e.to_string()))
    }

    /// Apply all tile claims for one processed activity atomically.
    pub async fn apply_capture(
        &self,
        user: &User,
        activity: &Activity,
        tile_ids: &[String],
    ) -> Result<CaptureStats> {
        self.capture.apply_capture(user, activity, tile_ids).await
    }

    /// Reverse every capture belonging to a deleted activity.
    pub async fn rollback_activity(&self, activity_id: u64) -> Result<RollbackStats> {
        self.rollback.rollback_activity(activity_id).await
    }

    /// Read the cached leaderboard, computing it synchronously on a miss.
    pub async fn get_leaderboard(&self, leaderboard_type: &str) -> Result<LeaderboardCache> {
        self.leaderboard.get_leaderboard(leaderboard_type).await
    }
}
