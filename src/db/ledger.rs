// SPDX-License-Identifier: MIT

//! Transactional ledger store abstraction.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::{Activity, LeaderboardCache, Tile, User};

/// Per-user activity summary joined into the leaderboard.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivityTotals {
    /// Number of processed activities
    pub count: u32,
    /// Total distance across activities (meters)
    pub distance_meters: f64,
}

/// Ledger store contract.
///
/// `commit_capture` and `commit_rollback` are all-or-nothing: either every
/// staged write lands or none does. The store's transaction isolation is
/// the only serialization between two calls racing on the same tile; the
/// final state of such a race depends on commit order (last commit wins).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch existing tiles for the given ids, keyed by tile id.
    /// Missing ids are simply absent from the result.
    async fn get_tiles(&self, tile_ids: &[String]) -> Result<HashMap<String, Tile>, EngineError>;

    /// All tiles whose current claim belongs to the given activity.
    async fn tiles_claimed_by_activity(&self, activity_id: u64)
        -> Result<Vec<Tile>, EngineError>;

    /// Full scan of every owned tile, for aggregation.
    async fn all_tiles(&self) -> Result<Vec<Tile>, EngineError>;

    /// Atomically upsert the activity and write the staged tile inserts
    /// and updates.
    async fn commit_capture(
        &self,
        activity: &Activity,
        inserts: &[Tile],
        updates: &[Tile],
    ) -> Result<(), EngineError>;

    /// Atomically delete the activity, write the restored tiles, and
    /// delete the orphaned ones.
    async fn commit_rollback(
        &self,
        activity_id: u64,
        restores: &[Tile],
        deletions: &[String],
    ) -> Result<(), EngineError>;

    /// Get an activity by its Strava ID.
    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, EngineError>;

    /// Activity count and total distance for one user.
    async fn activity_totals(&self, user_id: &str) -> Result<ActivityTotals, EngineError>;

    /// Get a user profile by internal ID.
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, EngineError>;

    /// Create or update a user profile.
    async fn upsert_user(&self, user: &User) -> Result<(), EngineError>;

    /// Read a cached leaderboard by type.
    async fn get_leaderboard(
        &self,
        leaderboard_type: &str,
    ) -> Result<Option<LeaderboardCache>, EngineError>;

    /// Replace a cached leaderboard wholesale.
    async fn set_leaderboard(&self, cache: &LeaderboardCache) -> Result<(), EngineError>;
}
