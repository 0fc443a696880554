// SPDX-License-Identifier: MIT

//! Leaderboard cache documents.
//!
//! The cache is replaced wholesale on each aggregation run and is
//! read-only in between, so dashboard reads cost O(1) instead of a full
//! tile scan.

use serde::{Deserialize, Serialize};

/// One ranked row of the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Ranked user
    pub user_id: String,
    /// User's Strava athlete ID
    pub athlete_id: u64,
    /// First name (joined from the profile)
    pub firstname: String,
    /// Last name (joined from the profile)
    pub lastname: String,
    /// Profile picture URL (joined from the profile)
    pub profile_picture: Option<String>,
    /// Tiles currently owned
    pub tile_count: u32,
    /// Activities processed for this user
    pub activity_count: u32,
    /// Total distance across activities (meters)
    pub total_distance_meters: f64,
    /// 1-based rank by tile count descending
    pub rank: u32,
}

/// Cached ranking, keyed by leaderboard type (e.g. "global").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardCache {
    /// Leaderboard type (also used as document ID)
    pub leaderboard_type: String,
    /// Ranked entries, best first
    pub entries: Vec<LeaderboardEntry>,
    /// When this ranking was computed (ISO 8601)
    pub last_updated: String,
    /// When the next scheduled recomputation is due (ISO 8601)
    pub next_update: String,
}
