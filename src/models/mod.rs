// SPDX-License-Identifier: MIT

//! Data models for the engine.

pub mod activity;
pub mod leaderboard;
pub mod tile;
pub mod user;

pub use activity::{Activity, RouteShape};
pub use leaderboard::{LeaderboardCache, LeaderboardEntry};
pub use tile::{CaptureHistory, CaptureHistoryEntry, ClaimOutcome, ReleaseOutcome, Tile};
pub use user::User;
