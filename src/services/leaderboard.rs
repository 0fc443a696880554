// SPDX-License-Identifier: MIT

//! Leaderboard aggregation service.
//!
//! Recomputes the full ranked ownership summary and replaces the cached
//! document wholesale. Reads between runs hit only the cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::db::Ledger;
use crate::error::Result;
use crate::models::{LeaderboardCache, LeaderboardEntry};
use crate::time_utils::format_utc_rfc3339;

/// Computes and caches ranked ownership summaries.
///
/// The refresh lock is injected so multiple service instances can share a
/// single-flight guard (or, in tests, run isolated). It is process-local:
/// multi-instance deployments that need the at-most-one-recompute
/// guarantee across processes must bring a distributed lock.
pub struct LeaderboardService {
    ledger: Arc<dyn Ledger>,
    refresh_lock: Arc<Mutex<()>>,
    refresh_minutes: u64,
}

impl LeaderboardService {
    pub fn new(ledger: Arc<dyn Ledger>, refresh_lock: Arc<Mutex<()>>, refresh_minutes: u64) -> Self {
        Self {
            ledger,
            refresh_lock,
            refresh_minutes,
        }
    }

    /// Read the cached leaderboard, computing it synchronously on a miss.
    pub async fn get_leaderboard(&self, leaderboard_type: &str) -> Result<LeaderboardCache> {
        if let Some(cache) = self.ledger.get_leaderboard(leaderboard_type).await? {
            return Ok(cache);
        }
        tracing::info!(leaderboard_type, "Leaderboard cache miss, computing now");
        self.recompute(leaderboard_type).await
    }

    /// Recompute the ranking and replace the cache.
    ///
    /// Concurrent callers queue behind the in-flight run on the refresh
    /// lock. On a scan failure the previous cache stays in place and the
    /// error goes to this caller only; the next scheduled run retries.
    pub async fn recompute(&self, leaderboard_type: &str) -> Result<LeaderboardCache> {
        let _guard = self.refresh_lock.lock().await;

        let tiles = self.ledger.all_tiles().await?;

        // Group tile counts by owner. BTreeMap keeps the pre-sort order
        // deterministic, which is all the tie-break the ranking promises.
        let mut owners: BTreeMap<String, (u64, u32)> = BTreeMap::new();
        for tile in &tiles {
            let entry = owners
                .entry(tile.owner_id.clone())
                .or_insert((tile.owner_athlete_id, 0));
            entry.1 += 1;
        }

        let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(owners.len());
        for (user_id, (athlete_id, tile_count)) in owners {
            let Some(profile) = self.ledger.get_user(&user_id).await? else {
                tracing::warn!(user_id = %user_id, "Tile owner has no profile, skipping");
                continue;
            };
            let totals = self.ledger.activity_totals(&user_id).await?;

            entries.push(LeaderboardEntry {
                user_id,
                athlete_id,
                firstname: profile.firstname,
                lastname: profile.lastname,
                profile_picture: profile.profile_picture,
                tile_count,
                activity_count: totals.count,
                total_distance_meters: totals.distance_meters,
                rank: 0,
            });
        }

        entries.sort_by(|a, b| b.tile_count.cmp(&a.tile_count));
        for (position, entry) in entries.iter_mut().enumerate() {
            entry.rank = position as u32 + 1;
        }

        let now = Utc::now();
        let cache = LeaderboardCache {
            leaderboard_type: leaderboard_type.to_string(),
            entries,
            last_updated: format_utc_rfc3339(now),
            next_update: format_utc_rfc3339(
                now + chrono::Duration::minutes(self.refresh_minutes as i64),
            ),
        };

        self.ledger.set_leaderboard(&cache).await?;

        tracing::info!(
            leaderboard_type,
            entries = cache.entries.len(),
            tiles = tiles.len(),
            "Leaderboard recomputed"
        );

        Ok(cache)
    }
}
