// SPDX-License-Identifier: MIT

//! Capture transaction engine.
//!
//! Applies a batch of tile claims for one activity. All staging happens in
//! memory through the pure methods on [`Tile`]; the ledger commits the
//! whole batch together with the activity record in one transaction, so a
//! capture either fully lands or fully aborts.
//!
//! Two calls racing on the same tile are serialized only by the store's
//! transaction ordering: the ordering guard compares timestamps within one
//! call, so the final state of such a race is last-commit-wins.

use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Ledger;
use crate::error::Result;
use crate::models::{Activity, ClaimOutcome, Tile, User};

/// Result of applying one capture.
#[derive(Debug, Clone, Default)]
pub struct CaptureStats {
    /// Tiles claimed for the first time.
    pub created: u32,
    /// Tiles transferred or refreshed.
    pub updated: u32,
    /// Tiles skipped because the incoming claim was not newer.
    pub skipped: u32,
    /// Tile ids per disposition.
    pub created_tiles: Vec<String>,
    pub updated_tiles: Vec<String>,
    pub skipped_tiles: Vec<String>,
}

impl CaptureStats {
    /// Tiles now pointing at this activity.
    pub fn total_claimed(&self) -> u32 {
        self.created + self.updated
    }

    /// Ids of every tile the activity now holds, created first.
    pub fn claimed_tiles(&self) -> Vec<String> {
        let mut tiles = self.created_tiles.clone();
        tiles.extend(self.updated_tiles.iter().cloned());
        tiles
    }

    /// Returns true if every claim in the batch was stale.
    pub fn is_fully_stale(&self) -> bool {
        self.total_claimed() == 0 && self.skipped > 0
    }
}

/// Applies captures to the ownership ledger.
pub struct CaptureEngine {
    ledger: Arc<dyn Ledger>,
}

impl CaptureEngine {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Apply all claims for one processed activity atomically.
    ///
    /// Stale claims are counted, not errored: an out-of-order backfill is
    /// normal operation. Only a failed transaction surfaces as an error,
    /// and then nothing was written.
    pub async fn apply_capture(
        &self,
        user: &User,
        activity: &Activity,
        tile_ids: &[String],
    ) -> Result<CaptureStats> {
        let existing = self.ledger.get_tiles(tile_ids).await?;

        let mut stats = CaptureStats::default();
        let mut inserts: Vec<Tile> = Vec::new();
        let mut updates: Vec<Tile> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for tile_id in tile_ids {
            if !seen.insert(tile_id.as_str()) {
                continue;
            }
            match existing.get(tile_id) {
                None => {
                    inserts.push(Tile::first_claim(tile_id, user, activity));
                    stats.created += 1;
                    stats.created_tiles.push(tile_id.clone());
                }
                Some(tile) => {
                    let mut tile = tile.clone();
                    match tile.apply_claim(user, activity) {
                        ClaimOutcome::Captured | ClaimOutcome::Refreshed => {
                            updates.push(tile);
                            stats.updated += 1;
                            stats.updated_tiles.push(tile_id.clone());
                        }
                        ClaimOutcome::Stale => {
                            stats.skipped += 1;
                            stats.skipped_tiles.push(tile_id.clone());
                        }
                    }
                }
            }
        }

        // Remember the route's final tile for "show on map" navigation.
        let mut record = activity.clone();
        record.last_tile_id = tile_ids.last().cloned();

        self.ledger
            .commit_capture(&record, &inserts, &updates)
            .await?;

        tracing::info!(
            activity_id = activity.strava_activity_id,
            user_id = %user.user_id,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            "Capture applied"
        );

        Ok(stats)
    }
}
