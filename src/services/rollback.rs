// SPDX-License-Identifier: MIT

//! Rollback engine: the inverse of capture, for deleted activities.

use std::sync::Arc;

use crate::db::Ledger;
use crate::error::{EngineError, Result};
use crate::models::{ReleaseOutcome, Tile};

/// Result of rolling back one activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollbackStats {
    /// Tiles restored to their previous owner.
    pub restored: u32,
    /// Tiles deleted because they had no prior owner.
    pub deleted: u32,
}

/// Reverses captures belonging to a deleted activity.
pub struct RollbackEngine {
    ledger: Arc<dyn Ledger>,
}

impl RollbackEngine {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Roll back every tile whose current claim belongs to the activity,
    /// then delete the activity, all in one transaction.
    ///
    /// Tiles the activity captured but has since lost are untouched;
    /// their history entries for this activity stay buried in the stack.
    pub async fn rollback_activity(&self, activity_id: u64) -> Result<RollbackStats> {
        let activity = self
            .ledger
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("activity {}", activity_id)))?;

        let tiles = self.ledger.tiles_claimed_by_activity(activity_id).await?;

        let mut stats = RollbackStats::default();
        let mut restores: Vec<Tile> = Vec::new();
        let mut deletions: Vec<String> = Vec::new();

        for mut tile in tiles {
            match tile.revert_claim() {
                ReleaseOutcome::Restored => {
                    stats.restored += 1;
                    restores.push(tile);
                }
                ReleaseOutcome::Orphaned => {
                    stats.deleted += 1;
                    deletions.push(tile.tile_id);
                }
            }
        }

        self.ledger
            .commit_rollback(activity_id, &restores, &deletions)
            .await?;

        tracing::info!(
            activity_id,
            user_id = %activity.user_id,
            restored = stats.restored,
            deleted = stats.deleted,
            "Activity rolled back"
        );

        Ok(stats)
    }
}
