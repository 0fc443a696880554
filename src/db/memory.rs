// SPDX-License-Identifier: MIT

//! In-memory ledger for tests and offline runs.
//!
//! A single mutex guards the whole store so the commit methods get the
//! same all-or-nothing behavior a real transaction provides.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::db::ledger::{ActivityTotals, Ledger};
use crate::error::EngineError;
use crate::models::{Activity, LeaderboardCache, Tile, User};

#[derive(Default)]
struct MemoryState {
    tiles: HashMap<String, Tile>,
    activities: HashMap<u64, Activity>,
    users: HashMap<String, User>,
    leaderboards: HashMap<String, LeaderboardCache>,
}

/// Ledger backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, EngineError> {
        self.inner
            .lock()
            .map_err(|_| EngineError::Database("memory ledger poisoned".to_string()))
    }

    /// Number of stored tiles (test introspection).
    pub fn tile_count(&self) -> usize {
        self.inner.lock().map(|s| s.tiles.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_tiles(&self, tile_ids: &[String]) -> Result<HashMap<String, Tile>, EngineError> {
        let state = self.state()?;
        Ok(tile_ids
            .iter()
            .filter_map(|id| state.tiles.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }

    async fn tiles_claimed_by_activity(
        &self,
        activity_id: u64,
    ) -> Result<Vec<Tile>, EngineError> {
        let state = self.state()?;
        Ok(state
            .tiles
            .values()
            .filter(|t| t.claimed_by_activity(activity_id))
            .cloned()
            .collect())
    }

    async fn all_tiles(&self) -> Result<Vec<Tile>, EngineError> {
        let state = self.state()?;
        Ok(state.tiles.values().cloned().collect())
    }

    async fn commit_capture(
        &self,
        activity: &Activity,
        inserts: &[Tile],
        updates: &[Tile],
    ) -> Result<(), EngineError> {
        let mut state = self.state()?;
        state
            .activities
            .insert(activity.strava_activity_id, activity.clone());
        for tile in inserts.iter().chain(updates) {
            state.tiles.insert(tile.tile_id.clone(), tile.clone());
        }
        Ok(())
    }

    async fn commit_rollback(
        &self,
        activity_id: u64,
        restores: &[Tile],
        deletions: &[String],
    ) -> Result<(), EngineError> {
        let mut state = self.state()?;
        if state.activities.remove(&activity_id).is_none() {
            return Err(EngineError::Database(format!(
                "activity {} vanished before rollback commit",
                activity_id
            )));
        }
        for tile in restores {
            state.tiles.insert(tile.tile_id.clone(), tile.clone());
        }
        for tile_id in deletions {
            state.tiles.remove(tile_id);
        }
        Ok(())
    }

    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, EngineError> {
        let state = self.state()?;
        Ok(state.activities.get(&activity_id).cloned())
    }

    async fn activity_totals(&self, user_id: &str) -> Result<ActivityTotals, EngineError> {
        let state = self.state()?;
        let mut totals = ActivityTotals::default();
        for activity in state.activities.values() {
            if activity.user_id == user_id {
                totals.count += 1;
                totals.distance_meters += activity.distance_meters;
            }
        }
        Ok(totals)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, EngineError> {
        let state = self.state()?;
        Ok(state.users.get(user_id).cloned())
    }

    async fn upsert_user(&self, user: &User) -> Result<(), EngineError> {
        let mut state = self.state()?;
        state.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn get_leaderboard(
        &self,
        leaderboard_type: &str,
    ) -> Result<Option<LeaderboardCache>, EngineError> {
        let state = self.state()?;
        Ok(state.leaderboards.get(leaderboard_type).cloned())
    }

    async fn set_leaderboard(&self, cache: &LeaderboardCache) -> Result<(), EngineError> {
        let mut state = self.state()?;
        state
            .leaderboards
            .insert(cache.leaderboard_type.clone(), cache.clone());
        Ok(())
    }
}
