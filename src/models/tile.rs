// SPDX-License-Identifier: MIT

//! Tile ownership model and claim transitions.
//!
//! All ownership mutations are pure methods on [`Tile`] so the capture and
//! rollback engines can stage changes in memory and hand the results to the
//! ledger as a single transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Activity, User};

/// Snapshot of one past ownership period.
///
/// Pushed when a tile changes hands; popped only when the activity that
/// most recently captured the tile is rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureHistoryEntry {
    /// Owner at the time of the snapshot
    pub owner_id: String,
    /// Owner's Strava athlete ID
    pub owner_athlete_id: u64,
    /// Activity that produced the snapshotted claim
    pub activity_id: u64,
    /// When the snapshotted claim was made
    pub captured_at: DateTime<Utc>,
    /// Sport type of the snapshotted activity
    pub activity_type: String,
}

/// Stack of past owners, oldest first.
///
/// Invariant: the last entry is always the most recent former owner, so
/// rollback pops exactly the claim that the matching capture pushed. This
/// holds as long as captures and rollbacks are serialized per tile by the
/// store transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureHistory(Vec<CaptureHistoryEntry>);

impl CaptureHistory {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent former owner, if the tile has ever changed hands.
    pub fn last(&self) -> Option<&CaptureHistoryEntry> {
        self.0.last()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[CaptureHistoryEntry] {
        &self.0
    }

    fn push(&mut self, entry: CaptureHistoryEntry) {
        self.0.push(entry);
    }

    fn pop(&mut self) -> Option<CaptureHistoryEntry> {
        self.0.pop()
    }
}

/// Outcome of applying a claim to an existing tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Ownership changed; a history entry was pushed.
    Captured,
    /// Same owner, newer activity; claim metadata refreshed in place.
    Refreshed,
    /// Claim is not strictly newer than the current one; tile unchanged.
    Stale,
}

/// Outcome of reverting a tile's current claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The previous owner was restored from history.
    Restored,
    /// No prior owner exists; the tile should be deleted.
    Orphaned,
}

/// One cell of the fixed-resolution hex grid, with its current claim and
/// the reversible history of prior claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    /// H3 cell index (also used as document ID)
    pub tile_id: String,
    /// Current owner
    pub owner_id: String,
    /// Current owner's Strava athlete ID
    pub owner_athlete_id: u64,
    /// Activity that produced the current claim
    pub activity_id: u64,
    /// Sport type of the current claim's activity
    pub activity_type: String,
    /// Total successful captures of this tile. Always `1 + history.len()`.
    pub capture_count: u32,
    /// When the tile was first claimed (immutable)
    pub first_captured_at: DateTime<Utc>,
    /// Who first claimed the tile (immutable)
    pub first_captured_by: String,
    /// Timestamp of the current claim; orders competing claims
    pub last_captured_at: DateTime<Utc>,
    /// Denormalized pointer to the most recent former owner. Query
    /// optimization only; `history` is authoritative.
    pub previous_owner_id: Option<String>,
    /// Past owners, oldest first
    #[serde(default)]
    pub history: CaptureHistory,
}

impl Tile {
    /// Create a tile for its very first claim.
    pub fn first_claim(tile_id: &str, user: &User, activity: &Activity) -> Self {
        Self {
            tile_id: tile_id.to_string(),
            owner_id: user.user_id.clone(),
            owner_athlete_id: user.strava_athlete_id,
            activity_id: activity.strava_activity_id,
            activity_type: activity.sport_type.clone(),
            capture_count: 1,
            first_captured_at: activity.start_date,
            first_captured_by: user.user_id.clone(),
            last_captured_at: activity.start_date,
            previous_owner_id: None,
            history: CaptureHistory::default(),
        }
    }

    /// Apply a claim to an already-existing tile.
    ///
    /// The ordering guard compares the activity's `start_date` against the
    /// tile's `last_captured_at`: a claim that is not strictly newer is a
    /// no-op, so out-of-order backfills never overwrite a newer claim and
    /// re-processing the same activity is idempotent.
    pub fn apply_claim(&mut self, user: &User, activity: &Activity) -> ClaimOutcome {
        if activity.start_date <= self.last_captured_at {
            return ClaimOutcome::Stale;
        }

        if self.owner_id == user.user_id {
            // Same owner defending their own tile: refresh the claim
            // metadata without counting a capture.
            self.activity_id = activity.strava_activity_id;
            self.activity_type = activity.sport_type.clone();
            self.last_captured_at = activity.start_date;
            return ClaimOutcome::Refreshed;
        }

        self.history.push(self.current_claim_snapshot());
        self.previous_owner_id = Some(self.owner_id.clone());
        self.owner_id = user.user_id.clone();
        self.owner_athlete_id = user.strava_athlete_id;
        self.activity_id = activity.strava_activity_id;
        self.activity_type = activity.sport_type.clone();
        self.last_captured_at = activity.start_date;
        self.capture_count += 1;
        ClaimOutcome::Captured
    }

    /// Revert the current claim, restoring the most recent former owner.
    ///
    /// Exact structural inverse of the ownership-change branch of
    /// [`Tile::apply_claim`]. Returns [`ReleaseOutcome::Orphaned`] when no
    /// prior owner exists, in which case the caller deletes the tile.
    pub fn revert_claim(&mut self) -> ReleaseOutcome {
        let Some(prev) = self.history.pop() else {
            return ReleaseOutcome::Orphaned;
        };

        self.owner_id = prev.owner_id;
        self.owner_athlete_id = prev.owner_athlete_id;
        self.activity_id = prev.activity_id;
        self.activity_type = prev.activity_type;
        self.last_captured_at = prev.captured_at;
        self.capture_count -= 1;
        self.previous_owner_id = self.history.last().map(|e| e.owner_id.clone());
        ReleaseOutcome::Restored
    }

    /// Whether the current claim belongs to the given activity.
    pub fn claimed_by_activity(&self, activity_id: u64) -> bool {
        self.activity_id == activity_id
    }

    /// `capture_count == 1 + history.len()` must hold at every commit point.
    pub fn count_matches_history(&self) -> bool {
        self.capture_count as usize == 1 + self.history.len()
    }

    fn current_claim_snapshot(&self) -> CaptureHistoryEntry {
        CaptureHistoryEntry {
            owner_id: self.owner_id.clone(),
            owner_athlete_id: self.owner_athlete_id,
            activity_id: self.activity_id,
            captured_at: self.last_captured_at,
            activity_type: self.activity_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RouteShape;
    use chrono::TimeZone;

    fn make_user(user_id: &str, athlete_id: u64) -> User {
        User {
            user_id: user_id.to_string(),
            strava_athlete_id: athlete_id,
            firstname: "Test".to_string(),
            lastname: user_id.to_uppercase(),
            profile_picture: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            last_active: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn make_activity(id: u64, user: &User, start_ts: i64) -> Activity {
        Activity {
            strava_activity_id: id,
            user_id: user.user_id.clone(),
            athlete_id: user.strava_athlete_id,
            name: format!("Test Activity {}", id),
            sport_type: "Run".to_string(),
            start_date: Utc.timestamp_opt(start_ts, 0).unwrap(),
            distance_meters: 5000.0,
            summary_polyline: None,
            route_type: RouteShape::Line,
            last_tile_id: None,
            processed_at: "2024-01-15T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_first_claim_has_empty_history() {
        let user = make_user("a", 1);
        let activity = make_activity(10, &user, 100);
        let tile = Tile::first_claim("8928308280fffff", &user, &activity);

        assert_eq!(tile.owner_id, "a");
        assert_eq!(tile.capture_count, 1);
        assert!(tile.history.is_empty());
        assert_eq!(tile.first_captured_by, "a");
        assert_eq!(tile.previous_owner_id, None);
        assert!(tile.count_matches_history());
    }

    #[test]
    fn test_capture_by_other_user_pushes_history() {
        let user_a = make_user("a", 1);
        let user_b = make_user("b", 2);
        let a1 = make_activity(10, &user_a, 100);
        let a2 = make_activity(20, &user_b, 200);

        let mut tile = Tile::first_claim("h", &user_a, &a1);
        let outcome = tile.apply_claim(&user_b, &a2);

        assert_eq!(outcome, ClaimOutcome::Captured);
        assert_eq!(tile.owner_id, "b");
        assert_eq!(tile.capture_count, 2);
        assert_eq!(tile.history.len(), 1);
        assert_eq!(tile.previous_owner_id, Some("a".to_string()));
        assert_eq!(tile.history.last().unwrap().owner_id, "a");
        assert_eq!(tile.history.last().unwrap().activity_id, 10);
        // Provenance is immutable
        assert_eq!(tile.first_captured_by, "a");
        assert!(tile.count_matches_history());
    }

    #[test]
    fn test_stale_claim_is_noop() {
        let user_a = make_user("a", 1);
        let user_b = make_user("b", 2);
        let a1 = make_activity(10, &user_a, 100);
        let old = make_activity(20, &user_b, 50);

        let mut tile = Tile::first_claim("h", &user_a, &a1);
        let before = tile.clone();

        assert_eq!(tile.apply_claim(&user_b, &old), ClaimOutcome::Stale);
        assert_eq!(tile.owner_id, before.owner_id);
        assert_eq!(tile.capture_count, before.capture_count);
        assert_eq!(tile.history, before.history);
    }

    #[test]
    fn test_equal_timestamp_counts_as_stale() {
        // Ties never override: a later-processed claim with an equal
        // start_date must not steal the tile.
        let user_a = make_user("a", 1);
        let user_b = make_user("b", 2);
        let a1 = make_activity(10, &user_a, 100);
        let tie = make_activity(20, &user_b, 100);

        let mut tile = Tile::first_claim("h", &user_a, &a1);
        assert_eq!(tile.apply_claim(&user_b, &tie), ClaimOutcome::Stale);
        assert_eq!(tile.owner_id, "a");
    }

    #[test]
    fn test_same_owner_refresh_keeps_count() {
        let user = make_user("a", 1);
        let a1 = make_activity(10, &user, 100);
        let a2 = make_activity(20, &user, 200);

        let mut tile = Tile::first_claim("h", &user, &a1);
        let outcome = tile.apply_claim(&user, &a2);

        assert_eq!(outcome, ClaimOutcome::Refreshed);
        assert_eq!(tile.capture_count, 1);
        assert!(tile.history.is_empty());
        assert_eq!(tile.activity_id, 20);
        assert_eq!(tile.last_captured_at, a2.start_date);
    }

    #[test]
    fn test_reapplying_same_activity_is_idempotent() {
        let user = make_user("a", 1);
        let a1 = make_activity(10, &user, 100);

        let mut tile = Tile::first_claim("h", &user, &a1);
        assert_eq!(tile.apply_claim(&user, &a1), ClaimOutcome::Stale);
        assert_eq!(tile.capture_count, 1);
    }

    #[test]
    fn test_revert_restores_previous_owner() {
        let user_a = make_user("a", 1);
        let user_b = make_user("b", 2);
        let a1 = make_activity(10, &user_a, 100);
        let a2 = make_activity(20, &user_b, 200);

        let mut tile = Tile::first_claim("h", &user_a, &a1);
        tile.apply_claim(&user_b, &a2);

        assert_eq!(tile.revert_claim(), ReleaseOutcome::Restored);
        assert_eq!(tile.owner_id, "a");
        assert_eq!(tile.activity_id, 10);
        assert_eq!(tile.last_captured_at, a1.start_date);
        assert_eq!(tile.capture_count, 1);
        assert!(tile.history.is_empty());
        assert_eq!(tile.previous_owner_id, None);
        assert!(tile.count_matches_history());
    }

    #[test]
    fn test_revert_with_empty_history_orphans_tile() {
        let user = make_user("a", 1);
        let a1 = make_activity(10, &user, 100);

        let mut tile = Tile::first_claim("h", &user, &a1);
        assert_eq!(tile.revert_claim(), ReleaseOutcome::Orphaned);
    }

    #[test]
    fn test_alternating_captures_unwind_in_lifo_order() {
        let user_a = make_user("a", 1);
        let user_b = make_user("b", 2);

        let activities: Vec<(User, Activity)> = (0..6)
            .map(|i| {
                let user = if i % 2 == 0 {
                    user_a.clone()
                } else {
                    user_b.clone()
                };
                let activity = make_activity(100 + i as u64, &user, 1000 + i as i64 * 100);
                (user, activity)
            })
            .collect();

        let (first_user, first_activity) = &activities[0];
        let mut tile = Tile::first_claim("h", first_user, first_activity);
        for (user, activity) in &activities[1..] {
            assert_eq!(tile.apply_claim(user, activity), ClaimOutcome::Captured);
        }
        assert_eq!(tile.capture_count, 6);
        assert!(tile.count_matches_history());

        // Unwind all but the first claim in reverse chronological order
        for i in (1..6).rev() {
            assert!(tile.claimed_by_activity(100 + i as u64));
            assert_eq!(tile.revert_claim(), ReleaseOutcome::Restored);
            assert!(tile.count_matches_history());
        }

        // Back to the original state
        assert_eq!(tile.owner_id, "a");
        assert_eq!(tile.activity_id, 100);
        assert_eq!(tile.capture_count, 1);
        assert!(tile.history.is_empty());

        // The sole remaining claim orphans the tile
        assert_eq!(tile.revert_claim(), ReleaseOutcome::Orphaned);
    }

    #[test]
    fn test_tile_serde_roundtrip() {
        let user_a = make_user("a", 1);
        let user_b = make_user("b", 2);
        let mut tile = Tile::first_claim("8928308280fffff", &user_a, &make_activity(10, &user_a, 100));
        tile.apply_claim(&user_b, &make_activity(20, &user_b, 200));

        let json = serde_json::to_value(&tile).unwrap();
        // The history stack serializes as a bare array of snapshots
        assert!(json["history"].is_array());
        assert_eq!(json["capture_count"], 2);

        let back: Tile = serde_json::from_value(json).unwrap();
        assert_eq!(back.owner_id, "b");
        assert_eq!(back.history, tile.history);
        assert_eq!(back.last_captured_at, tile.last_captured_at);
    }

    #[test]
    fn test_previous_owner_pointer_follows_history() {
        let user_a = make_user("a", 1);
        let user_b = make_user("b", 2);
        let user_c = make_user("c", 3);

        let mut tile = Tile::first_claim("h", &user_a, &make_activity(1, &user_a, 100));
        tile.apply_claim(&user_b, &make_activity(2, &user_b, 200));
        tile.apply_claim(&user_c, &make_activity(3, &user_c, 300));
        assert_eq!(tile.previous_owner_id, Some("b".to_string()));

        tile.revert_claim();
        assert_eq!(tile.previous_owner_id, Some("a".to_string()));

        tile.revert_claim();
        assert_eq!(tile.previous_owner_id, None);
    }
}
