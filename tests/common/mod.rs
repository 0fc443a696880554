// SPDX-License-Identifier: MIT

//! Shared helpers for integration tests.

use std::sync::Arc;

use chrono::TimeZone;
use hexturf::config::Config;
use hexturf::db::MemoryLedger;
use hexturf::models::{Activity, RouteShape, User};
use hexturf::TerritoryEngine;

/// Engine over a fresh in-memory ledger.
#[allow(dead_code)]
pub fn memory_engine() -> (TerritoryEngine, MemoryLedger) {
    let ledger = MemoryLedger::new();
    let engine = TerritoryEngine::new(Config::default(), Arc::new(ledger.clone()));
    (engine, ledger)
}

/// Basic test user.
#[allow(dead_code)]
pub fn make_user(user_id: &str, athlete_id: u64) -> User {
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

/// Basic test activity starting at `start_ts` seconds since the epoch.
#[allow(dead_code)]
pub fn make_activity(id: u64, user: &User, start_ts: i64) -> Activity {
    Activity {
        strava_activity_id: id,
        user_id: user.user_id.clone(),
        athlete_id: user.strava_athlete_id,
        name: format!("Test Activity {}", id),
        sport_type: "Run".to_string(),
        start_date: chrono::Utc.timestamp_opt(start_ts, 0).unwrap(),
        distance_meters: 5000.0,
        summary_polyline: None,
        route_type: RouteShape::Line,
        last_tile_id: None,
        processed_at: "2024-01-15T12:00:00Z".to_string(),
    }
}

/// Check if the Firestore emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}
