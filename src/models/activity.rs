// SPDX-License-Identifier: MIT

//! Processed activity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capture shape of a route, persisted for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteShape {
    /// Open path; only the gap-filled line of cells is captured.
    Line,
    /// Closed loop; the polygon interior is captured as well.
    Area,
}

/// Stored activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Strava activity ID (also used as document ID)
    pub strava_activity_id: u64,
    /// Owning user
    pub user_id: String,
    /// Owner's Strava athlete ID
    pub athlete_id: u64,
    /// Activity name/title
    pub name: String,
    /// Sport type (Ride, Run, Hike, etc.)
    pub sport_type: String,
    /// Start date/time; the ordering key for competing captures
    pub start_date: DateTime<Utc>,
    /// Distance in meters
    pub distance_meters: f64,
    /// Encoded route polyline (precision 5), if one was supplied
    pub summary_polyline: Option<String>,
    /// Whether the route was captured as a line or an area
    pub route_type: RouteShape,
    /// Last tile the route touched, for "show on map" navigation
    pub last_tile_id: Option<String>,
    /// When this activity was processed
    pub processed_at: String,
}
