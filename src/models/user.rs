// SPDX-License-Identifier: MIT

//! User model.

use serde::{Deserialize, Serialize};

/// User profile stored in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID (also used as document ID)
    pub user_id: String,
    /// Strava athlete ID
    pub strava_athlete_id: u64,
    /// First name
    pub firstname: String,
    /// Last name
    pub lastname: String,
    /// Profile picture URL
    pub profile_picture: Option<String>,
    /// When the user first connected
    pub created_at: String,
    /// Last activity timestamp
    pub last_active: String,
}
