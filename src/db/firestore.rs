// SPDX-License-Identifier: MIT

//! Firestore-backed ledger.
//!
//! Captures and rollbacks use Firestore transactions so a batch of tile
//! writes and its activity record land together or not at all. Firestore
//! limits a transaction to 500 writes; a route long enough to exceed that
//! aborts rather than committing a partial capture.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};

use crate::db::collections;
use crate::db::ledger::{ActivityTotals, Ledger};
use crate::error::EngineError;
use crate::models::{Activity, LeaderboardCache, Tile, User};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore ledger client.
#[derive(Clone)]
pub struct FirestoreLedger {
    client: firestore::FirestoreDb,
}

impl FirestoreLedger {
    /// Create a new Firestore ledger.
    ///
    /// For local development with the emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, EngineError> {
        // If the emulator environment variable is set, use an unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| EngineError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, EngineError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            EngineError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl Ledger for FirestoreLedger {
    /// Fetch tiles by id with bounded concurrency.
    async fn get_tiles(&self, tile_ids: &[String]) -> Result<HashMap<String, Tile>, EngineError> {
        let client = &self.client;

        let fetched: Vec<Result<Option<Tile>, EngineError>> = stream::iter(tile_ids.to_vec())
            .map(|tile_id| async move {
                let tile: Option<Tile> = client
                    .fluent()
                    .select()
                    .by_id_in(collections::TILES)
                    .obj()
                    .one(&tile_id)
                    .await
                    .map_err(|e| EngineError::Database(e.to_string()))?;
                Ok::<_, EngineError>(tile)
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect()
            .await;

        let mut tiles = HashMap::new();
        for result in fetched {
            if let Some(tile) = result? {
                tiles.insert(tile.tile_id.clone(), tile);
            }
        }
        Ok(tiles)
    }

    async fn tiles_claimed_by_activity(
        &self,
        activity_id: u64,
    ) -> Result<Vec<Tile>, EngineError> {
        self.client
            .fluent()
            .select()
            .from(collections::TILES)
            .filter(move |q| q.field("activity_id").eq(activity_id))
            .obj()
            .query()
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    async fn all_tiles(&self) -> Result<Vec<Tile>, EngineError> {
        self.client
            .fluent()
            .select()
            .from(collections::TILES)
            .obj()
            .query()
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    async fn commit_capture(
        &self,
        activity: &Activity,
        inserts: &[Tile],
        updates: &[Tile],
    ) -> Result<(), EngineError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| EngineError::Database(format!("Failed to begin transaction: {}", e)))?;

        self.client
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(activity.strava_activity_id.to_string())
            .object(activity)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                EngineError::Database(format!("Failed to add activity to transaction: {}", e))
            })?;

        for tile in inserts.iter().chain(updates) {
            self.client
                .fluent()
                .update()
                .in_col(collections::TILES)
                .document_id(&tile.tile_id)
                .object(tile)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    EngineError::Database(format!("Failed to add tile to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| EngineError::Database(format!("Capture commit failed: {}", e)))?;

        tracing::debug!(
            activity_id = activity.strava_activity_id,
            inserts = inserts.len(),
            updates = updates.len(),
            "Capture committed"
        );

        Ok(())
    }

    async fn commit_rollback(
        &self,
        activity_id: u64,
        restores: &[Tile],
        deletions: &[String],
    ) -> Result<(), EngineError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| EngineError::Database(format!("Failed to begin transaction: {}", e)))?;

        for tile in restores {
            self.client
                .fluent()
                .update()
                .in_col(collections::TILES)
                .document_id(&tile.tile_id)
                .object(tile)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    EngineError::Database(format!("Failed to add restore to transaction: {}", e))
                })?;
        }

        for tile_id in deletions {
            self.client
                .fluent()
                .delete()
                .from(collections::TILES)
                .document_id(tile_id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    EngineError::Database(format!("Failed to add deletion to transaction: {}", e))
                })?;
        }

        self.client
            .fluent()
            .delete()
            .from(collections::ACTIVITIES)
            .document_id(activity_id.to_string())
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                EngineError::Database(format!(
                    "Failed to add activity deletion to transaction: {}",
                    e
                ))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| EngineError::Database(format!("Rollback commit failed: {}", e)))?;

        tracing::debug!(
            activity_id,
            restores = restores.len(),
            deletions = deletions.len(),
            "Rollback committed"
        );

        Ok(())
    }

    async fn get_activity(&self, activity_id: u64) -> Result<Option<Activity>, EngineError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(&activity_id.to_string())
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    async fn activity_totals(&self, user_id: &str) -> Result<ActivityTotals, EngineError> {
        let user_id = user_id.to_string();
        let activities: Vec<Activity> = self
            .client
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;

        let mut totals = ActivityTotals::default();
        for activity in &activities {
            totals.count += 1;
            totals.distance_meters += activity.distance_meters;
        }
        Ok(totals)
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, EngineError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), EngineError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get_leaderboard(
        &self,
        leaderboard_type: &str,
    ) -> Result<Option<LeaderboardCache>, EngineError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::LEADERBOARDS)
            .obj()
            .one(leaderboard_type)
            .await
            .map_err(|e| EngineError::Database(e.to_string()))
    }

    async fn set_leaderboard(&self, cache: &LeaderboardCache) -> Result<(), EngineError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::LEADERBOARDS)
            .document_id(&cache.leaderboard_type)
            .object(cache)
            .execute()
            .await
            .map_err(|e| EngineError::Database(e.to_string()))?;
        Ok(())
    }
}
