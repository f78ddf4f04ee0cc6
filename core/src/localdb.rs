// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

mod space_assignments;
mod status_maps;


use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use crate::localdb::space_assignments::{SpaceAssignmentRecord, SpaceAssignments};
pub use crate::localdb::status_maps::{StatusMapRecord, StatusMaps};

/// Local sqlite store for room/space assignments and status mappings.
#[derive(Debug, Clone)]
pub struct LocalDb {
    pool: SqlitePool,

    /// Room to space assignments.
    pub space_assignments: SpaceAssignments,
    /// Status to action mappings.
    pub status_maps: StatusMaps,
}

impl LocalDb {
    /// Opens a sqlite database connection.
    /// If `filename` is `None`, it opens an isolated in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(filename: Option<&Path>) -> Result<Self, sqlx::Error> {
        let (options, pool_options) = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            let options = SqliteConnectOptions::new()
                .filename(filename)
                .create_if_missing(true);
            (options, SqlitePoolOptions::new())
        } else {
            tracing::info!("connecting to in-memory SQLite database");
            // each connection would otherwise get its own empty database
            let options = SqliteConnectOptions::new().in_memory(true);
            let pool_options = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
            (options, pool_options)
        };

        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("src/localdb/migrations") // relative path from the crate root
            .run(&pool)
            .await?;

        tracing::debug!("ensuring tables in the database");
        Ok(LocalDb {
            space_assignments: SpaceAssignments::new(pool.clone()),
            status_maps: StatusMaps::new(pool.clone()),
            pool,
        })
    }

    /// Closes the database connection.
    pub async fn close(self) {
        tracing::debug!("closing database connection");
        self.pool.close().await;
    }
}

/// Converts an external identifier to the sqlite integer type.
fn db_id(id: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(id).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Converts a sqlite integer back to an external identifier.
fn from_db_id(id: i64) -> Result<u64, sqlx::Error> {
    u64::try_from(id).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn now_stamp() -> String {
    jiff::Timestamp::now().to_string()
}
