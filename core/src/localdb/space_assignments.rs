// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::SqlitePool;

use crate::localdb::{db_id, from_db_id, now_stamp};

#[derive(Debug, Clone)]
pub struct SpaceAssignments {
    pool: SqlitePool,
}

impl SpaceAssignments {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Makes sure a row exists for the room, leaving an existing row untouched.
    pub async fn ensure(&self, room_id: u64) -> Result<(), sqlx::Error> {
        const SQL: &str = "
INSERT INTO space_assignments (room_id, space_id, date_changed)
VALUES (?, NULL, ?)
ON CONFLICT(room_id) DO NOTHING;
";

        sqlx::query(SQL)
            .bind(db_id(room_id)?)
            .bind(now_stamp())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Sets the space of a room only if none is set yet.
    ///
    /// Returns whether the row was updated.
    pub async fn populate_if_null(&self, room_id: u64, space_id: u64) -> Result<bool, sqlx::Error> {
        const SQL: &str = "
UPDATE space_assignments
SET space_id = ?, date_changed = ?
WHERE room_id = ? AND space_id IS NULL;
";

        let result = sqlx::query(SQL)
            .bind(db_id(space_id)?)
            .bind(now_stamp())
            .bind(db_id(room_id)?)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, room_id: u64) -> Result<Option<SpaceAssignmentRecord>, sqlx::Error> {
        const SQL: &str = "
SELECT room_id, space_id, date_changed
FROM space_assignments
WHERE room_id = ?;
";

        sqlx::query_as(SQL)
            .bind(db_id(room_id)?)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<SpaceAssignmentRecord>, sqlx::Error> {
        const SQL: &str = "
SELECT room_id, space_id, date_changed
FROM space_assignments
ORDER BY room_id;
";

        sqlx::query_as(SQL).fetch_all(&self.pool).await
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SpaceAssignmentRecord {
    pub room_id: i64,
    pub space_id: Option<i64>,
    pub date_changed: String,
}

impl SpaceAssignmentRecord {
    pub fn room_id(&self) -> Result<u64, sqlx::Error> {
        from_db_id(self.room_id)
    }

    pub fn space_id(&self) -> Result<Option<u64>, sqlx::Error> {
        self.space_id.map(from_db_id).transpose()
    }
}
