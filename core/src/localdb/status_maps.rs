// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use sqlx::SqlitePool;

use crate::localdb::{db_id, from_db_id, now_stamp};

#[derive(Debug, Clone)]
pub struct StatusMaps {
    pool: SqlitePool,
}

impl StatusMaps {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a mapping unless one already exists for the status.
    ///
    /// Returns whether a row was inserted.
    pub async fn insert_default(
        &self,
        status_id: u64,
        action: Option<&str>,
        event_type_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        const SQL: &str = "
INSERT INTO status_maps (status_id, action, event_type_id, date_changed)
VALUES (?, ?, ?, ?)
ON CONFLICT(status_id) DO NOTHING;
";

        let result = sqlx::query(SQL)
            .bind(db_id(status_id)?)
            .bind(action)
            .bind(event_type_id)
            .bind(now_stamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, status_id: u64) -> Result<Option<StatusMapRecord>, sqlx::Error> {
        const SQL: &str = "
SELECT status_id, action, event_type_id, date_changed
FROM status_maps
WHERE status_id = ?;
";

        sqlx::query_as(SQL)
            .bind(db_id(status_id)?)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list(&self) -> Result<Vec<StatusMapRecord>, sqlx::Error> {
        const SQL: &str = "
SELECT status_id, action, event_type_id, date_changed
FROM status_maps
ORDER BY status_id;
";

        sqlx::query_as(SQL).fetch_all(&self.pool).await
    }

    /// Operator edit of a mapping; automated runs never call this.
    #[cfg(test)]
    pub async fn set(
        &self,
        status_id: u64,
        action: Option<&str>,
        event_type_id: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        const SQL: &str = "
UPDATE status_maps
SET action = ?, event_type_id = ?, date_changed = ?
WHERE status_id = ?;
";

        sqlx::query(SQL)
            .bind(action)
            .bind(event_type_id)
            .bind(now_stamp())
            .bind(db_id(status_id)?)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusMapRecord {
    pub status_id: i64,
    pub action: Option<String>,
    pub event_type_id: Option<i64>,
    pub date_changed: String,
}

impl StatusMapRecord {
    pub fn status_id(&self) -> Result<u64, sqlx::Error> {
        from_db_id(self.status_id)
    }
}
