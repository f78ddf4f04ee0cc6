// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use booksync_r25::{
    Document, EventId, EventSummary, FavoriteObject, R25Client, R25Error, SpaceId, WriteOutcome,
};

/// Operations the engine needs from the scheduling system of record.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Blank editable event, with a fresh event id and a placeholder profile.
    async fn create_blank_event(&self) -> Result<Document, R25Error>;

    async fn fetch_editable_event(&self, event_id: EventId) -> Result<Document, R25Error>;

    async fn submit_event(&self, event_id: EventId, doc: &Document)
    -> Result<WriteOutcome, R25Error>;

    async fn delete_event(&self, event_id: EventId) -> Result<(), R25Error>;

    /// Events with their reservations, filtered by query parameters.
    async fn list_events(&self, params: &[(&str, &str)]) -> Result<Vec<EventSummary>, R25Error>;

    async fn space_by_short_name(&self, short_name: &str) -> Result<Option<SpaceId>, R25Error>;

    async fn favorites(&self, object_type: u32) -> Result<Vec<FavoriteObject>, R25Error>;

    async fn add_favorite(&self, object_type: u32, object_id: u64)
    -> Result<WriteOutcome, R25Error>;

    async fn delete_favorite(&self, object_type: u32, object_id: u64) -> Result<(), R25Error>;

    async fn fetch_space_search(&self, query_id: &str) -> Result<Document, R25Error>;

    async fn submit_space_search(
        &self,
        query_id: &str,
        doc: &Document,
    ) -> Result<WriteOutcome, R25Error>;

    /// Human-facing link to an event, used in reports.
    fn event_link(&self, event_id: EventId) -> String;
}

#[async_trait]
impl Remote for R25Client {
    async fn create_blank_event(&self) -> Result<Document, R25Error> {
        R25Client::create_blank_event(self).await
    }

    async fn fetch_editable_event(&self, event_id: EventId) -> Result<Document, R25Error> {
        R25Client::fetch_editable_event(self, event_id).await
    }

    async fn submit_event(
        &self,
        event_id: EventId,
        doc: &Document,
    ) -> Result<WriteOutcome, R25Error> {
        R25Client::submit_event(self, event_id, doc).await
    }

    async fn delete_event(&self, event_id: EventId) -> Result<(), R25Error> {
        R25Client::delete_event(self, event_id).await
    }

    async fn list_events(&self, params: &[(&str, &str)]) -> Result<Vec<EventSummary>, R25Error> {
        R25Client::list_events(self, params).await
    }

    async fn space_by_short_name(&self, short_name: &str) -> Result<Option<SpaceId>, R25Error> {
        R25Client::space_by_short_name(self, short_name).await
    }

    async fn favorites(&self, object_type: u32) -> Result<Vec<FavoriteObject>, R25Error> {
        R25Client::favorites(self, object_type).await
    }

    async fn add_favorite(
        &self,
        object_type: u32,
        object_id: u64,
    ) -> Result<WriteOutcome, R25Error> {
        R25Client::add_favorite(self, object_type, object_id).await
    }

    async fn delete_favorite(&self, object_type: u32, object_id: u64) -> Result<(), R25Error> {
        R25Client::delete_favorite(self, object_type, object_id).await
    }

    async fn fetch_space_search(&self, query_id: &str) -> Result<Document, R25Error> {
        R25Client::fetch_space_search(self, query_id).await
    }

    async fn submit_space_search(
        &self,
        query_id: &str,
        doc: &Document,
    ) -> Result<WriteOutcome, R25Error> {
        R25Client::submit_space_search(self, query_id, doc).await
    }

    fn event_link(&self, event_id: EventId) -> String {
        self.config().event_link(event_id)
    }
}
