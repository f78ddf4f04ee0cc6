// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory R25 server.
//!
//! Accepted documents are stored the way the server would return them on
//! the next edit fetch: deleted nodes dropped, new reservations numbered,
//! every tracked node back to `est`.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use booksync_core::Remote;
use booksync_r25::{
    ChangeStatus, Document, EventId, EventSummary, FavoriteObject, NodeId, R25Error, SpaceId,
    WriteOutcome,
};

const BLANK_EVENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<r25:events xmlns:r25="http://www.collegenet.com/r25">
  <r25:event status="new">
    <r25:event_id>{id}</r25:event_id>
    <r25:event_name/>
    <r25:organization status="new"><r25:organization_id/></r25:organization>
    <r25:profile status="new"><r25:reservation status="new"/></r25:profile>
  </r25:event>
</r25:events>"#;

#[derive(Debug, Default)]
struct State {
    events: BTreeMap<u64, Document>,
    next_event_id: u64,
    next_reservation_id: u64,
    spaces: HashMap<String, u64>,
    favorites: BTreeSet<u64>,
    space_search: Option<Document>,
    scripted: VecDeque<WriteOutcome>,
    fail_lists: bool,
    throttle_blanks: bool,
    blanks: usize,
    submissions: usize,
    deleted: Vec<u64>,
}

#[derive(Debug)]
pub struct FakeRemote {
    state: Mutex<State>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_event_id: 5_550_001,
                next_reservation_id: 9_001,
                ..State::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_space(self, short_name: &str, space_id: u64) -> Self {
        self.state().spaces.insert(short_name.to_string(), space_id);
        self
    }

    /// Stores an event as if an earlier run or another writer created it.
    pub fn seed_event(&self, xml: &str) -> EventId {
        let doc = Document::from_xml(xml).unwrap();
        let event = event_node(&doc);
        let id: u64 = doc.child_text(event, "event_id").unwrap().parse().unwrap();
        self.state().events.insert(id, doc);
        EventId::new(id)
    }

    pub fn seed_favorites(&self, ids: &[u64]) {
        self.state().favorites.extend(ids);
    }

    pub fn seed_space_search(&self, xml: &str) {
        self.state().space_search = Some(Document::from_xml(xml).unwrap());
    }

    /// Answers the next event submission with `outcome` instead of accepting it.
    pub fn script(&self, outcome: WriteOutcome) {
        self.state().scripted.push_back(outcome);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.state().fail_lists = fail;
    }

    /// Answers event creation with HTTP 429.
    pub fn throttle_blanks(&self, throttle: bool) {
        self.state().throttle_blanks = throttle;
    }

    pub fn event(&self, id: EventId) -> Option<Document> {
        self.state().events.get(&id.get()).cloned()
    }

    pub fn summaries(&self) -> Vec<EventSummary> {
        self.state()
            .events
            .values()
            .flat_map(|doc| EventSummary::list_from(doc).unwrap())
            .collect()
    }

    pub fn favorite_ids(&self) -> BTreeSet<u64> {
        self.state().favorites.clone()
    }

    pub fn space_search(&self) -> Option<Document> {
        self.state().space_search.clone()
    }

    pub fn blanks(&self) -> usize {
        self.state().blanks
    }

    pub fn submissions(&self) -> usize {
        self.state().submissions
    }

    pub fn deleted(&self) -> Vec<u64> {
        self.state().deleted.clone()
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn create_blank_event(&self) -> Result<Document, R25Error> {
        let mut state = self.state();
        if state.throttle_blanks {
            return Err(R25Error::RateLimited("event.xml".to_string()));
        }
        let id = state.next_event_id;
        state.next_event_id += 1;
        state.blanks += 1;
        Document::from_xml(&BLANK_EVENT.replace("{id}", &id.to_string()))
    }

    async fn fetch_editable_event(&self, event_id: EventId) -> Result<Document, R25Error> {
        self.state()
            .events
            .get(&event_id.get())
            .cloned()
            .ok_or_else(|| R25Error::Http(format!("event {event_id} not found")))
    }

    async fn submit_event(
        &self,
        event_id: EventId,
        doc: &Document,
    ) -> Result<WriteOutcome, R25Error> {
        let mut state = self.state();
        state.submissions += 1;
        if let Some(outcome) = state.scripted.pop_front() {
            return Ok(outcome);
        }

        let mut stored = doc.clone();
        let root = stored.root();
        let mut next = state.next_reservation_id;
        establish(&mut stored, root, &mut next);
        state.next_reservation_id = next;
        state.events.insert(event_id.get(), stored.clone());
        Ok(WriteOutcome::Success(stored))
    }

    async fn delete_event(&self, event_id: EventId) -> Result<(), R25Error> {
        let mut state = self.state();
        state.events.remove(&event_id.get());
        state.deleted.push(event_id.get());
        Ok(())
    }

    async fn list_events(&self, params: &[(&str, &str)]) -> Result<Vec<EventSummary>, R25Error> {
        if self.state().fail_lists {
            return Err(R25Error::Http("503 Service Unavailable".to_string()));
        }

        let events = self.summaries();
        Ok(events
            .into_iter()
            .filter(|e| {
                params.iter().all(|&(key, value)| match key {
                    "starts_with" => e.name.starts_with(value),
                    "alien_uid" => e.alien_uid.as_deref() == Some(value),
                    "event_id" => e.event_id.to_string() == value,
                    _ => true,
                })
            })
            .collect())
    }

    async fn space_by_short_name(&self, short_name: &str) -> Result<Option<SpaceId>, R25Error> {
        Ok(self.state().spaces.get(short_name).copied().map(SpaceId::new))
    }

    async fn favorites(&self, _object_type: u32) -> Result<Vec<FavoriteObject>, R25Error> {
        Ok(self
            .state()
            .favorites
            .iter()
            .map(|&id| FavoriteObject { id, name: None })
            .collect())
    }

    async fn add_favorite(
        &self,
        _object_type: u32,
        object_id: u64,
    ) -> Result<WriteOutcome, R25Error> {
        self.state().favorites.insert(object_id);
        Ok(WriteOutcome::Success(Document::new("r25:favorites")))
    }

    async fn delete_favorite(&self, _object_type: u32, object_id: u64) -> Result<(), R25Error> {
        self.state().favorites.remove(&object_id);
        Ok(())
    }

    async fn fetch_space_search(&self, _query_id: &str) -> Result<Document, R25Error> {
        self.state()
            .space_search
            .clone()
            .ok_or_else(|| R25Error::Http("no saved search".to_string()))
    }

    async fn submit_space_search(
        &self,
        _query_id: &str,
        doc: &Document,
    ) -> Result<WriteOutcome, R25Error> {
        let mut stored = doc.clone();
        let root = stored.root();
        let mut next = 0;
        establish(&mut stored, root, &mut next);
        self.state().space_search = Some(stored.clone());
        Ok(WriteOutcome::Success(stored))
    }

    fn event_link(&self, event_id: EventId) -> String {
        format!("https://live.test/event/{event_id}")
    }
}

fn event_node(doc: &Document) -> NodeId {
    doc.child(doc.root(), "event").unwrap()
}

fn establish(doc: &mut Document, id: NodeId, next_reservation: &mut u64) {
    if doc.local_name(id) == "reservation" && doc.child(id, "reservation_id").is_none() {
        doc.set_value(id, "reservation_id", Some(&next_reservation.to_string()));
        *next_reservation += 1;
    }
    for child in doc.children(id).to_vec() {
        if doc.status(child) == Some(ChangeStatus::Deleted) {
            doc.detach(child);
        } else {
            establish(doc, child, next_reservation);
        }
    }
    if doc.status(id).is_some() {
        doc.set_status(id, Some(ChangeStatus::Established));
    }
}
