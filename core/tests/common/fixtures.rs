// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use booksync_core::{
    Booking, BookingFilter, BookingQuery, BookingSource, Config, FavoritesConfig, LocalDb,
    MatchMode, ReportConfig, ReportSink, Room, RunMode, RunOptions, RunResult, SourceConfig,
    SourceError, Status, SyncConfig, SyncError, Syncer, WindowEnd,
};
use booksync_r25::{AuthMethod, R25Config};
use jiff::Zoned;
use jiff::civil::date;

use super::fake_remote::FakeRemote;

pub const TIME_ZONE: &str = "America/Los_Angeles";

pub const CONFIRMED: u64 = 1;
pub const CANCELLED: u64 = 2;
pub const TENTATIVE: u64 = 3;
pub const INTERNAL_HOLD: u64 = 4;
pub const WAITLIST: u64 = 5;

pub const KNE_225: u64 = 10;
pub const KNE_130: u64 = 11;
pub const VIRTUAL: u64 = 12;
pub const OFFSITE: u64 = 13;

pub const SPACE_KNE_225: u64 = 100;
pub const SPACE_KNE_130: u64 = 110;

/// Creates a configuration pointing at nothing real.
pub fn test_config() -> Config {
    Config {
        state_dir: None,
        r25: R25Config {
            base_url: "https://r25.test".to_string(),
            instance: None,
            auth: AuthMethod::None,
            timeout_secs: 5,
            user_agent: "booksync-tests".to_string(),
            live_url: Some("https://live.test".to_string()),
        },
        source: SourceConfig {
            base_url: "https://bookings.test".to_string(),
            api_key: "secret".to_string(),
            timeout_secs: 5,
            time_zone: Some(TIME_ZONE.to_string()),
        },
        sync: SyncConfig {
            organization_id: "4321".to_string(),
            match_mode: MatchMode::NamePrefix,
            uid_prefix: "BKS".to_string(),
            default_event_type_id: Some(433),
            event_type_map: HashMap::from([("Tentative".to_string(), 500)]),
            ignore_statuses: vec!["Internal Hold".to_string()],
            remove_statuses: vec!["Cancelled".to_string()],
            favorites: FavoritesConfig::Favorites,
            default_window_days: 7,
        },
        report: ReportConfig::default(),
    }
}

/// R25 with the spaces of the standard rooms.
pub fn test_remote() -> FakeRemote {
    FakeRemote::new()
        .with_space("KNE 225", SPACE_KNE_225)
        .with_space("KNE 130", SPACE_KNE_130)
}

pub fn test_statuses() -> Vec<Status> {
    let status = |id, description: &str, blocks_space| Status {
        id,
        description: description.to_string(),
        blocks_space,
    };
    vec![
        status(CONFIRMED, "Confirmed", true),
        status(CANCELLED, "Cancelled", true),
        status(TENTATIVE, "Tentative", false),
        status(INTERNAL_HOLD, "Internal Hold", true),
        status(WAITLIST, "Waitlist", true),
    ]
}

pub fn test_rooms() -> Vec<Room> {
    let room = |id, description: &str| Room {
        id,
        description: description.to_string(),
        active: true,
    };
    vec![
        room(KNE_225, "KNE 225"),
        room(KNE_130, "KNE 130"),
        room(VIRTUAL, "__Virtual"),
        room(OFFSITE, "Offsite Hall"),
    ]
}

pub fn zoned(text: &str) -> Zoned {
    format!("{text}[{TIME_ZONE}]").parse().unwrap()
}

/// Builder for a booking on 2024-01-10, 09:00 to 10:00, in KNE 225.
#[derive(Debug, Clone)]
pub struct BookingBuilder {
    booking: Booking,
}

pub fn booking(id: u64, group_id: u64) -> BookingBuilder {
    BookingBuilder {
        booking: Booking {
            id,
            group_id,
            room_id: KNE_225,
            room_description: "KNE 225".to_string(),
            start: zoned("2024-01-10T09:00:00-08:00"),
            end: zoned("2024-01-10T10:00:00-08:00"),
            status_id: CONFIRMED,
            event_name: "Chemistry Seminar".to_string(),
            date_changed: None,
            setup_minutes: 0,
            teardown_minutes: 0,
        },
    }
}

#[allow(dead_code)]
impl BookingBuilder {
    pub fn room(mut self, room_id: u64, description: &str) -> Self {
        self.booking.room_id = room_id;
        self.booking.room_description = description.to_string();
        self
    }

    pub fn status(mut self, status_id: u64) -> Self {
        self.booking.status_id = status_id;
        self
    }

    pub fn times(mut self, start: &str, end: &str) -> Self {
        self.booking.start = zoned(start);
        self.booking.end = zoned(end);
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.booking.event_name = name.to_string();
        self
    }

    pub fn setup(mut self, minutes: i64) -> Self {
        self.booking.setup_minutes = minutes;
        self
    }

    pub fn teardown(mut self, minutes: i64) -> Self {
        self.booking.teardown_minutes = minutes;
        self
    }

    pub fn changed(mut self, at: &str) -> Self {
        self.booking.date_changed = Some(zoned(at));
        self
    }

    pub fn build(self) -> Booking {
        self.booking
    }
}

#[derive(Debug, Default)]
struct SourceState {
    bookings: Vec<Booking>,
    statuses: Vec<Status>,
    rooms: Vec<Room>,
    queries: Vec<BookingQuery>,
    fail_rooms: bool,
}

/// Booking source serving fixed lists, filtered like the real API.
#[derive(Debug, Default)]
pub struct TestSource {
    state: Mutex<SourceState>,
}

#[allow(dead_code)]
impl TestSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SourceState {
                statuses: test_statuses(),
                rooms: test_rooms(),
                ..SourceState::default()
            }),
        }
    }

    pub fn set_bookings(&self, bookings: Vec<Booking>) {
        self.state.lock().unwrap().bookings = bookings;
    }

    pub fn fail_rooms(&self, fail: bool) {
        self.state.lock().unwrap().fail_rooms = fail;
    }

    pub fn last_query(&self) -> Option<BookingQuery> {
        self.state.lock().unwrap().queries.last().cloned()
    }
}

#[async_trait]
impl BookingSource for TestSource {
    async fn list_bookings(&self, query: &BookingQuery) -> Result<Vec<Booking>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());

        let in_window = |b: &Booking| {
            b.start >= query.start && query.end.as_ref().is_none_or(|end| &b.start < end)
        };
        Ok(state
            .bookings
            .iter()
            .filter(|b| query.status_ids.contains(&b.status_id))
            .filter(|b| match query.filter {
                BookingFilter::All => in_window(b),
                BookingFilter::ChangedSince(since) => {
                    in_window(b) && b.date_changed.as_ref().is_some_and(|d| d.date() >= since)
                }
                BookingFilter::Booking(id) => b.id == id,
                BookingFilter::Group(id) => in_window(b) && b.group_id == id,
            })
            .cloned()
            .collect())
    }

    async fn list_statuses(&self) -> Result<Vec<Status>, SourceError> {
        Ok(self.state.lock().unwrap().statuses.clone())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, SourceError> {
        let state = self.state.lock().unwrap();
        if state.fail_rooms {
            return Err(SourceError::Status {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }
        Ok(state.rooms.clone())
    }
}

/// Report sink keeping every delivered report.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportSink for CollectingSink {
    async fn send(&self, subject: &str, body: &str) -> io::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::other("mailbox unavailable"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Run options for the week of 2024-01-08.
pub fn week(mode: RunMode) -> RunOptions {
    RunOptions {
        start: date(2024, 1, 8),
        end: WindowEnd::Until(date(2024, 1, 15)),
        filter: BookingFilter::All,
        mode,
    }
}

pub const UPDATE: RunMode = RunMode {
    delete: false,
    update: true,
};

pub const DRY_RUN: RunMode = RunMode {
    delete: false,
    update: false,
};

/// A syncer wired to in-memory collaborators.
pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub source: Arc<TestSource>,
    pub sink: CollectingSink,
    pub db: LocalDb,
    pub syncer: Syncer,
}

#[allow(dead_code)]
impl Harness {
    pub async fn new() -> Self {
        Self::with(test_config(), test_remote()).await
    }

    pub async fn with(config: Config, remote: FakeRemote) -> Self {
        let remote = Arc::new(remote);
        let source = Arc::new(TestSource::new());
        let sink = CollectingSink::default();
        let db = LocalDb::open(None).await.unwrap();
        let syncer = Syncer::with_parts(
            config,
            db.clone(),
            remote.clone(),
            source.clone(),
            Box::new(sink.clone()),
        )
        .unwrap();

        Self {
            remote,
            source,
            sink,
            db,
            syncer,
        }
    }

    pub fn bookings(&self, bookings: Vec<BookingBuilder>) {
        self.source
            .set_bookings(bookings.into_iter().map(BookingBuilder::build).collect());
    }

    /// Runs over the standard week and expects the run to complete.
    pub async fn run(&self, mode: RunMode) -> RunResult {
        self.syncer.run(&week(mode)).await.unwrap()
    }

    pub async fn try_run(&self, options: &RunOptions) -> Result<RunResult, SyncError> {
        self.syncer.run(options).await
    }
}

/// An established R25 event as returned by an edit fetch.
///
/// Each reservation is `(profile_name, reservation_id, space_id)`.
pub fn event_xml(event_id: u64, name: &str, reservations: &[(&str, u64, Option<u64>)]) -> String {
    let mut profiles = String::new();
    for (profile_name, reservation_id, space_id) in reservations {
        let space = space_id.map_or_else(String::new, |id| {
            format!(
                r#"<r25:space_reservation status="est"><r25:space_id>{id}</r25:space_id></r25:space_reservation>"#
            )
        });
        profiles.push_str(&format!(
            r#"<r25:profile status="est">
      <r25:profile_name>{profile_name}</r25:profile_name>
      <r25:init_start_dt>2024-01-10T09:00:00-08:00</r25:init_start_dt>
      <r25:init_end_dt>2024-01-10T10:00:00-08:00</r25:init_end_dt>
      <r25:reservation status="est">
        <r25:reservation_id>{reservation_id}</r25:reservation_id>
        <r25:reservation_start_dt>2024-01-10T09:00:00-08:00</r25:reservation_start_dt>
        <r25:reservation_end_dt>2024-01-10T10:00:00-08:00</r25:reservation_end_dt>
        <r25:event_start_dt>2024-01-10T09:00:00-08:00</r25:event_start_dt>
        <r25:event_end_dt>2024-01-10T10:00:00-08:00</r25:event_end_dt>
        <r25:reservation_state>1</r25:reservation_state>
        {space}
      </r25:reservation>
    </r25:profile>"#
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<r25:events xmlns:r25="http://www.collegenet.com/r25">
  <r25:event status="est">
    <r25:event_id>{event_id}</r25:event_id>
    <r25:event_name>{name}</r25:event_name>
    <r25:state>2</r25:state>
    <r25:organization status="est">
      <r25:organization_id>4321</r25:organization_id>
      <r25:primary>T</r25:primary>
    </r25:organization>
    {profiles}
  </r25:event>
</r25:events>"#
    )
}
