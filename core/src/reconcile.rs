// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Convergence of booking groups onto R25 events.
//!
//! Each group of bookings maps onto one R25 event, each booking onto one
//! profile/reservation pair of that event. Groups are processed strictly
//! in the order the source first lists them; a failure in one group is
//! reported and never stops the others.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use booksync_r25::{
    EventId, EventSummary, R25Error, ReservationSummary, SpaceId, WriteOutcome, state,
};
use jiff::civil::Date;
use regex::Regex;

use crate::config::{MatchMode, SyncConfig};
use crate::directory::SpaceDirectory;
use crate::model::{
    Booking, EventState, LogicalEvent, Naming, ReservationProfile, ReservationState,
};
use crate::patch::{self, Patched};
use crate::remote::Remote;
use crate::report::Report;
use crate::status_map::{StatusAction, StatusTable};

/// Room descriptions with this prefix are unschedulable without a warning.
const SILENT_ROOM_PREFIX: &str = "__";

/// Settings shared by every group of a run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub naming: Naming,
    pub match_mode: MatchMode,
    pub organization_id: String,
}

impl Settings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            naming: Naming::new(config.uid_prefix.clone()),
            match_mode: config.match_mode,
            organization_id: config.organization_id.clone(),
        }
    }
}

/// Run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMode {
    /// Delete matched events instead of converging them.
    pub delete: bool,
    /// Write to R25; without it the run only logs what it would do.
    pub update: bool,
}

/// How one group ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    Created(EventId),
    Updated(EventId),
    /// The event already matched; nothing was submitted.
    Unchanged(EventId),
    /// Events removed by a delete-mode run.
    Deleted(usize),
    /// Nothing to do, or a dry run stopped before writing.
    Skipped,
    /// The submission raised conflict messages.
    Conflicts(EventId),
    /// R25 throttled the run and the group was abandoned; `None` when the
    /// event could not even be created.
    RateLimited(Option<EventId>),
    /// Locating, fetching, patching or submitting failed.
    Failed,
}

/// Counters over a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub groups: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub conflicts: usize,
    pub rate_limited: usize,
    pub failed: usize,
    /// Event documents sent to R25.
    pub submissions: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: GroupOutcome) {
        self.groups += 1;
        match outcome {
            GroupOutcome::Created(_) => self.created += 1,
            GroupOutcome::Updated(_) => self.updated += 1,
            GroupOutcome::Unchanged(_) => self.unchanged += 1,
            GroupOutcome::Deleted(n) => self.deleted += n,
            GroupOutcome::Skipped => self.skipped += 1,
            GroupOutcome::Conflicts(_) => self.conflicts += 1,
            GroupOutcome::RateLimited(_) => self.rate_limited += 1,
            GroupOutcome::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} groups: {} created, {} updated, {} unchanged, {} deleted, {} skipped, \
             {} with conflicts, {} rate limited, {} failed",
            self.groups,
            self.created,
            self.updated,
            self.unchanged,
            self.deleted,
            self.skipped,
            self.conflicts,
            self.rate_limited,
            self.failed,
        )
    }
}

/// Groups bookings by group id, in order of first appearance.
pub fn group_bookings(bookings: &[Booking]) -> Vec<(u64, Vec<&Booking>)> {
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut groups: Vec<(u64, Vec<&Booking>)> = Vec::new();
    for booking in bookings {
        let slot = *index.entry(booking.group_id).or_insert_with(|| {
            groups.push((booking.group_id, Vec::new()));
            groups.len() - 1
        });
        if let Some((_, members)) = groups.get_mut(slot) {
            members.push(booking);
        }
    }
    groups
}

/// Drives one run over a set of bookings.
pub struct Reconciler<'a> {
    remote: &'a dyn Remote,
    directory: &'a SpaceDirectory,
    statuses: &'a StatusTable,
    settings: &'a Settings,
    mode: RunMode,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        remote: &'a dyn Remote,
        directory: &'a SpaceDirectory,
        statuses: &'a StatusTable,
        settings: &'a Settings,
        mode: RunMode,
    ) -> Self {
        Self {
            remote,
            directory,
            statuses,
            settings,
            mode,
        }
    }

    pub async fn run(&self, bookings: &[Booking], report: &mut Report) -> RunSummary {
        let mut summary = RunSummary::default();
        let groups = group_bookings(bookings);
        let total = groups.len();

        for (n, (group_id, members)) in groups.into_iter().enumerate() {
            tracing::debug!(group_id, "processing booking group {}/{total}", n + 1);
            let outcome = self.reconcile_group(group_id, &members, report, &mut summary).await;
            tracing::debug!(group_id, ?outcome, "group done");
            summary.record(outcome);
        }
        summary
    }

    async fn reconcile_group(
        &self,
        group_id: u64,
        bookings: &[&Booking],
        report: &mut Report,
        summary: &mut RunSummary,
    ) -> GroupOutcome {
        for booking in bookings {
            tracing::debug!(
                booking_id = booking.id,
                group_id,
                status = self.statuses.describe(booking.status_id),
                room = booking.room_description,
                start = %booking.start,
                end = %booking.end,
                setup = booking.setup_minutes,
                teardown = booking.teardown_minutes,
                "{}",
                booking.event_name
            );
        }

        let located = match self.locate(group_id, report, summary).await {
            Ok(located) => located,
            Err(e) => {
                report.warn(format!(
                    "Error retrieving R25 Event, skipping booking group {group_id}: {e}"
                ));
                return GroupOutcome::Failed;
            }
        };

        if self.mode.delete {
            return self.delete(group_id, located.as_ref(), report).await;
        }

        let Some(event) = self.logical_event(group_id, bookings, located.as_ref(), report) else {
            tracing::debug!(group_id, "nothing wanted and nothing in R25");
            return GroupOutcome::Skipped;
        };

        self.converge(event, report, summary).await
    }

    /// Finds the R25 event of a group.
    ///
    /// With several matches the last one bound to a space wins, or the first
    /// one when none is. The other matches without a space are orphans left
    /// by earlier runs: reported, and deleted in update mode.
    async fn locate(
        &self,
        group_id: u64,
        report: &mut Report,
        summary: &mut RunSummary,
    ) -> Result<Option<EventSummary>, R25Error> {
        let (key, value) = match self.settings.match_mode {
            MatchMode::NamePrefix => ("starts_with", Naming::name_prefix(group_id)),
            MatchMode::AlienUid => ("alien_uid", self.settings.naming.alien_uid(group_id)),
        };
        let mut events = self.remote.list_events(&[(key, value.as_str())]).await?;

        if events.len() <= 1 {
            let found = events.pop();
            match &found {
                Some(e) => tracing::debug!(group_id, event_id = %e.event_id, "found R25 event {}", e.name),
                None => tracing::debug!(group_id, "no R25 event found"),
            }
            return Ok(found);
        }

        report.warn(format!("Found multiple R25 events for booking group {group_id}"));
        let chosen = events.iter().rposition(EventSummary::has_space).unwrap_or(0);
        for (i, event) in events.iter().enumerate() {
            if i == chosen || event.has_space() {
                continue;
            }
            report.warn(format!(
                "Found R25 event with no space reservation {}: {}",
                event.event_id, event.name
            ));
            if self.mode.update {
                tracing::debug!(event_id = %event.event_id, "deleting orphan");
                match self.remote.delete_event(event.event_id).await {
                    Ok(()) => summary.deleted += 1,
                    Err(e) => report.warn(format!(
                        "HTTP error while deleting R25 Event {}: {e}",
                        event.event_id
                    )),
                }
            }
        }

        let found = events.swap_remove(chosen);
        tracing::debug!(group_id, event_id = %found.event_id, "found R25 event {}", found.name);
        Ok(Some(found))
    }

    async fn delete(
        &self,
        group_id: u64,
        located: Option<&EventSummary>,
        report: &mut Report,
    ) -> GroupOutcome {
        let Some(event) = located else {
            tracing::debug!(group_id, "nothing to delete");
            return GroupOutcome::Skipped;
        };
        if !self.mode.update {
            tracing::info!(group_id, event_id = %event.event_id, "would delete R25 event");
            return GroupOutcome::Skipped;
        }

        match self.remote.delete_event(event.event_id).await {
            Ok(()) => GroupOutcome::Deleted(1),
            Err(e) => {
                report.warn(format!(
                    "HTTP error while deleting R25 Event {} for booking group {group_id}: {e}",
                    event.event_id
                ));
                GroupOutcome::Failed
            }
        }
    }

    /// Space a booking should hold, `None` when it is unwanted.
    fn wanted_space(
        &self,
        booking: &Booking,
        group_id: u64,
        report: &mut Report,
    ) -> Option<SpaceId> {
        match self.statuses.mapping(booking.status_id).and_then(|m| m.action) {
            Some(StatusAction::Add) => {}
            Some(StatusAction::Remove | StatusAction::Ignore) => return None,
            None => {
                report.warn(format!(
                    "No status mapping for booking {} ({group_id}): {}",
                    booking.id,
                    self.statuses.describe(booking.status_id)
                ));
                return None;
            }
        }

        let space = self.directory.space_for(booking.room_id);
        if space.is_none() && !booking.room_description.starts_with(SILENT_ROOM_PREFIX) {
            report.warn(format!(
                "No R25 space for booking {} ({group_id}): {}",
                booking.id, booking.room_description
            ));
        }
        space
    }

    /// Target state of a group, `None` when it has nothing to put in R25.
    fn logical_event(
        &self,
        group_id: u64,
        bookings: &[&Booking],
        located: Option<&EventSummary>,
        report: &mut Report,
    ) -> Option<LogicalEvent> {
        let first = bookings.first()?;
        let naming = &self.settings.naming;

        let existing: HashMap<&str, &ReservationSummary> = located
            .map(|e| {
                e.reservations
                    .iter()
                    .filter_map(|r| r.profile_name.as_deref().map(|n| (n, r)))
                    .collect()
            })
            .unwrap_or_default();

        let mut profiles = Vec::new();
        for booking in bookings {
            let name = naming.profile_name(booking.id);
            let reservation = existing.get(name.as_str()).map(|r| r.reservation_id);
            let (state, space_id) = match self.wanted_space(booking, group_id, report) {
                Some(space_id) => (ReservationState::Standard, Some(space_id)),
                None if reservation.is_some() => {
                    tracing::debug!(booking_id = booking.id, "cancelling reservation");
                    (ReservationState::Cancelled, None)
                }
                None => {
                    tracing::debug!(booking_id = booking.id, "not wanted, not in R25");
                    continue;
                }
            };
            profiles.push(ReservationProfile {
                booking_id: booking.id,
                name,
                reservation_id: reservation,
                start: booking.start.clone(),
                end: booking.end.clone(),
                state,
                space_id,
                setup_minutes: booking.setup_minutes,
                teardown_minutes: booking.teardown_minutes,
            });
        }

        if profiles.is_empty() && located.is_none() {
            return None;
        }

        // Reservations of the event that this run's bookings do not cover,
        // e.g. when a filter picked only part of the group.
        let covered: HashSet<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        let uncovered_active: Vec<&ReservationSummary> = located
            .map(|e| {
                e.reservations
                    .iter()
                    .filter(|r| {
                        r.profile_name.as_deref().is_none_or(|n| !covered.contains(n))
                            && r.state.as_deref() != Some(state::RESERVATION_CANCELLED)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let any_standard = profiles.iter().any(|p| p.state == ReservationState::Standard);
        let state = if any_standard || !uncovered_active.is_empty() {
            EventState::Confirmed
        } else {
            EventState::Cancelled
        };

        let start_date = bookings
            .iter()
            .map(|b| b.start.date())
            .chain(uncovered_active.iter().filter_map(|r| {
                local_date(r.event_start.as_deref().or(r.start.as_deref())?)
            }))
            .min()?;
        let end_date = bookings
            .iter()
            .map(|b| b.end.date())
            .chain(uncovered_active.iter().filter_map(|r| {
                local_date(r.event_end.as_deref().or(r.end.as_deref())?)
            }))
            .max()?;
        let (name, title) = Naming::name_and_title(group_id, &first.event_name);

        Some(LogicalEvent {
            group_id,
            event_id: located.map(|e| e.event_id),
            alien_uid: naming.alien_uid(group_id),
            name,
            title,
            start_date,
            end_date,
            state,
            event_type_id: self.event_type(bookings),
            organization_id: self.settings.organization_id.clone(),
            profiles,
        })
    }

    /// Event type of the first booking that stays in R25, else of the first booking.
    fn event_type(&self, bookings: &[&Booking]) -> Option<i64> {
        let kept = bookings.iter().find(|b| {
            self.statuses
                .mapping(b.status_id)
                .is_some_and(|m| m.action == Some(StatusAction::Add))
        });
        let booking = kept.or(bookings.first())?;
        self.statuses
            .mapping(booking.status_id)
            .and_then(|m| m.event_type_id)
    }

    async fn converge(
        &self,
        mut event: LogicalEvent,
        report: &mut Report,
        summary: &mut RunSummary,
    ) -> GroupOutcome {
        let group_id = event.group_id;
        let (mut doc, creating) = match event.event_id {
            Some(event_id) => match self.remote.fetch_editable_event(event_id).await {
                Ok(doc) => (doc, false),
                Err(e) => {
                    report.warn(format!(
                        "Error retrieving R25 Event, skipping booking group {group_id}: {e}"
                    ));
                    return GroupOutcome::Failed;
                }
            },
            None if !self.mode.update => {
                tracing::info!(group_id, name = event.name, "would create R25 event");
                return GroupOutcome::Skipped;
            }
            None => match self.remote.create_blank_event().await {
                Ok(doc) => (doc, true),
                Err(R25Error::RateLimited(_)) => {
                    report.warn(format!(
                        "Too Many Requests while creating R25 Event for booking group {group_id}"
                    ));
                    return GroupOutcome::RateLimited(None);
                }
                Err(e) => {
                    report.warn(format!(
                        "HTTP error while creating R25 Event for booking group {group_id}: {e}"
                    ));
                    return GroupOutcome::Failed;
                }
            },
        };

        if creating {
            match patch::prepare_blank(&mut doc) {
                Ok(event_id) => event.event_id = Some(event_id),
                Err(e) => {
                    report.warn(format!(
                        "R25 error while creating R25 Event for booking group {group_id}: {e}"
                    ));
                    return GroupOutcome::Failed;
                }
            }
        }
        let Some(event_id) = event.event_id else {
            return GroupOutcome::Failed;
        };

        match patch::apply(&mut doc, &event) {
            Ok(Patched::Unchanged) => {
                tracing::debug!(group_id, %event_id, "R25 event is up to date");
                return GroupOutcome::Unchanged(event_id);
            }
            Ok(Patched::Changed) => {}
            Err(e) => {
                report.warn(format!(
                    "R25 error while syncing booking group {group_id} to R25 Event {event_id}: {e}"
                ));
                return GroupOutcome::Failed;
            }
        }

        if !self.mode.update {
            tracing::info!(group_id, %event_id, "would update R25 event");
            return GroupOutcome::Skipped;
        }

        tracing::debug!(group_id, %event_id, "updating event");
        summary.submissions += 1;
        match self.remote.submit_event(event_id, &doc).await {
            Ok(WriteOutcome::Success(_)) => {
                tracing::info!(group_id, %event_id, "synced R25 event");
                if creating {
                    GroupOutcome::Created(event_id)
                } else {
                    GroupOutcome::Updated(event_id)
                }
            }
            Ok(WriteOutcome::Conflicts(messages)) => {
                for message in &messages {
                    if message.is_space_conflict() {
                        self.report_space_conflict(group_id, event_id, &message.text, report)
                            .await;
                    } else {
                        report.warn(format!(
                            "R25 message while syncing booking group {group_id} to R25 Event {event_id}: {message}"
                        ));
                    }
                }
                GroupOutcome::Conflicts(event_id)
            }
            Ok(WriteOutcome::Rejected(error)) => {
                report.warn(format!(
                    "R25 error while syncing booking group {group_id} to R25 Event {event_id}: {error}"
                ));
                GroupOutcome::Failed
            }
            Ok(WriteOutcome::RateLimited) => {
                report.warn(format!(
                    "Too Many Requests while syncing booking group {group_id} to R25 Event {event_id}"
                ));
                GroupOutcome::RateLimited(Some(event_id))
            }
            Err(e) => {
                report.warn(format!(
                    "HTTP error while syncing booking group {group_id} to R25 Event {event_id}: {e}"
                ));
                GroupOutcome::Failed
            }
        }
    }

    async fn report_space_conflict(
        &self,
        group_id: u64,
        event_id: EventId,
        text: &str,
        report: &mut Report,
    ) {
        report.warn(format!(
            "Conflict while syncing booking group {group_id}: {text}"
        ));
        let Some(blocking) = blocking_event_id(text) else {
            return;
        };

        let id = blocking.to_string();
        match self.remote.list_events(&[("event_id", id.as_str())]).await {
            Ok(events) if !events.is_empty() => {
                report.warn(format!("Existing event: {}", self.remote.event_link(blocking)));
            }
            _ => report.warn("Unknown event"),
        }
        report.warn(format!(
            "Is blocking event: {}",
            self.remote.event_link(event_id)
        ));
    }
}

/// Local date of an R25 datetime such as `2024-01-10T09:00:00-08:00`.
fn local_date(text: &str) -> Option<Date> {
    text.get(..10)?.parse().ok()
}

/// Event id embedded as `[<id>]` in a space conflict message.
fn blocking_event_id(text: &str) -> Option<EventId> {
    const RE: &str = r"\[(\d+)\]";
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let re = REGEX.get_or_init(|| Regex::new(RE).ok()).as_ref()?;

    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
