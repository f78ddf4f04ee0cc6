// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use booksync_r25::{EventId, ReservationId, SpaceId, state};
use jiff::civil::Date;
use jiff::{SignedDuration, Zoned};
use unicode_normalization::UnicodeNormalization;

/// Timestamp layout understood by R25.
const R25_DATETIME: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Longest event name prefix kept from the source title.
const NAME_TITLE_LEN: usize = 30;

/// One record from the booking source.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    /// Booking identifier.
    pub id: u64,
    /// Identifier of the source event grouping this booking.
    pub group_id: u64,
    /// Room identifier.
    pub room_id: u64,
    /// Room display name.
    pub room_description: String,
    /// Start of the booked time.
    pub start: Zoned,
    /// End of the booked time.
    pub end: Zoned,
    /// Status identifier.
    pub status_id: u64,
    /// Event name as entered in the source.
    pub event_name: String,
    /// Last change in the source.
    pub date_changed: Option<Zoned>,
    /// Setup time before the booking, in minutes.
    pub setup_minutes: i64,
    /// Teardown time after the booking, in minutes.
    pub teardown_minutes: i64,
}

/// A booking status known to the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Status identifier.
    pub id: u64,
    /// Display name, used to match the configured status lists.
    pub description: String,
    /// Whether bookings in this status hold their room.
    pub blocks_space: bool,
}

/// A room known to the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Room identifier.
    pub id: u64,
    /// Display name, matched against R25 space short names.
    pub description: String,
    /// Whether the room is still in use.
    pub active: bool,
}

/// Event state as written to R25.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    Confirmed,
    Cancelled,
}

impl EventState {
    pub const fn code(self) -> &'static str {
        match self {
            EventState::Confirmed => state::EVENT_CONFIRMED,
            EventState::Cancelled => state::EVENT_CANCELLED,
        }
    }
}

/// Reservation state as written to R25.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationState {
    Standard,
    Cancelled,
}

impl ReservationState {
    pub const fn code(self) -> &'static str {
        match self {
            ReservationState::Standard => state::RESERVATION_STANDARD,
            ReservationState::Cancelled => state::RESERVATION_CANCELLED,
        }
    }
}

/// The bookings of one source group, mapped onto exactly one R25 event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalEvent {
    /// Source grouping identifier.
    pub group_id: u64,
    /// R25 event, once known.
    pub event_id: Option<EventId>,
    /// Stable identifier stored in the event's `alien_uid`.
    pub alien_uid: String,
    /// Event name, `<group>_<TITLE>`.
    pub name: String,
    /// Event title.
    pub title: String,
    pub start_date: Date,
    pub end_date: Date,
    pub state: EventState,
    /// R25 event type, when the status mapping defines one.
    pub event_type_id: Option<i64>,
    /// Owning organization, marked primary.
    pub organization_id: String,
    /// One profile per booking, in booking order.
    pub profiles: Vec<ReservationProfile>,
}

/// One booking inside a [`LogicalEvent`], mapped onto one R25 profile/reservation pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationProfile {
    /// Source booking identifier.
    pub booking_id: u64,
    /// Stable identifier stored as the R25 profile name.
    pub name: String,
    /// Existing R25 reservation, if a previous run created one.
    pub reservation_id: Option<ReservationId>,
    pub start: Zoned,
    pub end: Zoned,
    pub state: ReservationState,
    /// Space to bind, `None` to clear any binding.
    pub space_id: Option<SpaceId>,
    pub setup_minutes: i64,
    pub teardown_minutes: i64,
}

impl ReservationProfile {
    /// Start of the reservation including setup, end including teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if the shifted time is out of range.
    pub fn reservation_window(&self) -> Result<(Zoned, Zoned), jiff::Error> {
        let start = self
            .start
            .checked_sub(padding(self.setup_minutes))?;
        let end = self.end.checked_add(padding(self.teardown_minutes))?;
        Ok((start, end))
    }

    pub fn setup_duration(&self) -> Option<String> {
        iso_duration(self.setup_minutes)
    }

    pub fn teardown_duration(&self) -> Option<String> {
        iso_duration(self.teardown_minutes)
    }
}

/// Naming scheme shared by every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    prefix: String,
}

impl Naming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<prefix>_RSRV_<group>`
    pub fn alien_uid(&self, group_id: u64) -> String {
        format!("{}_RSRV_{group_id}", self.prefix)
    }

    /// `<prefix>_BOOK_<booking>`
    pub fn profile_name(&self, booking_id: u64) -> String {
        format!("{}_BOOK_{booking_id}", self.prefix)
    }

    /// Prefix every event name of a group starts with.
    pub fn name_prefix(group_id: u64) -> String {
        format!("{group_id}_")
    }

    /// Event name and title for a group's display name.
    pub fn name_and_title(group_id: u64, display_name: &str) -> (String, String) {
        let folded = fold_ascii(display_name);
        let short: String = folded.chars().take(NAME_TITLE_LEN).collect();
        let name = format!(
            "{}{}",
            Self::name_prefix(group_id),
            short.trim().to_uppercase()
        );
        (name, folded.trim().to_string())
    }
}

/// Setup or teardown minutes as a duration, saturating on overflow.
fn padding(minutes: i64) -> SignedDuration {
    SignedDuration::from_secs(minutes.max(0).saturating_mul(60))
}

/// Decomposes the text and drops everything outside ASCII.
pub fn fold_ascii(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}

/// Encodes minutes as `P[<d>D][T[<hh>H][<mm>M]]`, `None` for zero.
pub fn iso_duration(minutes: i64) -> Option<String> {
    if minutes <= 0 {
        return None;
    }

    let days = minutes / 1440;
    let hours = minutes / 60 - days * 24;
    let minutes = minutes % 60;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 {
        out.push('T');
    }
    if hours > 0 {
        out.push_str(&format!("{hours:02}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes:02}M"));
    }
    Some(out)
}

/// Formats a timestamp the way R25 stores it.
pub fn r25_datetime(time: &Zoned) -> String {
    time.strftime(R25_DATETIME).to_string()
}

/// Formats a date the way R25 stores it.
pub fn r25_date(date: Date) -> String {
    date.strftime("%Y-%m-%d").to_string()
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "booking {} ({})", self.id, self.group_id)
    }
}
