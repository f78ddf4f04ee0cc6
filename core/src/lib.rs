// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of external room bookings into R25 events.

mod config;
mod directory;
mod error;
mod localdb;
mod model;
mod patch;
mod reconcile;
mod remote;
mod report;
mod source;
mod status_map;
mod sync;

pub use crate::config::{
    APP_NAME, Config, FavoritesConfig, MatchMode, ReportConfig, SourceConfig, SyncConfig,
};
pub use crate::directory::{EXCLUDED_ROOM_PREFIX, FavoritesDiff, SpaceDirectory};
pub use crate::error::{PatchError, SyncError};
pub use crate::localdb::{
    LocalDb, SpaceAssignmentRecord, SpaceAssignments, StatusMapRecord, StatusMaps,
};
pub use crate::model::{
    Booking, EventState, LogicalEvent, Naming, ReservationProfile, ReservationState, Room, Status,
    fold_ascii, iso_duration, r25_date, r25_datetime,
};
pub use crate::patch::{Patched, apply, prepare_blank};
pub use crate::reconcile::{
    GroupOutcome, Reconciler, RunMode, RunSummary, Settings, group_bookings,
};
pub use crate::remote::Remote;
pub use crate::report::{FileSink, LogSink, REPORT_SUBJECT, Report, ReportSink};
pub use crate::source::{
    BookingFilter, BookingQuery, BookingSource, HttpBookingSource, SourceError,
};
pub use crate::status_map::{StatusAction, StatusMapping, StatusRules, StatusTable};
pub use crate::sync::{RunOptions, RunResult, Syncer, WindowEnd};
