// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use booksync_r25::{R25Error, ReservationId};

use crate::source::SourceError;

/// Errors raised by the sync engine.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("R25 error: {0}")]
    Remote(#[from] R25Error),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Booking source error: {0}")]
    Source(#[from] SourceError),

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while patching an editable event document.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("document has no event element")]
    MissingEvent,

    #[error("event has no usable event_id: {0:?}")]
    InvalidEventId(Option<String>),

    #[error("reservation {0} no longer exists in the event")]
    MissingReservation(ReservationId),

    #[error("time out of range: {0}")]
    Time(#[from] jiff::Error),
}
