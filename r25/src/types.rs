// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new id from its numeric value.
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the numeric value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Identifier of an R25 event.
    EventId
);

numeric_id!(
    /// Identifier of an R25 reservation.
    ReservationId
);

numeric_id!(
    /// Identifier of an R25 space.
    SpaceId
);

/// Object type codes understood by the R25 favorites service.
pub mod object_type {
    /// Event objects.
    pub const EVENT: u32 = 1;
    /// Organization objects.
    pub const ORGANIZATION: u32 = 2;
    /// Space objects.
    pub const SPACE: u32 = 4;
    /// Resource objects.
    pub const RESOURCE: u32 = 6;
}

/// State codes carried by events and reservations.
pub mod state {
    /// Event is tentative.
    pub const EVENT_TENTATIVE: &str = "1";
    /// Event is confirmed.
    pub const EVENT_CONFIRMED: &str = "2";
    /// Event is cancelled.
    pub const EVENT_CANCELLED: &str = "99";

    /// Reservation is in standard state.
    pub const RESERVATION_STANDARD: &str = "1";
    /// Reservation is cancelled.
    pub const RESERVATION_CANCELLED: &str = "99";
}
