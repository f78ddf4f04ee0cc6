// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Typed views over R25 list documents.

use std::str::FromStr;

use crate::document::{Document, NodeId};
use crate::error::R25Error;
use crate::types::{EventId, ReservationId, SpaceId};

/// An event as returned by `events.xml?scope=extended&include=reservations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSummary {
    /// Event id.
    pub event_id: EventId,
    /// Event name.
    pub name: String,
    /// Stable identifier assigned by the system that created the event.
    pub alien_uid: Option<String>,
    /// Reservations, one per profile.
    pub reservations: Vec<ReservationSummary>,
}

/// A reservation belonging to an [`EventSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationSummary {
    /// Reservation id.
    pub reservation_id: ReservationId,
    /// Name of the owning profile.
    pub profile_name: Option<String>,
    /// Reservation state code.
    pub state: Option<String>,
    /// Reservation start, including setup.
    pub start: Option<String>,
    /// Reservation end, including takedown.
    pub end: Option<String>,
    /// Start of the booked time itself.
    pub event_start: Option<String>,
    /// End of the booked time itself.
    pub event_end: Option<String>,
    /// Bound space, if any.
    pub space_id: Option<SpaceId>,
}

impl EventSummary {
    /// Reads every event of a list document.
    ///
    /// # Errors
    ///
    /// Returns an error if an event or reservation id is missing or not numeric.
    pub fn list_from(doc: &Document) -> Result<Vec<Self>, R25Error> {
        descendants(doc, doc.root(), "event")
            .into_iter()
            .map(|event| Self::from_node(doc, event))
            .collect()
    }

    fn from_node(doc: &Document, event: NodeId) -> Result<Self, R25Error> {
        let mut reservations = Vec::new();
        for profile in doc.children_named(event, "profile") {
            let profile_name = doc.child_text(profile, "profile_name");
            for reservation in doc.children_named(profile, "reservation") {
                let text = |name: &str| doc.child_text(reservation, name).map(ToString::to_string);
                let space_id = doc
                    .descend(reservation, &["space_reservation", "space_id"])
                    .and_then(|n| doc.text(n))
                    .map(|s| parse_id(s, "space_id"))
                    .transpose()?;

                reservations.push(ReservationSummary {
                    reservation_id: required_id(doc, reservation, "reservation_id")?,
                    profile_name: profile_name.map(ToString::to_string),
                    state: text("reservation_state"),
                    start: text("reservation_start_dt"),
                    end: text("reservation_end_dt"),
                    event_start: text("event_start_dt"),
                    event_end: text("event_end_dt"),
                    space_id,
                });
            }
        }

        Ok(Self {
            event_id: required_id(doc, event, "event_id")?,
            name: doc.child_text(event, "event_name").unwrap_or_default().to_string(),
            alien_uid: doc.child_text(event, "alien_uid").map(ToString::to_string),
            reservations,
        })
    }

    /// Whether the first reservation is bound to a space.
    #[must_use]
    pub fn has_space(&self) -> bool {
        self.reservations
            .first()
            .is_some_and(|r| r.space_id.is_some())
    }
}

/// An entry of the favorites list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteObject {
    /// Object id.
    pub id: u64,
    /// Object name.
    pub name: Option<String>,
}

impl FavoriteObject {
    /// Reads every object of a favorites document.
    ///
    /// # Errors
    ///
    /// Returns an error if an object id is missing or not numeric.
    pub fn list_from(doc: &Document) -> Result<Vec<Self>, R25Error> {
        descendants(doc, doc.root(), "object")
            .into_iter()
            .map(|node| {
                Ok(Self {
                    id: required_id(doc, node, "object_id")?,
                    name: doc.child_text(node, "object_name").map(ToString::to_string),
                })
            })
            .collect()
    }
}

/// Reads the id of every space in a `spaces.xml` document.
///
/// # Errors
///
/// Returns an error if a space id is missing or not numeric.
pub fn space_ids_from(doc: &Document) -> Result<Vec<SpaceId>, R25Error> {
    descendants(doc, doc.root(), "space")
        .into_iter()
        .map(|node| required_id(doc, node, "space_id"))
        .collect()
}

fn descendants(doc: &Document, id: NodeId, local_name: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    for &child in doc.children(id) {
        if doc.local_name(child) == local_name {
            found.push(child);
        } else {
            found.extend(descendants(doc, child, local_name));
        }
    }
    found
}

fn required_id<T>(doc: &Document, node: NodeId, name: &str) -> Result<T, R25Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let text = doc
        .child_text(node, name)
        .ok_or_else(|| R25Error::InvalidResponse(format!("missing {name}")))?;
    parse_id(text, name)
}

fn parse_id<T>(text: &str, name: &str) -> Result<T, R25Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|e| R25Error::InvalidResponse(format!("invalid {name} '{text}': {e}")))
}
