// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Minimal-diff patching of editable R25 event documents.
//!
//! Leaves are only rewritten when their value differs, and every rewrite
//! marks the ancestors of the leaf as modified (see
//! [`Document::set_value`]). A document whose event element is still
//! tagged `est` afterwards needs no submission.

use booksync_r25::{ChangeStatus, Document, EventId, NodeId, ReservationId};

use crate::error::PatchError;
use crate::model::{LogicalEvent, ReservationProfile, r25_date, r25_datetime};

/// Result of applying a [`LogicalEvent`] to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patched {
    /// Nothing differed; the document must not be submitted.
    Unchanged,
    /// The document carries changes to submit.
    Changed,
}

/// Takes the event id out of a blank event and drops its placeholder profile.
///
/// # Errors
///
/// Returns an error if the document has no event or no numeric event id.
pub fn prepare_blank(doc: &mut Document) -> Result<EventId, PatchError> {
    let event = event_node(doc)?;
    let text = doc.child_text(event, "event_id");
    let event_id = text
        .and_then(|t| t.parse::<EventId>().ok())
        .ok_or_else(|| PatchError::InvalidEventId(text.map(ToString::to_string)))?;

    if let Some(profile) = doc.child(event, "profile") {
        doc.detach(profile);
    }
    tracing::debug!(%event_id, "prepared blank event");
    Ok(event_id)
}

/// Brings the event of an editable document in line with `event`.
///
/// # Errors
///
/// Returns an error if the document has no event element, or if a profile
/// refers to a reservation the document no longer contains.
pub fn apply(doc: &mut Document, event: &LogicalEvent) -> Result<Patched, PatchError> {
    let enode = event_node(doc)?;
    let mut patcher = Patcher {
        doc,
        changed: false,
    };
    patcher.event(enode, event)?;

    let changed = patcher.changed;
    Ok(match doc.status(enode) {
        Some(ChangeStatus::Established) => Patched::Unchanged,
        None if !changed => Patched::Unchanged,
        _ => Patched::Changed,
    })
}

fn event_node(doc: &Document) -> Result<NodeId, PatchError> {
    let root = doc.root();
    if doc.local_name(root) == "event" {
        return Ok(root);
    }
    doc.child(root, "event").ok_or(PatchError::MissingEvent)
}

struct Patcher<'a> {
    doc: &'a mut Document,
    changed: bool,
}

impl Patcher<'_> {
    fn event(&mut self, enode: NodeId, event: &LogicalEvent) -> Result<(), PatchError> {
        self.set(enode, "alien_uid", Some(&event.alien_uid));
        self.set(enode, "event_name", Some(&event.name));
        self.set(enode, "event_title", Some(&event.title));
        self.set(enode, "start_date", Some(&r25_date(event.start_date)));
        self.set(enode, "end_date", Some(&r25_date(event.end_date)));
        self.set(enode, "state", Some(event.state.code()));
        if let Some(event_type_id) = event.event_type_id {
            self.set(enode, "event_type_id", Some(&event_type_id.to_string()));
        }
        self.set(enode, "node_type", Some("E"));

        let onode = self.child_or_add(enode, "organization");
        self.set(onode, "organization_id", Some(&event.organization_id));
        self.set(onode, "primary", Some("T"));

        for profile in &event.profiles {
            self.profile(enode, profile)?;
        }
        Ok(())
    }

    fn profile(&mut self, enode: NodeId, profile: &ReservationProfile) -> Result<(), PatchError> {
        let (pnode, rnode) = match profile.reservation_id {
            Some(id) => find_profile(self.doc, enode, id).ok_or(PatchError::MissingReservation(id))?,
            None => {
                let pnode = self.add(enode, "profile");
                let rnode = self.add(pnode, "reservation");
                (pnode, rnode)
            }
        };

        self.optional_child(pnode, "setup_profile", "setup_tm", profile.setup_duration());
        self.optional_child(
            pnode,
            "takedown_profile",
            "tdown_tm",
            profile.teardown_duration(),
        );

        let start = r25_datetime(&profile.start);
        let end = r25_datetime(&profile.end);
        let (reservation_start, reservation_end) = profile.reservation_window()?;

        self.set(pnode, "profile_name", Some(&profile.name));
        self.set(pnode, "init_start_dt", Some(&start));
        self.set(pnode, "init_end_dt", Some(&end));

        self.set(rnode, "reservation_start_dt", Some(&r25_datetime(&reservation_start)));
        self.set(rnode, "reservation_end_dt", Some(&r25_datetime(&reservation_end)));
        self.set(rnode, "event_start_dt", Some(&start));
        self.set(rnode, "event_end_dt", Some(&end));
        self.set(rnode, "reservation_state", Some(profile.state.code()));

        self.space(rnode, profile);
        Ok(())
    }

    /// Keeps at most one space reservation, bound to the wanted space.
    fn space(&mut self, rnode: NodeId, profile: &ReservationProfile) {
        let wanted = profile.space_id.map(|id| id.to_string());
        let mut current = self.doc.child(rnode, "space_reservation");

        if let Some(srnode) = current {
            let same = wanted.is_some() && self.doc.child_text(srnode, "space_id") == wanted.as_deref();
            if !same {
                self.delete(srnode);
                current = None;
            }
        }

        if let Some(space_id) = wanted {
            let srnode = match current {
                Some(node) => node,
                None => self.add(rnode, "space_reservation"),
            };
            self.set(srnode, "space_id", Some(&space_id));
        }
    }

    /// Keeps a container child holding `leaf = value`, or deletes it when `value` is `None`.
    fn optional_child(&mut self, parent: NodeId, name: &str, leaf: &str, value: Option<String>) {
        match (self.doc.child(parent, name), value) {
            (Some(node), None) => self.delete(node),
            (existing, Some(value)) => {
                let node = match existing {
                    Some(node) => node,
                    None => self.add(parent, name),
                };
                self.set(node, leaf, Some(&value));
            }
            (None, None) => {}
        }
    }

    fn child_or_add(&mut self, parent: NodeId, name: &str) -> NodeId {
        match self.doc.child(parent, name) {
            Some(node) => node,
            None => self.add(parent, name),
        }
    }

    fn set(&mut self, parent: NodeId, name: &str, value: Option<&str>) {
        self.changed |= self.doc.set_value(parent, name, value);
    }

    fn add(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.changed = true;
        self.doc.add_node(parent, name)
    }

    fn delete(&mut self, node: NodeId) {
        self.changed = true;
        self.doc.delete_node(node);
    }
}

/// Finds the profile whose reservation carries `reservation_id`.
fn find_profile(doc: &Document, enode: NodeId, reservation_id: ReservationId) -> Option<(NodeId, NodeId)> {
    doc.children_named(enode, "profile")
        .into_iter()
        .find_map(|pnode| {
            doc.children_named(pnode, "reservation")
                .into_iter()
                .find(|&rnode| {
                    doc.child_text(rnode, "reservation_id")
                        .and_then(|t| t.parse::<ReservationId>().ok())
                        == Some(reservation_id)
                })
                .map(|rnode| (pnode, rnode))
        })
}
