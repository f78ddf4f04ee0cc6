// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Classification of R25 write responses.

use std::fmt;

use crate::document::{Document, NodeId};
use crate::error::R25Error;

/// Server verdict on a submitted document.
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// The write was accepted; carries the document the server returned.
    Success(Document),
    /// The document was rejected as invalid.
    Rejected(ValidationError),
    /// The server answered with messages, in the order it sent them.
    Conflicts(Vec<ConflictMessage>),
    /// The server is throttling requests.
    RateLimited,
}

impl WriteOutcome {
    /// Classifies a parsed response document.
    ///
    /// An `error` element wins over `messages`; a document with neither is a
    /// success. XHTML pages are rejected as transport failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is an XHTML error page.
    pub fn classify(doc: Document) -> Result<Self, R25Error> {
        ensure_not_html(&doc)?;
        let root = doc.root();

        if let Some(error) = doc.child(root, "error") {
            return Ok(Self::Rejected(ValidationError::from_node(&doc, error)));
        }

        let messages = doc.children_named(root, "messages");
        if !messages.is_empty() {
            let messages = messages
                .into_iter()
                .map(|node| ConflictMessage::from_node(&doc, node))
                .collect();
            return Ok(Self::Conflicts(messages));
        }

        Ok(Self::Success(doc))
    }

    /// Parses and classifies a raw response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a well-formed structured document.
    pub fn from_xml(xml: &str) -> Result<Self, R25Error> {
        Self::classify(Document::from_xml(xml)?)
    }
}

/// Rejects documents that are XHTML error pages rather than R25 data.
///
/// # Errors
///
/// Returns an error if the document holds an `html` element anywhere.
pub(crate) fn ensure_not_html(doc: &Document) -> Result<(), R25Error> {
    let mut pending = vec![doc.root()];
    while let Some(id) = pending.pop() {
        if doc.local_name(id).eq_ignore_ascii_case("html") {
            return Err(R25Error::InvalidResponse(
                "received an HTML page instead of an R25 document".to_string(),
            ));
        }
        pending.extend_from_slice(doc.children(id));
    }
    Ok(())
}

/// A validation error returned by R25.
///
/// ```xml
/// <r25:error>
///   <r25:msg_id>SY_E_DATAERROR</r25:msg_id>
///   <r25:msg>Error saving; data format/validation error</r25:msg>
///   <r25:id>789166</r25:id>
/// </r25:error>
/// <r25:error_details>
///   <r25:error_detail table="events" field="event_type_id" value="306"
///                     object_id="789166" object_type="4">Inactive event_type_id</r25:error_detail>
/// </r25:error_details>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// Message code, e.g. `SY_E_DATAERROR`.
    pub code: String,
    /// Human readable message.
    pub message: String,
    /// Id of the object the error concerns.
    pub object_id: Option<String>,
    /// Database procedure error text, if any.
    pub proc_error: Option<String>,
    /// Field-level details.
    pub details: Vec<ErrorDetail>,
}

/// Field-level detail of a [`ValidationError`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Table holding the offending field.
    pub table: Option<String>,
    /// Offending field.
    pub field: Option<String>,
    /// Offending value.
    pub value: Option<String>,
    /// Id of the owning object.
    pub object_id: Option<String>,
    /// Type code of the owning object.
    pub object_type: Option<String>,
    /// Free text description.
    pub description: Option<String>,
}

impl ValidationError {
    fn from_node(doc: &Document, error: NodeId) -> Self {
        let text = |name: &str| doc.child_text(error, name).map(ToString::to_string);

        let details = doc
            .child(doc.root(), "error_details")
            .map(|details| {
                doc.children_named(details, "error_detail")
                    .into_iter()
                    .map(|node| {
                        let attr = |name: &str| doc.attribute(node, name).map(ToString::to_string);
                        ErrorDetail {
                            table: attr("table"),
                            field: attr("field"),
                            value: attr("value"),
                            object_id: attr("object_id"),
                            object_type: attr("object_type"),
                            description: doc.text(node).map(ToString::to_string),
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            code: text("msg_id").unwrap_or_default(),
            message: text("msg").unwrap_or_default(),
            object_id: text("id"),
            proc_error: text("proc_error"),
            details,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}", self.code)?;
        if let Some(id) = &self.object_id {
            write!(f, " with {id}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(proc_error) = &self.proc_error {
            write!(f, ", {proc_error}")?;
        }
        for detail in &self.details {
            write!(f, " {detail}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "[{}.{}={} on object {} (type {}): {}]",
            or_dash(&self.table),
            or_dash(&self.field),
            or_dash(&self.value),
            or_dash(&self.object_id),
            or_dash(&self.object_type),
            or_dash(&self.description),
        )
    }
}

/// One message from an R25 `messages` block.
///
/// ```xml
/// <r25:messages>
///   <r25:msg_num>1</r25:msg_num>
///   <r25:msg_id>EV_I_SPACECON</r25:msg_id>
///   <r25:msg_text>Space KNE  225 unavailable due to [rsrv] conflict with
///    CENTER FOR HUMAN RIGHTS 10TH ANNIVERSARY [15236046]</r25:msg_text>
///   <r25:msg_entity_name>sp_reservations</r25:msg_entity_name>
///   <r25:msg_object_id>5326</r25:msg_object_id>
/// </r25:messages>
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictMessage {
    /// Sequence number assigned by the server.
    pub number: Option<String>,
    /// Message code, e.g. `EV_I_SPACECON`.
    pub code: String,
    /// Free text.
    pub text: String,
    /// Name of the entity the message concerns.
    pub entity_name: Option<String>,
    /// Id of the object the message concerns.
    pub object_id: Option<String>,
}

impl ConflictMessage {
    /// Code for a space that is unavailable because of a conflicting reservation.
    pub const SPACE_CONFLICT: &'static str = "EV_I_SPACECON";

    fn from_node(doc: &Document, node: NodeId) -> Self {
        let text = |name: &str| doc.child_text(node, name).map(ToString::to_string);
        Self {
            number: text("msg_num"),
            code: text("msg_id").unwrap_or_default(),
            text: text("msg_text").unwrap_or_default(),
            entity_name: text("msg_entity_name"),
            object_id: text("msg_object_id"),
        }
    }

    /// Whether this message reports a space reservation conflict.
    #[must_use]
    pub fn is_space_conflict(&self) -> bool {
        self.code == Self::SPACE_CONFLICT
    }
}

impl fmt::Display for ConflictMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error {} with {} {}: {}",
            self.code,
            self.entity_name.as_deref().unwrap_or("-"),
            self.object_id.as_deref().unwrap_or("-"),
            self.text
        )
    }
}
