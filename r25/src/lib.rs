// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Client for the R25 scheduling web services.
//!
//! R25 exposes its objects as tree-structured XML documents. Editable
//! documents carry a `status` attribute on container nodes which tells the
//! server what changed; [`Document`] models that tree and the dirty-marking
//! rules, [`R25Client`] moves documents over HTTP and classifies the server's
//! answer into a [`WriteOutcome`].

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::single_match_else
)]

mod client;
mod config;
mod document;
mod error;
mod http;
mod listing;
mod response;
mod types;

pub use crate::client::R25Client;
pub use crate::config::{AuthMethod, R25Config};
pub use crate::document::{ChangeStatus, Document, NodeId};
pub use crate::error::R25Error;
pub use crate::listing::{EventSummary, FavoriteObject, ReservationSummary};
pub use crate::response::{ConflictMessage, ErrorDetail, ValidationError, WriteOutcome};
pub use crate::types::{EventId, ReservationId, SpaceId, object_type, state};
