// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Status to action mapping.
//!
//! A status gets its mapping the first time a run sees it. The default
//! action is chosen by:
//!
//! 1. description listed in `ignore_statuses` => `ignore`
//! 2. description listed in `remove_statuses` => `remove`
//! 3. status does not block its space => `remove`
//! 4. otherwise => `add`
//!
//! Operators may edit the stored mapping afterwards; runs never overwrite it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::config::SyncConfig;
use crate::localdb::StatusMaps;
use crate::model::Status;

/// What a run does with bookings in a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusAction {
    /// Neither add to nor remove from R25.
    Ignore,
    /// Cancel in R25 if present.
    Remove,
    /// Add to R25 if missing.
    Add,
}

impl StatusAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            StatusAction::Ignore => "ignore",
            StatusAction::Remove => "remove",
            StatusAction::Add => "add",
        }
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(StatusAction::Ignore),
            "remove" => Ok(StatusAction::Remove),
            "add" => Ok(StatusAction::Add),
            _ => Err(format!("Invalid status action: {s}")),
        }
    }
}

/// Rules for the mapping of a newly seen status.
#[derive(Debug, Clone, Default)]
pub struct StatusRules {
    pub ignore: Vec<String>,
    pub remove: Vec<String>,
    pub default_event_type_id: Option<i64>,
    pub event_type_map: HashMap<String, i64>,
}

impl StatusRules {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            ignore: config.ignore_statuses.clone(),
            remove: config.remove_statuses.clone(),
            default_event_type_id: config.default_event_type_id,
            event_type_map: config.event_type_map.clone(),
        }
    }

    pub fn default_action(&self, status: &Status) -> StatusAction {
        if self.ignore.contains(&status.description) {
            StatusAction::Ignore
        } else if self.remove.contains(&status.description) || !status.blocks_space {
            StatusAction::Remove
        } else {
            StatusAction::Add
        }
    }

    pub fn default_event_type(&self, status: &Status) -> Option<i64> {
        self.event_type_map
            .get(&status.description)
            .copied()
            .or(self.default_event_type_id)
    }
}

/// Stored mapping of one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMapping {
    /// `None` when an operator cleared the action.
    pub action: Option<StatusAction>,
    pub event_type_id: Option<i64>,
}

/// Statuses of the booking source joined with their mappings, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct StatusTable {
    statuses: HashMap<u64, Status>,
    mappings: BTreeMap<u64, StatusMapping>,
}

impl StatusTable {
    /// Stores defaults for unseen statuses and loads every mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    pub async fn refresh(
        store: &StatusMaps,
        statuses: &[Status],
        rules: &StatusRules,
    ) -> Result<Self, sqlx::Error> {
        for status in statuses {
            let action = rules.default_action(status);
            let event_type_id = rules.default_event_type(status);
            if store
                .insert_default(status.id, Some(action.as_str()), event_type_id)
                .await?
            {
                tracing::info!(
                    status_id = status.id,
                    description = status.description,
                    %action,
                    ?event_type_id,
                    "mapped new status"
                );
            }
        }

        let mut mappings = BTreeMap::new();
        for record in store.list().await? {
            let action = match record.action.as_deref().map(str::parse) {
                Some(Ok(action)) => Some(action),
                Some(Err(e)) => {
                    tracing::warn!(status_id = record.status_id, "{e}");
                    None
                }
                None => None,
            };
            mappings.insert(
                record.status_id()?,
                StatusMapping {
                    action,
                    event_type_id: record.event_type_id,
                },
            );
        }

        Ok(Self {
            statuses: statuses.iter().map(|s| (s.id, s.clone())).collect(),
            mappings,
        })
    }

    pub fn mapping(&self, status_id: u64) -> Option<&StatusMapping> {
        self.mappings.get(&status_id)
    }

    pub fn status(&self, status_id: u64) -> Option<&Status> {
        self.statuses.get(&status_id)
    }

    /// Display name of a status, the bare id when the source does not know it.
    pub fn describe(&self, status_id: u64) -> String {
        self.status(status_id)
            .map_or_else(|| status_id.to_string(), |s| s.description.clone())
    }

    /// Statuses to request from the booking source.
    ///
    /// Every mapped status not ignored, provided the source still lists it.
    pub fn search_statuses(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        for (&id, mapping) in &self.mappings {
            if !self.statuses.contains_key(&id) {
                tracing::warn!("Mapped status {id} missing from booking source status list");
                continue;
            }
            if mapping.action != Some(StatusAction::Ignore) {
                ids.push(id);
            }
        }

        let names: Vec<_> = ids.iter().map(|&id| self.describe(id)).collect();
        tracing::info!("Considering statuses {}", names.join(", "));
        ids
    }
}
