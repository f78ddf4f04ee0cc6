// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeSet, HashMap};

use booksync_r25::{
    ChangeStatus, Document, NodeId, R25Error, SpaceId, WriteOutcome, object_type,
};

use crate::config::FavoritesConfig;
use crate::localdb::SpaceAssignments;
use crate::model::Room;
use crate::remote::Remote;

/// Room descriptions with this prefix are never looked up in R25.
pub const EXCLUDED_ROOM_PREFIX: char = '_';

/// Room to space assignments, loaded once per run.
#[derive(Debug, Clone)]
pub struct SpaceDirectory {
    store: SpaceAssignments,
    cache: HashMap<u64, Option<SpaceId>>,
}

/// Changes made to the remote favorites set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesDiff {
    pub added: Vec<u64>,
    pub removed: Vec<u64>,
}

impl FavoritesDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl SpaceDirectory {
    /// Resolves every room of the source and loads all stored assignments.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored assignments cannot be listed.
    pub async fn refresh(
        store: SpaceAssignments,
        remote: &dyn Remote,
        rooms: &[Room],
    ) -> Result<Self, sqlx::Error> {
        let mut directory = Self {
            store,
            cache: HashMap::new(),
        };
        for room in rooms {
            directory.resolve(room.id, &room.description, remote).await;
        }

        for record in directory.store.list().await? {
            let space_id = record.space_id()?.map(SpaceId::new);
            directory.cache.insert(record.room_id()?, space_id);
        }
        Ok(directory)
    }

    /// Space of a room, looking it up by short name when not yet assigned.
    ///
    /// Lookup and store failures are logged and leave the room unassigned; an
    /// assignment already present is never overwritten.
    pub async fn resolve(
        &mut self,
        room_id: u64,
        description: &str,
        remote: &dyn Remote,
    ) -> Option<SpaceId> {
        if let Some(Some(space_id)) = self.cache.get(&room_id) {
            return Some(*space_id);
        }

        let space_id = self.resolve_uncached(room_id, description, remote).await;
        self.cache.insert(room_id, space_id);
        space_id
    }

    async fn resolve_uncached(
        &self,
        room_id: u64,
        description: &str,
        remote: &dyn Remote,
    ) -> Option<SpaceId> {
        if let Err(e) = self.store.ensure(room_id).await {
            tracing::warn!(room_id, err = %e, "failed to store room");
            return None;
        }
        match self.stored(room_id).await {
            Ok(Some(space_id)) => return Some(space_id),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(room_id, err = %e, "failed to read room assignment");
                return None;
            }
        }

        if description.starts_with(EXCLUDED_ROOM_PREFIX) {
            tracing::info!("Skipping room {description}");
            return None;
        }

        let space_id = match remote.space_by_short_name(description).await {
            Ok(Some(space_id)) => space_id,
            Ok(None) => {
                tracing::warn!("No R25 space found for {description}");
                return None;
            }
            Err(e) => {
                tracing::warn!("No R25 space found for {description}: {e}");
                return None;
            }
        };

        match self.store.populate_if_null(room_id, space_id.get()).await {
            Ok(true) => {
                tracing::info!(room_id, %space_id, "assigned space to {description}");
                Some(space_id)
            }
            // assigned concurrently, keep that value
            Ok(false) => self.stored(room_id).await.ok().flatten(),
            Err(e) => {
                tracing::warn!(
                    room_id,
                    %space_id,
                    err = %e,
                    "space for {description} is already assigned to another room"
                );
                None
            }
        }
    }

    async fn stored(&self, room_id: u64) -> Result<Option<SpaceId>, sqlx::Error> {
        match self.store.get(room_id).await? {
            Some(record) => Ok(record.space_id()?.map(SpaceId::new)),
            None => Ok(None),
        }
    }

    /// Cached space of a room.
    pub fn space_for(&self, room_id: u64) -> Option<SpaceId> {
        self.cache.get(&room_id).copied().flatten()
    }

    /// Every assigned space.
    pub fn mapped_spaces(&self) -> BTreeSet<u64> {
        self.cache
            .values()
            .filter_map(|s| s.map(SpaceId::get))
            .collect()
    }

    /// Makes the remote favorites set equal to [`Self::mapped_spaces`].
    ///
    /// With `update` unset the difference is only computed and logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote set cannot be read or written.
    pub async fn sync_favorites(
        &self,
        remote: &dyn Remote,
        config: &FavoritesConfig,
        update: bool,
    ) -> Result<FavoritesDiff, R25Error> {
        let mapped = self.mapped_spaces();
        let diff = match config {
            FavoritesConfig::None => return Ok(FavoritesDiff::default()),
            FavoritesConfig::Favorites => {
                sync_favorite_spaces(remote, &mapped, update).await?
            }
            FavoritesConfig::SavedSearch { query_id } => {
                sync_saved_search(remote, &query_id.to_string(), &mapped, update).await?
            }
        };

        if !diff.is_empty() {
            tracing::info!(
                added = ?diff.added,
                removed = ?diff.removed,
                update,
                "favorite spaces differ"
            );
        }
        Ok(diff)
    }
}

async fn sync_favorite_spaces(
    remote: &dyn Remote,
    mapped: &BTreeSet<u64>,
    update: bool,
) -> Result<FavoritesDiff, R25Error> {
    let current: BTreeSet<u64> = remote
        .favorites(object_type::SPACE)
        .await?
        .into_iter()
        .map(|f| f.id)
        .collect();

    let diff = FavoritesDiff {
        added: mapped.difference(&current).copied().collect(),
        removed: current.difference(mapped).copied().collect(),
    };
    if !update {
        return Ok(diff);
    }

    for &space_id in &diff.added {
        match remote.add_favorite(object_type::SPACE, space_id).await? {
            WriteOutcome::Success(_) => tracing::debug!(space_id, "added favorite"),
            outcome => tracing::warn!(space_id, ?outcome, "failed to add favorite"),
        }
    }
    for &space_id in &diff.removed {
        remote.delete_favorite(object_type::SPACE, space_id).await?;
        tracing::debug!(space_id, "removed favorite");
    }
    Ok(diff)
}

async fn sync_saved_search(
    remote: &dyn Remote,
    query_id: &str,
    mapped: &BTreeSet<u64>,
    update: bool,
) -> Result<FavoritesDiff, R25Error> {
    let mut doc = remote.fetch_space_search(query_id).await?;
    let diff = patch_search(&mut doc, mapped)?;

    if update && !diff.is_empty() {
        match remote.submit_space_search(query_id, &doc).await? {
            WriteOutcome::Success(_) => tracing::debug!(query_id, "updated saved search"),
            outcome => tracing::warn!(query_id, ?outcome, "failed to update saved search"),
        }
    }
    Ok(diff)
}

/// Brings the `step_param` rows of a saved space search in line with `mapped`.
fn patch_search(doc: &mut Document, mapped: &BTreeSet<u64>) -> Result<FavoritesDiff, R25Error> {
    let root = doc.root();
    let search = match doc.local_name(root) {
        "search" => Some(root),
        _ => doc.child(root, "search"),
    };
    let (search, step) = search
        .and_then(|s| doc.child(s, "step").map(|step| (s, step)))
        .ok_or_else(|| R25Error::InvalidResponse("saved search has no step".to_string()))?;

    let mut found = BTreeSet::new();
    let mut last_nbr: i64 = -1;
    let mut diff = FavoritesDiff::default();
    for param in doc.children_named(step, "step_param") {
        if let Some(nbr) = doc
            .child_text(param, "step_param_nbr")
            .and_then(|t| t.trim().parse::<i64>().ok())
        {
            last_nbr = last_nbr.max(nbr);
        }
        let Some(space_id) = doc
            .child_text(param, "space_id")
            .and_then(|t| t.trim().parse::<u64>().ok())
        else {
            continue;
        };
        found.insert(space_id);
        if !mapped.contains(&space_id) {
            doc.delete_node(param);
            diff.removed.push(space_id);
        }
    }

    for &space_id in mapped.difference(&found) {
        last_nbr += 1;
        let param = doc.add_node(step, "step_param");
        doc.set_value(param, "step_param_nbr", Some(&last_nbr.to_string()));
        doc.set_value(param, "space_id", Some(&space_id.to_string()));
        diff.added.push(space_id);
    }

    if !diff.is_empty() {
        force_modified(doc, search);
        force_modified(doc, step);
    }
    Ok(diff)
}

fn force_modified(doc: &mut Document, id: NodeId) {
    if matches!(doc.status(id), None | Some(ChangeStatus::Established)) {
        doc.set_status(id, Some(ChangeStatus::Modified));
    }
}
