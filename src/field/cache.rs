//! In-memory cache of abandoned fields and of session id remappings.
//!
//! A field that nobody hosts any more survives only here. When it is re-hosted
//! under a new lobby id the old id is remapped, so portals that still carry the
//! old id resolve to the live session.

use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::state::FieldState;
use crate::session::SessionId;

#[derive(Debug, Default)]
pub struct FieldStateCache {
    entries: BTreeMap<SessionId, FieldState>,
    /// old id -> newest id. Chains are collapsed at registration.
    remappings: HashMap<SessionId, SessionId>,
}

/// Cache statistics for debugging/monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub cached_fields: usize,
    pub remappings: usize,
}

impl FieldStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert; replaces any previous entry for `session_id`.
    pub fn cache(&mut self, session_id: SessionId, state: FieldState) {
        if self.entries.insert(session_id, state).is_some() {
            debug!("Field cache overwrote entry {}", session_id);
        } else {
            debug!(
                "Field cache stored entry {} (entries: {})",
                session_id,
                self.entries.len()
            );
        }
    }

    /// True for a direct entry, or when `session_id` is the new side of a remapping
    /// whose old side still has a direct entry.
    pub fn has_cached_state(&self, session_id: SessionId) -> bool {
        if self.entries.contains_key(&session_id) {
            return true;
        }
        self.remappings
            .iter()
            .any(|(old, new)| *new == session_id && self.entries.contains_key(old))
    }

    /// Direct lookup only. Callers resolve remappings first.
    pub fn get_cached_state(&self, session_id: SessionId) -> Option<&FieldState> {
        self.entries.get(&session_id)
    }

    pub fn get_cached_state_mut(&mut self, session_id: SessionId) -> Option<&mut FieldState> {
        self.entries.get_mut(&session_id)
    }

    /// Record that `old_id` was re-hosted as `new_id`.
    pub fn register_remapping(&mut self, old_id: SessionId, new_id: SessionId) {
        if old_id == new_id || old_id.is_none() {
            return;
        }
        for target in self.remappings.values_mut() {
            if *target == old_id {
                *target = new_id;
            }
        }
        self.remappings.remove(&new_id);
        self.remappings.insert(old_id, new_id);
        debug!("Field cache remapped {} -> {}", old_id, new_id);
    }

    /// Single-hop lookup: `old_id` itself when nothing was remapped.
    pub fn current_session_id(&self, old_id: SessionId) -> SessionId {
        self.remappings.get(&old_id).copied().unwrap_or(old_id)
    }

    /// Delete a direct entry, returning it. No-op when absent.
    pub fn remove_cached_state(&mut self, session_id: SessionId) -> Option<FieldState> {
        let removed = self.entries.remove(&session_id);
        if removed.is_some() {
            debug!("Field cache removed entry {}", session_id);
        }
        removed
    }

    /// Drop every entry not reachable from `linked_ids`, directly or through a
    /// remapping. Returns the removed ids in ascending order.
    pub fn cleanup_orphaned_fields(&mut self, linked_ids: &HashSet<SessionId>) -> Vec<SessionId> {
        let reachable: HashSet<SessionId> = linked_ids
            .iter()
            .flat_map(|id| [*id, self.current_session_id(*id)])
            .collect();
        let orphans: Vec<SessionId> = self
            .entries
            .keys()
            .filter(|id| !reachable.contains(id))
            .copied()
            .collect();
        for id in &orphans {
            self.entries.remove(id);
        }
        if !orphans.is_empty() {
            debug!("Field cache pruned orphans {:?}", orphans);
        }
        orphans
    }

    /// Point portal `portal_index` of cached field `session_id` at `target`.
    /// Returns false when the entry or portal does not exist.
    pub fn update_portal_link(
        &mut self,
        session_id: SessionId,
        portal_index: usize,
        target: SessionId,
        target_name: &str,
    ) -> bool {
        match self
            .entries
            .get_mut(&session_id)
            .and_then(|state| state.portal_mut(portal_index))
        {
            Some(portal) => {
                portal.link(target, target_name);
                true
            }
            None => false,
        }
    }

    pub fn cached_ids(&self) -> Vec<SessionId> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cached_fields: self.entries.len(),
            remappings: self.remappings.len(),
        }
    }
}
