//! Records describing a field's generation inputs and its live content.

use serde::{Deserialize, Serialize};

use super::theme::{ItemKind, Theme};
use crate::session::SessionId;

/// Ground-plane position in map units, origin at the field center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn distance_to(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn length(self) -> f32 {
        self.distance_to(Position::default())
    }
}

/// Everything needed to (re)build a field: generation inputs plus where it was entered from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldParams {
    pub seed: u64,
    pub origin_session_id: SessionId,
    pub origin_portal_index: usize,
    pub origin_map_name: String,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPlacement {
    pub item_id: ItemKind,
    pub position: Position,
    pub quantity: u32,
}

/// One in-world link to another session. `linked_session_id == 0` means unlinked:
/// entering it creates a new field from `generation_seed` and `theme`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    pub portal_index: usize,
    pub linked_session_id: SessionId,
    pub linked_map_name: String,
    pub generation_seed: u64,
    pub theme: Theme,
}

impl PortalConfig {
    pub fn unlinked(portal_index: usize, generation_seed: u64, theme: Theme) -> Self {
        Self {
            portal_index,
            linked_session_id: SessionId::NONE,
            linked_map_name: String::new(),
            generation_seed,
            theme,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.linked_session_id.is_some()
    }

    pub fn link(&mut self, target: SessionId, name: impl Into<String>) {
        self.linked_session_id = target;
        self.linked_map_name = name.into();
    }

    pub fn clear_link(&mut self) {
        self.linked_session_id = SessionId::NONE;
        self.linked_map_name.clear();
    }
}

/// Snapshot of an abandoned field, kept so it can be re-hosted later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldState {
    pub params: FieldParams,
    pub items: Vec<ItemPlacement>,
    pub portals: Vec<PortalConfig>,
}

impl FieldState {
    pub fn portal(&self, index: usize) -> Option<&PortalConfig> {
        self.portals.iter().find(|p| p.portal_index == index)
    }

    pub fn portal_mut(&mut self, index: usize) -> Option<&mut PortalConfig> {
        self.portals.iter_mut().find(|p| p.portal_index == index)
    }

    pub fn linked_ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.portals
            .iter()
            .filter(|p| p.is_linked())
            .map(|p| p.linked_session_id)
    }
}
