//! The map this process is currently on.

use crate::field::{FieldGenerator, FieldParams, FieldState, ItemPlacement, PortalConfig};
use crate::session::{MapType, PeerId, SessionId};

/// Index of the return portal every field carries.
pub const RETURN_PORTAL_INDEX: usize = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveMap {
    pub session_id: SessionId,
    pub map_type: MapType,
    pub display_name: String,
    pub owner: Option<PeerId>,
    /// Set for fields only.
    pub field: Option<FieldParams>,
    pub items: Vec<ItemPlacement>,
    pub portals: Vec<PortalConfig>,
}

impl LiveMap {
    pub fn town(
        session_id: SessionId,
        display_name: impl Into<String>,
        owner: Option<PeerId>,
        portals: Vec<PortalConfig>,
    ) -> Self {
        Self {
            session_id,
            map_type: MapType::Town,
            display_name: display_name.into(),
            owner,
            field: None,
            items: Vec::new(),
            portals,
        }
    }

    /// Field content straight from the generator: return portal plus seeded exits.
    pub fn generated_field(
        session_id: SessionId,
        display_name: impl Into<String>,
        owner: Option<PeerId>,
        params: FieldParams,
        portal_count: usize,
    ) -> Self {
        let generator = FieldGenerator::new(params.seed, params.theme);
        let mut portals = Vec::with_capacity(portal_count.max(1));
        portals.push(return_portal(&params));
        portals.extend(
            generator.generate_exit_portals(RETURN_PORTAL_INDEX + 1, portal_count.saturating_sub(1)),
        );
        Self {
            session_id,
            map_type: MapType::Field,
            display_name: display_name.into(),
            owner,
            items: generator.generate_items(),
            field: Some(params),
            portals,
        }
    }

    /// Field content taken from a cache entry instead of the generator.
    pub fn restored_field(
        session_id: SessionId,
        display_name: impl Into<String>,
        owner: Option<PeerId>,
        state: FieldState,
    ) -> Self {
        let mut portals = state.portals;
        if !portals.iter().any(|p| p.portal_index == RETURN_PORTAL_INDEX) {
            portals.insert(0, return_portal(&state.params));
        }
        Self {
            session_id,
            map_type: MapType::Field,
            display_name: display_name.into(),
            owner,
            field: Some(state.params),
            items: state.items,
            portals,
        }
    }

    pub fn portal(&self, index: usize) -> Option<&PortalConfig> {
        self.portals.iter().find(|p| p.portal_index == index)
    }

    pub fn portal_mut(&mut self, index: usize) -> Option<&mut PortalConfig> {
        self.portals.iter_mut().find(|p| p.portal_index == index)
    }

    /// Serialize the field for caching. `None` for towns.
    pub fn to_field_state(&self) -> Option<FieldState> {
        self.field.as_ref().map(|params| FieldState {
            params: params.clone(),
            items: self.items.clone(),
            portals: self.portals.clone(),
        })
    }

    pub fn linked_ids(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.portals
            .iter()
            .filter(|p| p.is_linked())
            .map(|p| p.linked_session_id)
    }
}

pub fn field_display_name(params: &FieldParams) -> String {
    if params.origin_map_name.is_empty() {
        format!("{} Field", params.theme.display_name())
    } else {
        format!(
            "{} Field beyond {}",
            params.theme.display_name(),
            params.origin_map_name
        )
    }
}

fn return_portal(params: &FieldParams) -> PortalConfig {
    let mut portal = PortalConfig::unlinked(RETURN_PORTAL_INDEX, 0, params.theme);
    if params.origin_session_id.is_some() {
        portal.link(params.origin_session_id, params.origin_map_name.clone());
    }
    portal
}
