use serde::{Deserialize, Serialize};

use crate::field::{PortalConfig, Theme};
use crate::session::{PeerId, SessionId};

/// The player's own town: which lobby currently carries it, which lobbies used to,
/// and the town's portal links (which persist across re-hosting).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownIdentity {
    pub owner: PeerId,
    pub display_name: String,
    pub current_town: SessionId,
    /// Append-only while the process runs.
    pub previous_towns: Vec<SessionId>,
    pub portals: Vec<PortalConfig>,
}

impl TownIdentity {
    pub fn new(owner: PeerId, display_name: impl Into<String>, portal_count: usize) -> Self {
        Self {
            owner,
            display_name: display_name.into(),
            current_town: SessionId::NONE,
            previous_towns: Vec::new(),
            portals: default_town_portals(portal_count),
        }
    }

    /// A lobby is "my town" when its owner metadata names me, or when its id is my
    /// current or any previous town id.
    pub fn is_my_town(&self, id: SessionId, owner_metadata: Option<PeerId>) -> bool {
        if owner_metadata == Some(self.owner) {
            return true;
        }
        id.is_some() && (id == self.current_town || self.previous_towns.contains(&id))
    }

    /// The town now lives in `new_id`. Returns the id it moved away from, if any.
    pub fn record_new_town(&mut self, new_id: SessionId) -> Option<SessionId> {
        let old = self.current_town;
        self.current_town = new_id;
        if old.is_some() && old != new_id {
            self.push_previous(old);
            Some(old)
        } else {
            None
        }
    }

    pub fn portal_mut(&mut self, index: usize) -> Option<&mut PortalConfig> {
        self.portals.iter_mut().find(|p| p.portal_index == index)
    }

    fn push_previous(&mut self, id: SessionId) {
        if id.is_some() && !self.previous_towns.contains(&id) {
            self.previous_towns.push(id);
        }
    }
}

/// Unlinked portals whose field seed is picked when first entered.
pub fn default_town_portals(count: usize) -> Vec<PortalConfig> {
    (0..count)
        .map(|i| PortalConfig::unlinked(i, 0, Theme::ALL[i % Theme::ALL.len()]))
        .collect()
}
