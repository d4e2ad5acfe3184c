use crate::errors::TravelError;
use crate::session::{MapType, PeerId, Role, SessionId};

/// Directory listing entry, built from lobby metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySummary {
    pub id: SessionId,
    pub map_type: MapType,
    pub display_name: String,
    pub members: usize,
}

/// Outcomes the coordinator reports upward (UI, logs, the simulator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TravelNotice {
    Arrived {
        session_id: SessionId,
        map_type: MapType,
        role: Role,
    },
    Departed {
        session_id: SessionId,
        map_type: MapType,
    },
    /// The directory rejected a create/join. The coordinator is back at `Idle`.
    DirectoryFailed(String),
    /// Host/client start failed. Any lobby created for it has been left.
    TransportFailed(String),
    /// The session ended underneath us.
    Disconnected { session_id: SessionId },
    TownRehosted {
        previous: SessionId,
        current: SessionId,
    },
    PeerJoined(PeerId),
    PeerLeft(PeerId),
    /// The travel target is gone but a cached copy can be re-hosted. `portal_index`
    /// is `None` when the player travelled by id rather than through a portal.
    RestoreOffered {
        portal_index: Option<usize>,
        cached_id: SessionId,
    },
    /// The portal's target is gone with nothing cached. The link was cleared.
    StaleLinkCleared {
        portal_index: usize,
        target: SessionId,
    },
    LobbyList(Vec<LobbySummary>),
    FieldsPruned(Vec<SessionId>),
}

impl TravelNotice {
    /// Failure notices as the error a synchronous caller would have seen.
    pub fn as_error(&self) -> Option<TravelError> {
        match self {
            TravelNotice::DirectoryFailed(reason) => Some(TravelError::Directory(reason.clone())),
            TravelNotice::TransportFailed(reason) => Some(TravelError::Transport(reason.clone())),
            TravelNotice::StaleLinkCleared { target, .. } => {
                Some(TravelError::StaleReference(*target))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_map_to_errors() {
        let stale = TravelNotice::StaleLinkCleared {
            portal_index: 1,
            target: SessionId(9),
        };
        assert_eq!(stale.as_error(), Some(TravelError::StaleReference(SessionId(9))));
        assert_eq!(
            TravelNotice::DirectoryFailed("full".into()).as_error(),
            Some(TravelError::Directory("full".into()))
        );
        assert!(TravelNotice::PeerJoined(PeerId(2)).as_error().is_none());
    }
}
