use thiserror::Error;

use crate::session::SessionId;

/// Errors surfaced by the travel coordinator and its service handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TravelError {
    /// Another host/join/travel request is still waiting on the directory or transport.
    #[error("already transitioning between sessions")]
    AlreadyTransitioning,

    /// Hosting requires being out of every session.
    #[error("already in session {0}")]
    AlreadyInSession(SessionId),

    /// Zero id, the session we are already in, or travel with no session to leave.
    #[error("invalid travel target: {0}")]
    InvalidTarget(SessionId),

    #[error("no active session")]
    NoActiveSession,

    #[error("no cached state for field {0}")]
    NoCachedState(SessionId),

    #[error("no portal with index {0} on this map")]
    PortalOutOfRange(usize),

    #[error("only valid while on a field")]
    NotInField,

    #[error("no item at index {0} on this field")]
    ItemOutOfRange(usize),

    /// The lobby directory rejected a create or join.
    #[error("directory failure: {0}")]
    Directory(String),

    /// Host or client connection could not be established.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A portal pointed at a session that no longer exists and has no cache entry.
    #[error("stale link to session {0}")]
    StaleReference(SessionId),

    /// The travel service task is gone.
    #[error("travel service closed")]
    ServiceClosed,
}

impl TravelError {
    /// Rejected up front with no state change.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TravelError::AlreadyTransitioning
                | TravelError::AlreadyInSession(_)
                | TravelError::InvalidTarget(_)
                | TravelError::NoActiveSession
                | TravelError::NoCachedState(_)
                | TravelError::PortalOutOfRange(_)
                | TravelError::NotInField
                | TravelError::ItemOutOfRange(_)
        )
    }
}
