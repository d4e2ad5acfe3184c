//! # Session plumbing
//!
//! Narrow contracts for the two external collaborators the travel coordinator
//! drives, plus loopback implementations that run entirely in-process:
//!
//! - [`directory`] - lobby create/join/leave/query and lobby metadata
//! - [`transport`] - host/client connection for the current lobby
//! - [`metadata`] - typed lobby metadata and its string schema
//! - [`types`] - ids and small enums shared across layers
//!
//! ```text
//!   MapTravelCoordinator
//!        │ requests                ▲ DirectoryEvent / TransportEvent
//!        ▼                         │
//!   SessionDirectory ──────► LobbyRegistry (shared)
//!   SessionTransport ──────► TransportHub  (shared)
//! ```

pub mod directory;
pub mod metadata;
pub mod transport;
pub mod types;

pub use directory::{DirectoryEvent, InMemoryDirectory, LobbyRegistry, SessionDirectory};
pub use metadata::SessionMetadata;
pub use transport::{LoopbackTransport, SessionTransport, TransportEvent, TransportHub};
pub use types::{MapType, PeerId, Role, SessionId};

use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Shared loopback directory + relay. Clone it to hand the same world to many players.
#[derive(Debug, Clone, Default)]
pub struct LoopbackNetwork {
    pub registry: LobbyRegistry,
    pub hub: TransportHub,
}

/// One player's endpoints on a [`LoopbackNetwork`].
pub struct LoopbackEndpoints {
    pub directory: InMemoryDirectory,
    pub directory_events: UnboundedReceiver<DirectoryEvent>,
    pub transport: LoopbackTransport,
    pub transport_events: UnboundedReceiver<TransportEvent>,
}

impl LoopbackNetwork {
    /// Network whose first lobby gets `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            registry: LobbyRegistry::starting_at(first_id),
            hub: TransportHub::default(),
        }
    }

    pub fn connect(&self, me: PeerId) -> LoopbackEndpoints {
        let (dir_tx, directory_events) = mpsc::unbounded_channel();
        let (transport_tx, transport_events) = mpsc::unbounded_channel();
        LoopbackEndpoints {
            directory: self.registry.connect(me, dir_tx),
            directory_events,
            transport: self.hub.connect(me, transport_tx),
            transport_events,
        }
    }
}
