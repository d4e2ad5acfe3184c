//! Lobby directory contract and an in-memory implementation.
//!
//! Requests are fire-and-forget: results come back later as [`DirectoryEvent`]s on
//! the channel the directory was built with. The directory owns the "current
//! session" id for this process; `SessionId::NONE` means not in a lobby.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;

use super::types::{PeerId, SessionId};

/// Notifications delivered by a [`SessionDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    Created(SessionId),
    CreateFailed(String),
    Joined(SessionId),
    JoinFailed(String),
    ListReceived(Vec<SessionId>),
    DataReceived { id: SessionId, exists: bool },
}

/// Request side of the external lobby directory.
pub trait SessionDirectory {
    /// Ask for a new lobby owned by this process. Answered by `Created` or `CreateFailed`.
    fn create(&mut self, capacity: u32);
    /// Answered by `Joined` or `JoinFailed`.
    fn join(&mut self, id: SessionId);
    /// Leave the current lobby, if any. No notification.
    fn leave(&mut self);
    fn request_list(&mut self);
    /// Host-only. Returns false when this process does not own the current lobby.
    fn set_metadata(&mut self, key: &str, value: &str) -> bool;
    fn metadata(&self, id: SessionId, key: &str) -> Option<String>;
    fn member_count(&self, id: SessionId) -> usize;
    fn owner(&self, id: SessionId) -> Option<PeerId>;
    /// Existence probe. Answered by `DataReceived`.
    fn request_data(&mut self, id: SessionId);
    fn current_session(&self) -> SessionId;
}

#[derive(Debug, Clone)]
struct Lobby {
    owner: PeerId,
    capacity: u32,
    members: Vec<PeerId>,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug)]
struct RegistryState {
    next_id: u64,
    lobbies: BTreeMap<SessionId, Lobby>,
}

/// Shared lobby table standing in for the external directory service.
#[derive(Debug, Clone)]
pub struct LobbyRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl Default for LobbyRegistry {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl LobbyRegistry {
    /// Registry whose first created lobby receives `first_id`.
    pub fn starting_at(first_id: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                next_id: first_id.max(1),
                lobbies: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn exists(&self, id: SessionId) -> bool {
        self.lock().lobbies.contains_key(&id)
    }

    pub fn lobby_ids(&self) -> Vec<SessionId> {
        self.lock().lobbies.keys().copied().collect()
    }

    pub fn members(&self, id: SessionId) -> Vec<PeerId> {
        self.lock()
            .lobbies
            .get(&id)
            .map(|l| l.members.clone())
            .unwrap_or_default()
    }

    /// Handle for one participant. Events for that participant go to `events`.
    pub fn connect(&self, me: PeerId, events: UnboundedSender<DirectoryEvent>) -> InMemoryDirectory {
        InMemoryDirectory {
            me,
            registry: self.clone(),
            events,
            current: SessionId::NONE,
            fail_next_create: None,
            fail_next_join: None,
        }
    }
}

/// [`SessionDirectory`] backed by a [`LobbyRegistry`].
#[derive(Debug)]
pub struct InMemoryDirectory {
    me: PeerId,
    registry: LobbyRegistry,
    events: UnboundedSender<DirectoryEvent>,
    current: SessionId,
    fail_next_create: Option<String>,
    fail_next_join: Option<String>,
}

impl InMemoryDirectory {
    pub fn peer_id(&self) -> PeerId {
        self.me
    }

    pub fn registry(&self) -> &LobbyRegistry {
        &self.registry
    }

    /// Make the next `create` answer with `CreateFailed(reason)`.
    pub fn fail_next_create(&mut self, reason: impl Into<String>) {
        self.fail_next_create = Some(reason.into());
    }

    /// Make the next `join` answer with `JoinFailed(reason)`.
    pub fn fail_next_join(&mut self, reason: impl Into<String>) {
        self.fail_next_join = Some(reason.into());
    }

    fn emit(&self, event: DirectoryEvent) {
        if self.events.send(event).is_err() {
            debug!("Directory event for peer {} dropped: receiver closed", self.me);
        }
    }
}

impl SessionDirectory for InMemoryDirectory {
    fn create(&mut self, capacity: u32) {
        if let Some(reason) = self.fail_next_create.take() {
            self.emit(DirectoryEvent::CreateFailed(reason));
            return;
        }
        if self.current.is_some() {
            self.emit(DirectoryEvent::CreateFailed("already in a lobby".to_string()));
            return;
        }
        let id = {
            let mut state = self.registry.lock();
            let id = SessionId(state.next_id);
            state.next_id += 1;
            state.lobbies.insert(
                id,
                Lobby {
                    owner: self.me,
                    capacity,
                    members: vec![self.me],
                    metadata: BTreeMap::new(),
                },
            );
            id
        };
        self.current = id;
        debug!("Peer {} created lobby {}", self.me, id);
        self.emit(DirectoryEvent::Created(id));
    }

    fn join(&mut self, id: SessionId) {
        if let Some(reason) = self.fail_next_join.take() {
            self.emit(DirectoryEvent::JoinFailed(reason));
            return;
        }
        if self.current.is_some() {
            self.emit(DirectoryEvent::JoinFailed("already in a lobby".to_string()));
            return;
        }
        let outcome = {
            let mut state = self.registry.lock();
            match state.lobbies.get_mut(&id) {
                None => Err(format!("lobby {} no longer exists", id)),
                Some(lobby) if lobby.members.len() >= lobby.capacity as usize => {
                    Err(format!("lobby {} is full", id))
                }
                Some(lobby) => {
                    if !lobby.members.contains(&self.me) {
                        lobby.members.push(self.me);
                    }
                    Ok(())
                }
            }
        };
        match outcome {
            Ok(()) => {
                self.current = id;
                debug!("Peer {} joined lobby {}", self.me, id);
                self.emit(DirectoryEvent::Joined(id));
            }
            Err(reason) => self.emit(DirectoryEvent::JoinFailed(reason)),
        }
    }

    fn leave(&mut self) {
        if self.current.is_none() {
            return;
        }
        let id = std::mem::take(&mut self.current);
        let mut state = self.registry.lock();
        let destroy = match state.lobbies.get_mut(&id) {
            Some(lobby) => {
                lobby.members.retain(|m| *m != self.me);
                lobby.owner == self.me
            }
            None => false,
        };
        if destroy {
            state.lobbies.remove(&id);
            debug!("Lobby {} destroyed: owner {} left", id, self.me);
        } else {
            debug!("Peer {} left lobby {}", self.me, id);
        }
    }

    fn request_list(&mut self) {
        let ids = self.registry.lobby_ids();
        self.emit(DirectoryEvent::ListReceived(ids));
    }

    fn set_metadata(&mut self, key: &str, value: &str) -> bool {
        let mut state = self.registry.lock();
        match state.lobbies.get_mut(&self.current) {
            Some(lobby) if lobby.owner == self.me => {
                lobby.metadata.insert(key.to_string(), value.to_string());
                true
            }
            _ => {
                warn!(
                    "Peer {} may not write metadata on lobby {}",
                    self.me, self.current
                );
                false
            }
        }
    }

    fn metadata(&self, id: SessionId, key: &str) -> Option<String> {
        self.registry
            .lock()
            .lobbies
            .get(&id)
            .and_then(|l| l.metadata.get(key).cloned())
    }

    fn member_count(&self, id: SessionId) -> usize {
        self.registry
            .lock()
            .lobbies
            .get(&id)
            .map(|l| l.members.len())
            .unwrap_or(0)
    }

    fn owner(&self, id: SessionId) -> Option<PeerId> {
        self.registry.lock().lobbies.get(&id).map(|l| l.owner)
    }

    fn request_data(&mut self, id: SessionId) {
        let exists = self.registry.exists(id);
        self.emit(DirectoryEvent::DataReceived { id, exists });
    }

    fn current_session(&self) -> SessionId {
        self.current
    }
}
