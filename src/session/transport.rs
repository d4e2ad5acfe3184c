//! Peer-to-peer transport contract and a loopback implementation.
//!
//! Exactly one connection is active per process. Results and peer changes arrive
//! as [`TransportEvent`]s on the channel supplied at construction.

use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::UnboundedSender;

use super::types::{PeerId, Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    HostStarted,
    ClientStarted,
    Failed(String),
    PeerConnected(PeerId),
    PeerDisconnected(PeerId),
    /// The named host we were connected to went away.
    ServerDisconnected(PeerId),
    /// Our own `disconnect()` completed.
    Closed,
}

pub trait SessionTransport {
    /// Answered by `HostStarted` or `Failed`.
    fn start_host(&mut self);
    /// Connect to the peer hosting the session. Answered by `ClientStarted` or `Failed`.
    fn start_client(&mut self, host: PeerId);
    /// Tear down the active connection. Emits `Closed` if one was active.
    fn disconnect(&mut self);
    fn is_active(&self) -> bool;
    fn is_host(&self) -> bool;
}

#[derive(Debug, Default)]
struct HubState {
    endpoints: HashMap<PeerId, UnboundedSender<TransportEvent>>,
    roles: HashMap<PeerId, Role>,
    /// host -> connected clients
    clients: HashMap<PeerId, Vec<PeerId>>,
    /// client -> host
    host_of: HashMap<PeerId, PeerId>,
}

impl HubState {
    fn send(&self, to: PeerId, event: TransportEvent) {
        if let Some(tx) = self.endpoints.get(&to) {
            if tx.send(event).is_err() {
                debug!("Transport event for peer {} dropped: receiver closed", to);
            }
        }
    }
}

/// In-process stand-in for the vendor relay network.
#[derive(Debug, Clone, Default)]
pub struct TransportHub {
    inner: Arc<Mutex<HubState>>,
}

impl TransportHub {
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn connect(&self, me: PeerId, events: UnboundedSender<TransportEvent>) -> LoopbackTransport {
        self.lock().endpoints.insert(me, events);
        LoopbackTransport {
            me,
            hub: self.clone(),
            fail_next_start: None,
        }
    }

    pub fn clients_of(&self, host: PeerId) -> Vec<PeerId> {
        self.lock().clients.get(&host).cloned().unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct LoopbackTransport {
    me: PeerId,
    hub: TransportHub,
    fail_next_start: Option<String>,
}

impl LoopbackTransport {
    /// Make the next `start_host`/`start_client` answer with `Failed(reason)`.
    pub fn fail_next_start(&mut self, reason: impl Into<String>) {
        self.fail_next_start = Some(reason.into());
    }
}

impl SessionTransport for LoopbackTransport {
    fn start_host(&mut self) {
        let mut hub = self.hub.lock();
        if let Some(reason) = self.fail_next_start.take() {
            hub.send(self.me, TransportEvent::Failed(reason));
            return;
        }
        if hub.roles.contains_key(&self.me) {
            hub.send(
                self.me,
                TransportEvent::Failed("transport already active".to_string()),
            );
            return;
        }
        hub.roles.insert(self.me, Role::Host);
        hub.clients.insert(self.me, Vec::new());
        hub.send(self.me, TransportEvent::HostStarted);
    }

    fn start_client(&mut self, host: PeerId) {
        let mut hub = self.hub.lock();
        if let Some(reason) = self.fail_next_start.take() {
            hub.send(self.me, TransportEvent::Failed(reason));
            return;
        }
        if hub.roles.contains_key(&self.me) {
            hub.send(
                self.me,
                TransportEvent::Failed("transport already active".to_string()),
            );
            return;
        }
        if hub.roles.get(&host) != Some(&Role::Host) {
            hub.send(
                self.me,
                TransportEvent::Failed(format!("no host listening for peer {}", host)),
            );
            return;
        }
        hub.roles.insert(self.me, Role::Client);
        hub.host_of.insert(self.me, host);
        hub.clients.entry(host).or_default().push(self.me);
        hub.send(self.me, TransportEvent::ClientStarted);
        hub.send(host, TransportEvent::PeerConnected(self.me));
    }

    fn disconnect(&mut self) {
        let mut hub = self.hub.lock();
        match hub.roles.remove(&self.me) {
            None => {}
            Some(Role::Host) => {
                let clients = hub.clients.remove(&self.me).unwrap_or_default();
                for client in clients {
                    hub.roles.remove(&client);
                    hub.host_of.remove(&client);
                    hub.send(client, TransportEvent::ServerDisconnected(self.me));
                }
                hub.send(self.me, TransportEvent::Closed);
            }
            Some(Role::Client) => {
                if let Some(host) = hub.host_of.remove(&self.me) {
                    if let Some(list) = hub.clients.get_mut(&host) {
                        list.retain(|c| *c != self.me);
                    }
                    hub.send(host, TransportEvent::PeerDisconnected(self.me));
                }
                hub.send(self.me, TransportEvent::Closed);
            }
        }
    }

    fn is_active(&self) -> bool {
        self.hub.lock().roles.contains_key(&self.me)
    }

    fn is_host(&self) -> bool {
        self.hub.lock().roles.get(&self.me) == Some(&Role::Host)
    }
}
