//! Async front end for the coordinator.
//!
//! The coordinator is plain synchronous state; [`TravelService`] owns it together
//! with the directory and transport event receivers and serializes everything
//! through one `tokio::select!` loop. Callers talk to it through a cloneable
//! [`TravelHandle`].

use log::{debug, info};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use super::coordinator::{MapTravelCoordinator, TravelSettings, TravelState};
use super::notice::TravelNotice;
use crate::errors::TravelError;
use crate::field::{CacheStats, FieldParams};
use crate::inventory::Inventory;
use crate::session::{
    DirectoryEvent, InMemoryDirectory, LoopbackNetwork, LoopbackTransport, MapType,
    SessionDirectory, SessionId, SessionTransport, TransportEvent,
};

type Reply<T> = oneshot::Sender<Result<T, TravelError>>;

#[derive(Debug)]
pub enum TravelCommand {
    HostTown(Reply<()>),
    TravelToField(SessionId, Reply<()>),
    TravelToTown(SessionId, Reply<()>),
    CreateField(FieldParams, Reply<()>),
    RestoreCachedField(SessionId, Reply<()>),
    EnterPortal(usize, Reply<()>),
    LeaveSession(Reply<()>),
    RefreshLobbies,
    /// Pick an item up into the caller's inventory; the updated inventory comes back.
    PickUpItem(usize, Inventory, oneshot::Sender<(Inventory, Result<u32, TravelError>)>),
    Snapshot(oneshot::Sender<TravelSnapshot>),
    Shutdown,
}

/// Point-in-time view of the coordinator for callers outside the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelSnapshot {
    pub state: TravelState,
    pub map_type: MapType,
    pub session_id: SessionId,
    pub display_name: Option<String>,
    pub current_town: SessionId,
    pub previous_towns: Vec<SessionId>,
    pub cached_fields: Vec<SessionId>,
    pub cache_stats: CacheStats,
}

pub struct TravelService<D, T> {
    coordinator: MapTravelCoordinator<D, T>,
    directory_events: UnboundedReceiver<DirectoryEvent>,
    transport_events: UnboundedReceiver<TransportEvent>,
}

impl<D: SessionDirectory, T: SessionTransport> TravelService<D, T> {
    pub fn new(
        coordinator: MapTravelCoordinator<D, T>,
        directory_events: UnboundedReceiver<DirectoryEvent>,
        transport_events: UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self {
            coordinator,
            directory_events,
            transport_events,
        }
    }

    pub fn coordinator(&self) -> &MapTravelCoordinator<D, T> {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut MapTravelCoordinator<D, T> {
        &mut self.coordinator
    }

    /// Deliver every queued directory/transport event. Returns how many were handled.
    ///
    /// Handling an event can queue more (a `Created` triggers `start_host`, which
    /// answers with `HostStarted`), so this loops until both queues are empty.
    pub fn pump_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            if let Ok(event) = self.directory_events.try_recv() {
                self.coordinator.handle_directory_event(event);
            } else if let Ok(event) = self.transport_events.try_recv() {
                self.coordinator.handle_transport_event(event);
            } else {
                return handled;
            }
            handled += 1;
        }
    }

    pub fn snapshot(&self) -> TravelSnapshot {
        let c = &self.coordinator;
        TravelSnapshot {
            state: c.state(),
            map_type: c.map_type(),
            session_id: c.current_session_id(),
            display_name: c.live_map().map(|l| l.display_name.clone()),
            current_town: c.town().current_town,
            previous_towns: c.town().previous_towns.clone(),
            cached_fields: c.cache().cached_ids(),
            cache_stats: c.cache().stats(),
        }
    }

    /// Run until `Shutdown` arrives or every handle is dropped.
    pub async fn run(mut self, mut commands: UnboundedReceiver<TravelCommand>) {
        info!("Travel service started");
        loop {
            tokio::select! {
                Some(event) = self.directory_events.recv() => {
                    self.coordinator.handle_directory_event(event);
                }
                Some(event) = self.transport_events.recv() => {
                    self.coordinator.handle_transport_event(event);
                }
                command = commands.recv() => {
                    match command {
                        Some(TravelCommand::Shutdown) | None => break,
                        Some(command) => self.execute(command),
                    }
                }
            }
        }
        if self.coordinator.is_active() {
            let _ = self.coordinator.leave_session();
        }
        info!("Travel service stopped");
    }

    fn execute(&mut self, command: TravelCommand) {
        debug!("Travel command: {:?}", command);
        if let TravelCommand::Snapshot(reply) = command {
            let _ = reply.send(self.snapshot());
            return;
        }
        let c = &mut self.coordinator;
        match command {
            TravelCommand::HostTown(reply) => {
                let _ = reply.send(c.host_town());
            }
            TravelCommand::TravelToField(id, reply) => {
                let _ = reply.send(c.travel_to_field(id));
            }
            TravelCommand::TravelToTown(id, reply) => {
                let _ = reply.send(c.travel_to_town(id));
            }
            TravelCommand::CreateField(params, reply) => {
                let _ = reply.send(c.create_field(params));
            }
            TravelCommand::RestoreCachedField(id, reply) => {
                let _ = reply.send(c.restore_cached_field(id));
            }
            TravelCommand::EnterPortal(index, reply) => {
                let _ = reply.send(c.enter_portal(index));
            }
            TravelCommand::LeaveSession(reply) => {
                let _ = reply.send(c.leave_session());
            }
            TravelCommand::RefreshLobbies => c.refresh_lobbies(),
            TravelCommand::PickUpItem(index, mut inventory, reply) => {
                let result = c.pick_up_item(index, &mut inventory);
                let _ = reply.send((inventory, result));
            }
            TravelCommand::Snapshot(_) | TravelCommand::Shutdown => {}
        }
    }
}

impl TravelService<InMemoryDirectory, LoopbackTransport> {
    /// Service for one player on a loopback network, plus the notice stream.
    pub fn loopback(
        network: &LoopbackNetwork,
        settings: TravelSettings,
    ) -> (Self, UnboundedReceiver<TravelNotice>) {
        let endpoints = network.connect(settings.identity);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let coordinator = MapTravelCoordinator::new(
            settings,
            endpoints.directory,
            endpoints.transport,
            notice_tx,
        );
        let service = Self::new(
            coordinator,
            endpoints.directory_events,
            endpoints.transport_events,
        );
        (service, notice_rx)
    }
}

/// Cloneable request side of a running [`TravelService`].
#[derive(Debug, Clone)]
pub struct TravelHandle {
    commands: UnboundedSender<TravelCommand>,
}

impl TravelHandle {
    pub fn channel() -> (Self, UnboundedReceiver<TravelCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { commands: tx }, rx)
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> TravelCommand,
    ) -> Result<R, TravelError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .map_err(|_| TravelError::ServiceClosed)?;
        rx.await.map_err(|_| TravelError::ServiceClosed)
    }

    pub async fn host_town(&self) -> Result<(), TravelError> {
        self.request(TravelCommand::HostTown).await?
    }

    pub async fn travel_to_field(&self, id: SessionId) -> Result<(), TravelError> {
        self.request(|tx| TravelCommand::TravelToField(id, tx)).await?
    }

    pub async fn travel_to_town(&self, id: SessionId) -> Result<(), TravelError> {
        self.request(|tx| TravelCommand::TravelToTown(id, tx)).await?
    }

    pub async fn create_field(&self, params: FieldParams) -> Result<(), TravelError> {
        self.request(|tx| TravelCommand::CreateField(params, tx)).await?
    }

    pub async fn restore_cached_field(&self, id: SessionId) -> Result<(), TravelError> {
        self.request(|tx| TravelCommand::RestoreCachedField(id, tx)).await?
    }

    pub async fn enter_portal(&self, index: usize) -> Result<(), TravelError> {
        self.request(|tx| TravelCommand::EnterPortal(index, tx)).await?
    }

    pub async fn leave_session(&self) -> Result<(), TravelError> {
        self.request(TravelCommand::LeaveSession).await?
    }

    pub fn refresh_lobbies(&self) -> Result<(), TravelError> {
        self.commands
            .send(TravelCommand::RefreshLobbies)
            .map_err(|_| TravelError::ServiceClosed)
    }

    pub async fn pick_up_item(
        &self,
        index: usize,
        inventory: Inventory,
    ) -> Result<(Inventory, Result<u32, TravelError>), TravelError> {
        self.request(|tx| TravelCommand::PickUpItem(index, inventory, tx))
            .await
    }

    pub async fn snapshot(&self) -> Result<TravelSnapshot, TravelError> {
        self.request(TravelCommand::Snapshot).await
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(TravelCommand::Shutdown);
    }
}
