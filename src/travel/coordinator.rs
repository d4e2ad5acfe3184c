//! # Map travel coordinator
//!
//! Decides host vs. client for each session, tracks whether the current session
//! is a town or a field, and moves between sessions without leaking lobby or
//! transport state. Abandoned fields go into the [`FieldStateCache`] and come back
//! out when a portal leads to them again.
//!
//! ## States
//!
//! ```text
//!            host_town / create_field / restore_cached_field
//!   Idle ───────────────────────────────► Hosting(map) ──HostStarted──► Active(map, Host)
//!    ▲                                                                        │
//!    │ failure / disconnect     travel_to_field / travel_to_town (join)       │
//!    └──────────────────────── Joining ◄──────────────────────────────────────┘
//!                                  │ Joined
//!                                  ▼
//!                           Active(map, Client)
//! ```
//!
//! Every request is fire-and-forget; the matching [`DirectoryEvent`] or
//! [`TransportEvent`] arrives later through `handle_directory_event` /
//! `handle_transport_event`. A second request while one is in flight is rejected
//! with [`TravelError::AlreadyTransitioning`]. Nothing here retries: a join that
//! fails after the old lobby was left ends at `Idle`.

use log::{debug, info, warn};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc::UnboundedSender;

use super::identity::{default_town_portals, TownIdentity};
use super::live::{field_display_name, LiveMap};
use super::notice::{LobbySummary, TravelNotice};
use crate::config::Config;
use crate::errors::TravelError;
use crate::field::{FieldParams, FieldState, FieldStateCache, ItemPlacement};
use crate::inventory::Inventory;
use crate::logutil::{escape_log, format_pairs};
use crate::metrics;
use crate::session::metadata::{self, SessionMetadata};
use crate::session::{
    DirectoryEvent, MapType, PeerId, Role, SessionDirectory, SessionId, SessionTransport,
    TransportEvent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelSettings {
    pub identity: PeerId,
    pub town_name: String,
    pub capacity: u32,
    pub town_portal_count: usize,
    pub field_portal_count: usize,
}

impl Default for TravelSettings {
    fn default() -> Self {
        Self {
            identity: PeerId(1),
            town_name: "Hearthstead".to_string(),
            capacity: 4,
            town_portal_count: 4,
            field_portal_count: 3,
        }
    }
}

impl TravelSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            identity: PeerId(config.player.identity),
            town_name: config.player.town_name.clone(),
            capacity: config.session.capacity,
            town_portal_count: config.field.town_portal_count,
            field_portal_count: config.field.field_portal_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelState {
    Idle,
    /// Create requested; waiting for the lobby and then the host transport.
    Hosting(MapType),
    /// Join requested; waiting for the directory.
    Joining,
    Active { map: MapType, role: Role },
}

#[derive(Debug)]
enum PendingCreation {
    Town,
    Field(FieldParams),
    Restore { old_id: SessionId, state: FieldState },
}

impl PendingCreation {
    fn map_type(&self) -> MapType {
        match self {
            PendingCreation::Town => MapType::Town,
            PendingCreation::Field(_) | PendingCreation::Restore { .. } => MapType::Field,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PortalProbe {
    /// `None` for direct travel by id.
    portal_index: Option<usize>,
    linked: SessionId,
    from_session: SessionId,
}

pub struct MapTravelCoordinator<D, T> {
    settings: TravelSettings,
    directory: D,
    transport: T,
    cache: FieldStateCache,
    town: TownIdentity,
    state: TravelState,
    map_type: MapType,
    live: Option<LiveMap>,
    pending: Option<PendingCreation>,
    probes: HashMap<SessionId, PortalProbe>,
    /// Host of the session joined as client.
    connected_host: Option<PeerId>,
    /// `Closed` events still owed for disconnects we initiated.
    expected_closes: u32,
    notices: UnboundedSender<TravelNotice>,
}

impl<D: SessionDirectory, T: SessionTransport> MapTravelCoordinator<D, T> {
    pub fn new(
        settings: TravelSettings,
        directory: D,
        transport: T,
        notices: UnboundedSender<TravelNotice>,
    ) -> Self {
        let town = TownIdentity::new(
            settings.identity,
            settings.town_name.clone(),
            settings.town_portal_count,
        );
        Self {
            settings,
            directory,
            transport,
            cache: FieldStateCache::new(),
            town,
            state: TravelState::Idle,
            map_type: MapType::None,
            live: None,
            pending: None,
            probes: HashMap::new(),
            connected_host: None,
            expected_closes: 0,
            notices,
        }
    }

    pub fn state(&self) -> TravelState {
        self.state
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn current_session_id(&self) -> SessionId {
        self.directory.current_session()
    }

    pub fn role(&self) -> Option<Role> {
        match self.state {
            TravelState::Active { role, .. } => Some(role),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TravelState::Active { .. })
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, TravelState::Hosting(_) | TravelState::Joining)
    }

    pub fn live_map(&self) -> Option<&LiveMap> {
        self.live.as_ref()
    }

    pub fn town(&self) -> &TownIdentity {
        &self.town
    }

    pub fn cache(&self) -> &FieldStateCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut FieldStateCache {
        &mut self.cache
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut D {
        &mut self.directory
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn settings(&self) -> &TravelSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Create a lobby for the player's own town and host it.
    pub fn host_town(&mut self) -> Result<(), TravelError> {
        self.ensure_not_transitioning()?;
        if self.is_active() {
            return Err(TravelError::AlreadyInSession(self.current_session_id()));
        }
        info!("Hosting town '{}'", escape_log(&self.town.display_name));
        self.begin_create(PendingCreation::Town);
        Ok(())
    }

    /// Leave the current session and join field `target`. A target with a cached
    /// copy is probed first, like a linked portal, and the session is only left
    /// once the lobby is known to exist.
    pub fn travel_to_field(&mut self, requested: SessionId) -> Result<(), TravelError> {
        let target = self.resolve_travel_target(requested)?;
        if self.probe_cached_target(requested, target) {
            return Ok(());
        }
        self.join_field(target)
    }

    /// Leave the current session and go to town `target`. The player's own town
    /// is re-hosted under a new lobby instead of joined.
    pub fn travel_to_town(&mut self, requested: SessionId) -> Result<(), TravelError> {
        let target = self.resolve_travel_target(requested)?;
        if self.probe_cached_target(requested, target) {
            return Ok(());
        }
        self.join_town(target)
    }

    fn join_field(&mut self, target: SessionId) -> Result<(), TravelError> {
        self.check_travel_target(target)?;
        info!("Travelling to field {}", target);
        self.depart();
        self.begin_join(target);
        Ok(())
    }

    fn join_town(&mut self, target: SessionId) -> Result<(), TravelError> {
        self.check_travel_target(target)?;
        let owner = self
            .directory
            .metadata(target, metadata::OWNER_IDENTITY)
            .and_then(|raw| raw.parse::<PeerId>().ok());
        let mine = self.town.is_my_town(target, owner);
        self.depart();
        if mine {
            info!("Re-hosting own town (last seen as {})", target);
            self.begin_create(PendingCreation::Town);
        } else {
            info!("Travelling to town {}", target);
            self.begin_join(target);
        }
        Ok(())
    }

    /// Leave the current session and host a freshly generated field.
    pub fn create_field(&mut self, params: FieldParams) -> Result<(), TravelError> {
        self.ensure_not_transitioning()?;
        if !self.is_active() {
            return Err(TravelError::NoActiveSession);
        }
        info!(
            "Creating {} field (seed {}) from session {} portal {}",
            params.theme, params.seed, params.origin_session_id, params.origin_portal_index
        );
        self.depart();
        self.begin_create(PendingCreation::Field(params));
        Ok(())
    }

    /// Re-host the field cached under `old_id` as a new lobby.
    pub fn restore_cached_field(&mut self, old_id: SessionId) -> Result<(), TravelError> {
        self.ensure_not_transitioning()?;
        let state = self
            .cache
            .get_cached_state(old_id)
            .cloned()
            .ok_or(TravelError::NoCachedState(old_id))?;
        info!("Restoring cached field {}", old_id);
        self.depart();
        self.begin_create(PendingCreation::Restore { old_id, state });
        Ok(())
    }

    /// Leave the current session without going anywhere.
    pub fn leave_session(&mut self) -> Result<(), TravelError> {
        self.ensure_not_transitioning()?;
        if !self.is_active() {
            return Err(TravelError::NoActiveSession);
        }
        self.depart();
        self.state = TravelState::Idle;
        Ok(())
    }

    /// Use portal `index` on the current map. Unlinked portals create a new field;
    /// linked ones are probed first and resolved when `DataReceived` arrives.
    pub fn enter_portal(&mut self, index: usize) -> Result<(), TravelError> {
        self.ensure_not_transitioning()?;
        if !self.is_active() {
            return Err(TravelError::NoActiveSession);
        }
        let live = self.live.as_ref().ok_or(TravelError::NoActiveSession)?;
        let portal = live
            .portal(index)
            .cloned()
            .ok_or(TravelError::PortalOutOfRange(index))?;

        if !portal.is_linked() {
            let seed = if portal.generation_seed == 0 {
                rand::thread_rng().gen_range(1..=u64::MAX)
            } else {
                portal.generation_seed
            };
            let params = FieldParams {
                seed,
                origin_session_id: live.session_id,
                origin_portal_index: index,
                origin_map_name: live.display_name.clone(),
                theme: portal.theme,
            };
            return self.create_field(params);
        }

        let target = self.cache.current_session_id(portal.linked_session_id);
        debug!(
            "Probing portal {} target {} (linked {})",
            index, target, portal.linked_session_id
        );
        self.probes.insert(
            target,
            PortalProbe {
                portal_index: Some(index),
                linked: portal.linked_session_id,
                from_session: live.session_id,
            },
        );
        self.directory.request_data(target);
        Ok(())
    }

    pub fn refresh_lobbies(&mut self) {
        self.directory.request_list();
    }

    /// Move a field item into `inventory`. Returns how many were taken; whatever
    /// does not fit stays on the field.
    pub fn pick_up_item(
        &mut self,
        index: usize,
        inventory: &mut Inventory,
    ) -> Result<u32, TravelError> {
        let live = self
            .live
            .as_mut()
            .filter(|l| l.map_type == MapType::Field)
            .ok_or(TravelError::NotInField)?;
        let item: ItemPlacement = live
            .items
            .get(index)
            .cloned()
            .ok_or(TravelError::ItemOutOfRange(index))?;
        let leftover = inventory.add(item.item_id, item.quantity);
        if leftover == 0 {
            live.items.remove(index);
        } else {
            live.items[index].quantity = leftover;
        }
        Ok(item.quantity - leftover)
    }

    /// Drop cached fields no portal can reach any more.
    pub fn prune_orphaned_fields(&mut self) -> Vec<SessionId> {
        let linked = self.linked_session_ids();
        let removed = self.cache.cleanup_orphaned_fields(&linked);
        if !removed.is_empty() {
            info!("Pruned {} unreachable cached field(s)", removed.len());
            metrics::add_fields_pruned(removed.len());
            self.notify(TravelNotice::FieldsPruned(removed.clone()));
        }
        removed
    }

    /// Every session id some portal can reach: own-town portals, the live map's
    /// portals, then cached fields' portals transitively, all through remapping.
    pub fn linked_session_ids(&self) -> HashSet<SessionId> {
        let mut frontier: Vec<SessionId> = self
            .town
            .portals
            .iter()
            .filter(|p| p.is_linked())
            .map(|p| p.linked_session_id)
            .collect();
        if let Some(live) = &self.live {
            frontier.push(live.session_id);
            frontier.extend(live.linked_ids());
        }

        let mut reachable = HashSet::new();
        while let Some(id) = frontier.pop() {
            for candidate in [id, self.cache.current_session_id(id)] {
                if candidate.is_none() || !reachable.insert(candidate) {
                    continue;
                }
                if let Some(state) = self.cache.get_cached_state(candidate) {
                    frontier.extend(state.linked_ids());
                }
            }
        }
        reachable
    }

    pub fn describe_lobby(&self, id: SessionId) -> LobbySummary {
        let meta = SessionMetadata::read(|key| self.directory.metadata(id, key));
        LobbySummary {
            id,
            map_type: meta.map_type(),
            display_name: meta.display_name().to_string(),
            members: self.directory.member_count(id),
        }
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn handle_directory_event(&mut self, event: DirectoryEvent) {
        debug!("Directory event: {:?}", event);
        match event {
            DirectoryEvent::Created(id) => self.on_created(id),
            DirectoryEvent::CreateFailed(reason) | DirectoryEvent::JoinFailed(reason) => {
                self.on_directory_failure(reason)
            }
            DirectoryEvent::Joined(id) => self.on_joined(id),
            DirectoryEvent::ListReceived(ids) => {
                let summaries = ids.into_iter().map(|id| self.describe_lobby(id)).collect();
                self.notify(TravelNotice::LobbyList(summaries));
            }
            DirectoryEvent::DataReceived { id, exists } => self.on_probe_result(id, exists),
        }
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        debug!("Transport event: {:?}", event);
        match event {
            TransportEvent::HostStarted => match self.state {
                TravelState::Hosting(map) if self.live.is_some() => {
                    self.state = TravelState::Active {
                        map,
                        role: Role::Host,
                    };
                    self.finish_arrival(Role::Host);
                }
                _ => debug!("Ignoring HostStarted in state {:?}", self.state),
            },
            TransportEvent::ClientStarted => {
                debug!("Connected to host of session {}", self.current_session_id())
            }
            TransportEvent::Failed(reason) => self.on_transport_failure(reason),
            TransportEvent::PeerConnected(peer) => self.notify(TravelNotice::PeerJoined(peer)),
            TransportEvent::PeerDisconnected(peer) => self.notify(TravelNotice::PeerLeft(peer)),
            TransportEvent::ServerDisconnected(host) => {
                // Notices from a host we already moved away from are stale.
                if self.connected_host != Some(host) || self.transport.is_active() {
                    debug!("Ignoring disconnect from former host {}", host);
                } else if self.is_active() {
                    info!("Host of session {} went away", self.current_session_id());
                    self.teardown();
                }
            }
            TransportEvent::Closed => {
                if self.expected_closes > 0 {
                    self.expected_closes -= 1;
                } else if self.transport.is_active() {
                    debug!("Ignoring Closed for a connection that was replaced");
                } else if self.is_active() {
                    self.teardown();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn notify(&self, notice: TravelNotice) {
        if self.notices.send(notice).is_err() {
            debug!("Travel notice dropped: receiver closed");
        }
    }

    fn ensure_not_transitioning(&self) -> Result<(), TravelError> {
        if self.is_transitioning() {
            Err(TravelError::AlreadyTransitioning)
        } else {
            Ok(())
        }
    }

    fn check_travel_target(&self, target: SessionId) -> Result<(), TravelError> {
        self.ensure_not_transitioning()?;
        if target.is_none() || !self.is_active() || target == self.current_session_id() {
            return Err(TravelError::InvalidTarget(target));
        }
        Ok(())
    }

    /// Validate `target` and follow any re-hosting recorded for it.
    fn resolve_travel_target(&self, target: SessionId) -> Result<SessionId, TravelError> {
        self.check_travel_target(target)?;
        let resolved = self.cache.current_session_id(target);
        if resolved != target {
            debug!("Session {} was re-hosted as {}", target, resolved);
            self.check_travel_target(resolved)?;
        }
        Ok(resolved)
    }

    /// Ask the directory whether a cached target still exists. Returns false when
    /// nothing is cached for it and the caller should travel straight away.
    fn probe_cached_target(&mut self, requested: SessionId, target: SessionId) -> bool {
        if !self.cache.has_cached_state(requested) && !self.cache.has_cached_state(target) {
            return false;
        }
        let Some(from_session) = self.live.as_ref().map(|l| l.session_id) else {
            return false;
        };
        debug!("Probing cached target {}", target);
        self.probes.insert(
            target,
            PortalProbe {
                portal_index: None,
                linked: requested,
                from_session,
            },
        );
        self.directory.request_data(target);
        true
    }

    /// Cache the field being left, then drop the transport and the lobby. The own
    /// town's id was recorded when it was created. Safe to call with no session.
    fn depart(&mut self) {
        let session_id = self.current_session_id();
        if let Some(live) = self.live.take() {
            if live.map_type == MapType::Field {
                self.cache_live_field(&live);
            }
            self.notify(TravelNotice::Departed {
                session_id,
                map_type: live.map_type,
            });
        }
        self.probes.clear();
        self.connected_host = None;
        self.map_type = MapType::None;
        self.disconnect_transport();
        self.directory.leave();
    }

    fn disconnect_transport(&mut self) {
        if self.transport.is_active() {
            self.expected_closes += 1;
            self.transport.disconnect();
        }
    }

    fn cache_live_field(&mut self, live: &LiveMap) {
        if let Some(state) = live.to_field_state() {
            self.cache.cache(live.session_id, state);
            metrics::inc_fields_cached();
        }
    }

    fn begin_create(&mut self, pending: PendingCreation) {
        self.state = TravelState::Hosting(pending.map_type());
        self.pending = Some(pending);
        metrics::inc_transition_started();
        self.directory.create(self.settings.capacity);
    }

    fn begin_join(&mut self, target: SessionId) {
        self.state = TravelState::Joining;
        metrics::inc_transition_started();
        self.directory.join(target);
    }

    fn write_metadata(&mut self, meta: &SessionMetadata) {
        let pairs = meta.to_pairs();
        debug!(
            "Lobby {} metadata: {}",
            self.current_session_id(),
            format_pairs(&pairs)
        );
        for (key, value) in pairs {
            if !self.directory.set_metadata(key, &value) {
                warn!("Directory refused metadata {}", key);
            }
        }
    }

    fn on_created(&mut self, id: SessionId) {
        if !matches!(self.state, TravelState::Hosting(_)) {
            warn!("Unexpected lobby creation {} in state {:?}", id, self.state);
            return;
        }
        let Some(pending) = self.pending.take() else {
            warn!("Lobby {} created with nothing pending", id);
            return;
        };
        let me = self.settings.identity;

        let live = match pending {
            PendingCreation::Town => {
                if let Some(previous) = self.town.record_new_town(id) {
                    info!("Town moved from session {} to {}", previous, id);
                    self.notify(TravelNotice::TownRehosted {
                        previous,
                        current: id,
                    });
                }
                self.map_type = MapType::Town;
                let meta = SessionMetadata::Town {
                    display_name: self.town.display_name.clone(),
                    owner: Some(me),
                };
                self.write_metadata(&meta);
                LiveMap::town(
                    id,
                    self.town.display_name.clone(),
                    Some(me),
                    self.town.portals.clone(),
                )
            }
            PendingCreation::Field(params) => {
                self.map_type = MapType::Field;
                let display_name = field_display_name(&params);
                self.write_metadata(&SessionMetadata::Field {
                    display_name: display_name.clone(),
                    owner: Some(me),
                    params: params.clone(),
                });
                self.link_origin_portal(&params, id, &display_name);
                LiveMap::generated_field(
                    id,
                    display_name,
                    Some(me),
                    params,
                    self.settings.field_portal_count,
                )
            }
            PendingCreation::Restore { old_id, state } => {
                self.map_type = MapType::Field;
                let display_name = field_display_name(&state.params);
                self.write_metadata(&SessionMetadata::Field {
                    display_name: display_name.clone(),
                    owner: Some(me),
                    params: state.params.clone(),
                });
                self.cache.register_remapping(old_id, id);
                self.cache.remove_cached_state(old_id);
                metrics::inc_fields_restored();
                info!("Field {} restored as session {}", old_id, id);
                LiveMap::restored_field(id, display_name, Some(me), state)
            }
        };

        self.live = Some(live);
        self.transport.start_host();
    }

    /// Point the portal the field was entered through at the new lobby, wherever
    /// that portal is tracked locally (own town or a cached field).
    fn link_origin_portal(&mut self, params: &FieldParams, field_id: SessionId, name: &str) {
        let origin = params.origin_session_id;
        if origin.is_none() {
            return;
        }
        if self.town.is_my_town(origin, None) {
            if let Some(portal) = self.town.portal_mut(params.origin_portal_index) {
                portal.link(field_id, name);
                portal.generation_seed = params.seed;
                portal.theme = params.theme;
                return;
            }
        }
        if !self
            .cache
            .update_portal_link(origin, params.origin_portal_index, field_id, name)
        {
            debug!(
                "Origin {} portal {} is not tracked here; only the return link exists",
                origin, params.origin_portal_index
            );
        }
    }

    fn on_joined(&mut self, id: SessionId) {
        if self.state != TravelState::Joining {
            warn!("Unexpected join of {} in state {:?}", id, self.state);
            return;
        }
        let meta = SessionMetadata::read(|key| self.directory.metadata(id, key));
        let host = self.directory.owner(id).or(meta.owner());
        self.map_type = meta.map_type();

        let live = match meta {
            SessionMetadata::Town {
                display_name,
                owner,
            } => {
                let portals = if self.town.is_my_town(id, owner) {
                    self.town.portals.clone()
                } else {
                    default_town_portals(self.settings.town_portal_count)
                };
                LiveMap::town(id, display_name, owner, portals)
            }
            SessionMetadata::Field {
                display_name,
                owner,
                params,
            } => LiveMap::generated_field(
                id,
                display_name,
                owner,
                params,
                self.settings.field_portal_count,
            ),
        };
        self.live = Some(live);
        self.state = TravelState::Active {
            map: self.map_type,
            role: Role::Client,
        };

        match host {
            Some(host) => {
                self.connected_host = Some(host);
                self.transport.start_client(host);
                self.finish_arrival(Role::Client);
            }
            None => self.on_transport_failure(format!("session {} has no owner", id)),
        }
    }

    fn finish_arrival(&mut self, role: Role) {
        let session_id = self.current_session_id();
        info!(
            "Arrived in {} session {} as {}",
            self.map_type, session_id, role
        );
        metrics::inc_transition_completed();
        metrics::record_arrival(self.map_type, role);
        self.notify(TravelNotice::Arrived {
            session_id,
            map_type: self.map_type,
            role,
        });
        self.prune_orphaned_fields();
    }

    fn on_directory_failure(&mut self, reason: String) {
        warn!("Directory failure: {}", escape_log(&reason));
        if self.is_transitioning() {
            // The old lobby is already gone; there is nothing to fall back to.
            self.pending = None;
            self.live = None;
            self.map_type = MapType::None;
            self.state = TravelState::Idle;
            metrics::inc_transition_failed();
        }
        self.notify(TravelNotice::DirectoryFailed(reason));
    }

    fn on_transport_failure(&mut self, reason: String) {
        warn!("Transport failure: {}", escape_log(&reason));
        let hosting = matches!(self.state, TravelState::Hosting(_))
            || self.role() == Some(Role::Host);
        if matches!(self.state, TravelState::Hosting(_) | TravelState::Active { .. }) {
            // Roll back the lobby. A hosted field's content stays restorable.
            if let Some(live) = self.live.take() {
                if hosting && live.map_type == MapType::Field {
                    self.cache_live_field(&live);
                }
            }
            self.pending = None;
            self.probes.clear();
            self.connected_host = None;
            self.map_type = MapType::None;
            self.disconnect_transport();
            self.directory.leave();
            self.state = TravelState::Idle;
            metrics::inc_transition_failed();
        }
        self.notify(TravelNotice::TransportFailed(reason));
    }

    fn teardown(&mut self) {
        let session_id = self.current_session_id();
        if let Some(live) = self.live.take() {
            if live.map_type == MapType::Field {
                self.cache_live_field(&live);
            }
        }
        self.probes.clear();
        self.connected_host = None;
        self.map_type = MapType::None;
        self.directory.leave();
        self.state = TravelState::Idle;
        self.notify(TravelNotice::Disconnected { session_id });
    }

    fn on_probe_result(&mut self, id: SessionId, exists: bool) {
        let Some(probe) = self.probes.remove(&id) else {
            debug!("Unsolicited data for session {}", id);
            return;
        };
        let still_here = self.is_active()
            && self
                .live
                .as_ref()
                .is_some_and(|l| l.session_id == probe.from_session);
        if !still_here {
            debug!("Dropping probe result for {}: left the map", id);
            return;
        }

        if exists {
            let map = MapType::from_metadata(
                self.directory.metadata(id, metadata::MAP_TYPE).as_deref(),
            );
            let result = match map {
                MapType::Field => self.join_field(id),
                _ => self.join_town(id),
            };
            if let Err(e) = result {
                warn!("Travel to probed session {} rejected: {}", id, e);
            }
            return;
        }

        if self.town.is_my_town(id, None) || self.town.is_my_town(probe.linked, None) {
            if let Err(e) = self.join_town(id) {
                warn!("Re-hosting own town via portal failed: {}", e);
            }
            return;
        }

        let cached = [id, probe.linked]
            .into_iter()
            .find(|candidate| self.cache.get_cached_state(*candidate).is_some());
        match cached {
            Some(cached_id) => {
                debug!("Target {} is gone but cached as {}", id, cached_id);
                self.notify(TravelNotice::RestoreOffered {
                    portal_index: probe.portal_index,
                    cached_id,
                });
            }
            None => match probe.portal_index {
                Some(portal_index) => {
                    info!(
                        "Portal {} pointed at vanished session {}; clearing link",
                        portal_index, id
                    );
                    self.clear_portal_link(portal_index);
                    self.notify(TravelNotice::StaleLinkCleared {
                        portal_index,
                        target: id,
                    });
                }
                None => {
                    warn!("Session {} vanished before it could be joined", id);
                    self.notify(TravelNotice::DirectoryFailed(format!(
                        "lobby {} no longer exists",
                        id
                    )));
                }
            },
        }
    }

    fn clear_portal_link(&mut self, index: usize) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        if let Some(portal) = live.portal_mut(index) {
            portal.clear_link();
        }
        let own_town = live.map_type == MapType::Town
            && self.town.is_my_town(live.session_id, live.owner);
        if own_town {
            if let Some(portal) = self.town.portal_mut(index) {
                portal.clear_link();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{InMemoryDirectory, LoopbackNetwork, LoopbackTransport};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Rig {
        coordinator: MapTravelCoordinator<InMemoryDirectory, LoopbackTransport>,
        directory_events: UnboundedReceiver<DirectoryEvent>,
        transport_events: UnboundedReceiver<TransportEvent>,
        notices: UnboundedReceiver<TravelNotice>,
    }

    impl Rig {
        fn new(network: &LoopbackNetwork, identity: u64) -> Self {
            let endpoints = network.connect(PeerId(identity));
            let (tx, notices) = mpsc::unbounded_channel();
            let settings = TravelSettings {
                identity: PeerId(identity),
                ..TravelSettings::default()
            };
            Self {
                coordinator: MapTravelCoordinator::new(
                    settings,
                    endpoints.directory,
                    endpoints.transport,
                    tx,
                ),
                directory_events: endpoints.directory_events,
                transport_events: endpoints.transport_events,
                notices,
            }
        }

        fn pump(&mut self) {
            loop {
                if let Ok(event) = self.directory_events.try_recv() {
                    self.coordinator.handle_directory_event(event);
                } else if let Ok(event) = self.transport_events.try_recv() {
                    self.coordinator.handle_transport_event(event);
                } else {
                    break;
                }
            }
        }

        fn drain_notices(&mut self) -> Vec<TravelNotice> {
            let mut out = Vec::new();
            while let Ok(n) = self.notices.try_recv() {
                out.push(n);
            }
            out
        }
    }

    #[test]
    fn host_town_reaches_active_after_transport_starts() {
        let network = LoopbackNetwork::default();
        let mut rig = Rig::new(&network, 1);
        rig.coordinator.host_town().unwrap();
        assert_eq!(rig.coordinator.state(), TravelState::Hosting(MapType::Town));
        assert_eq!(rig.coordinator.host_town(), Err(TravelError::AlreadyTransitioning));
        rig.pump();
        assert_eq!(
            rig.coordinator.state(),
            TravelState::Active {
                map: MapType::Town,
                role: Role::Host
            }
        );
        let id = rig.coordinator.current_session_id();
        assert_eq!(
            rig.coordinator.directory().metadata(id, metadata::MAP_TYPE).as_deref(),
            Some("town")
        );
        assert!(rig
            .drain_notices()
            .iter()
            .any(|n| matches!(n, TravelNotice::Arrived { role: Role::Host, .. })));
    }

    #[test]
    fn travel_requires_a_session_and_a_real_target() {
        let network = LoopbackNetwork::default();
        let mut rig = Rig::new(&network, 1);
        assert_eq!(
            rig.coordinator.travel_to_field(SessionId(4)),
            Err(TravelError::InvalidTarget(SessionId(4)))
        );
        rig.coordinator.host_town().unwrap();
        rig.pump();
        let here = rig.coordinator.current_session_id();
        assert_eq!(
            rig.coordinator.travel_to_town(SessionId::NONE),
            Err(TravelError::InvalidTarget(SessionId::NONE))
        );
        assert_eq!(
            rig.coordinator.travel_to_town(here),
            Err(TravelError::InvalidTarget(here))
        );
        assert!(rig.coordinator.is_active());
    }

    #[test]
    fn failed_join_after_leave_strands_at_idle() {
        let network = LoopbackNetwork::default();
        let mut rig = Rig::new(&network, 1);
        rig.coordinator.host_town().unwrap();
        rig.pump();
        rig.coordinator.travel_to_field(SessionId(999)).unwrap();
        rig.pump();
        assert_eq!(rig.coordinator.state(), TravelState::Idle);
        assert_eq!(rig.coordinator.map_type(), MapType::None);
        assert_eq!(rig.coordinator.current_session_id(), SessionId::NONE);
        assert!(rig
            .drain_notices()
            .iter()
            .any(|n| matches!(n, TravelNotice::DirectoryFailed(_))));
    }

    #[test]
    fn transport_failure_rolls_back_created_lobby() {
        let network = LoopbackNetwork::default();
        let mut rig = Rig::new(&network, 1);
        rig.coordinator.transport_mut().fail_next_start("relay unreachable");
        rig.coordinator.host_town().unwrap();
        rig.pump();
        assert_eq!(rig.coordinator.state(), TravelState::Idle);
        assert!(network.registry.lobby_ids().is_empty());
        assert!(rig
            .drain_notices()
            .contains(&TravelNotice::TransportFailed("relay unreachable".into())));
    }

    #[test]
    fn pick_up_only_works_on_fields() {
        let network = LoopbackNetwork::default();
        let mut rig = Rig::new(&network, 1);
        let mut bag = Inventory::new(4, 99);
        rig.coordinator.host_town().unwrap();
        rig.pump();
        assert_eq!(
            rig.coordinator.pick_up_item(0, &mut bag),
            Err(TravelError::NotInField)
        );
        rig.coordinator.enter_portal(0).unwrap();
        rig.pump();
        let first = rig.coordinator.live_map().unwrap().items[0].clone();
        let before = rig.coordinator.live_map().unwrap().items.len();
        assert_eq!(rig.coordinator.pick_up_item(0, &mut bag), Ok(first.quantity));
        assert_eq!(bag.count(first.item_id), first.quantity);
        assert_eq!(rig.coordinator.live_map().unwrap().items.len(), before - 1);
    }
}
