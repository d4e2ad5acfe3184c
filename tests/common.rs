//! Test utilities & fixtures.
//! Players on a shared loopback network, driven synchronously.

use tokio::sync::mpsc::UnboundedReceiver;
use waygate::session::{InMemoryDirectory, LoopbackNetwork, LoopbackTransport, PeerId, SessionId};
use waygate::travel::{MapTravelCoordinator, TravelNotice, TravelService, TravelSettings};

pub type Service = TravelService<InMemoryDirectory, LoopbackTransport>;

pub struct Player {
    pub service: Service,
    pub notices: UnboundedReceiver<TravelNotice>,
}

impl Player {
    pub fn join(network: &LoopbackNetwork, identity: u64, town_name: &str) -> Self {
        let settings = TravelSettings {
            identity: PeerId(identity),
            town_name: town_name.to_string(),
            ..TravelSettings::default()
        };
        let (service, notices) = TravelService::loopback(network, settings);
        Self { service, notices }
    }

    pub fn travel(&mut self) -> &mut MapTravelCoordinator<InMemoryDirectory, LoopbackTransport> {
        self.service.coordinator_mut()
    }

    pub fn view(&self) -> &MapTravelCoordinator<InMemoryDirectory, LoopbackTransport> {
        self.service.coordinator()
    }

    pub fn session(&self) -> SessionId {
        self.view().current_session_id()
    }

    pub fn drain(&mut self) -> Vec<TravelNotice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }
}

/// Deliver queued events to every player until nothing moves.
pub fn settle(players: &mut [&mut Player]) {
    loop {
        let handled: usize = players.iter_mut().map(|p| p.service.pump_pending()).sum();
        if handled == 0 {
            break;
        }
    }
}

/// Host a town for `player` and run it to `Active`.
#[allow(dead_code)] // not every test binary starts from a hosted town
pub fn hosted(network: &LoopbackNetwork, identity: u64, town_name: &str) -> Player {
    let mut player = Player::join(network, identity, town_name);
    player.travel().host_town().expect("host town");
    settle(&mut [&mut player]);
    assert!(player.view().is_active(), "town hosting did not settle");
    player
}
