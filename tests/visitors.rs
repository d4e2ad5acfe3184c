//! Two players sharing towns and fields.

mod common;

use common::{hosted, settle};
use waygate::session::{LoopbackNetwork, MapType, PeerId, Role, SessionId};
use waygate::travel::{LobbySummary, TravelNotice, TravelState};

#[test]
fn visitor_joins_a_town_as_client() {
    let network = LoopbackNetwork::default();
    let mut host = hosted(&network, 1, "Hearth");
    let mut visitor = hosted(&network, 2, "Brook");
    let town = host.session();
    host.drain();

    visitor.travel().travel_to_town(town).unwrap();
    settle(&mut [&mut host, &mut visitor]);

    assert_eq!(
        visitor.view().state(),
        TravelState::Active {
            map: MapType::Town,
            role: Role::Client
        }
    );
    assert_eq!(visitor.session(), town);
    assert_eq!(network.registry.members(town), vec![PeerId(1), PeerId(2)]);
    assert_eq!(network.hub.clients_of(PeerId(1)), vec![PeerId(2)]);
    assert!(host.drain().contains(&TravelNotice::PeerJoined(PeerId(2))));

    // someone else's town: fresh unlinked portals, visitor's own town untouched
    let live = visitor.view().live_map().unwrap();
    assert_eq!(live.display_name, "Hearth");
    assert!(live.portals.iter().all(|p| !p.is_linked()));
    assert_ne!(visitor.view().town().current_town, town);
}

#[test]
fn host_leaving_disconnects_visitors() {
    let network = LoopbackNetwork::default();
    let mut host = hosted(&network, 1, "Hearth");
    let mut visitor = hosted(&network, 2, "Brook");
    let town = host.session();
    visitor.travel().travel_to_town(town).unwrap();
    settle(&mut [&mut host, &mut visitor]);
    visitor.drain();

    host.travel().leave_session().unwrap();
    settle(&mut [&mut host, &mut visitor]);

    assert_eq!(host.view().state(), TravelState::Idle);
    assert_eq!(visitor.view().state(), TravelState::Idle);
    assert_eq!(visitor.session(), SessionId::NONE);
    assert!(visitor
        .drain()
        .contains(&TravelNotice::Disconnected { session_id: town }));
    assert!(network.registry.lobby_ids().is_empty());
}

#[test]
fn visitor_rebuilds_the_same_field_from_metadata() {
    let network = LoopbackNetwork::default();
    let mut host = hosted(&network, 1, "Hearth");
    let mut visitor = hosted(&network, 2, "Brook");

    host.travel().enter_portal(2).unwrap();
    settle(&mut [&mut host, &mut visitor]);
    let field = host.session();

    visitor.travel().travel_to_field(field).unwrap();
    settle(&mut [&mut host, &mut visitor]);
    assert_eq!(
        visitor.view().state(),
        TravelState::Active {
            map: MapType::Field,
            role: Role::Client
        }
    );
    let theirs = host.view().live_map().unwrap();
    let mine = visitor.view().live_map().unwrap();
    assert_eq!(mine.items, theirs.items);
    assert_eq!(mine.portals, theirs.portals);
    assert_eq!(mine.field, theirs.field);
    assert_eq!(mine.display_name, theirs.display_name);
}

#[test]
fn full_lobby_strands_the_joiner() {
    let network = LoopbackNetwork::default();
    let mut host = hosted(&network, 1, "Hearth");
    let mut second = hosted(&network, 2, "Brook");
    let town = host.session();
    // default capacity is four; fill the remaining seats
    let mut fillers: Vec<_> = (3..=5).map(|id| hosted(&network, id, "Filler")).collect();
    for filler in fillers.iter_mut() {
        filler.travel().travel_to_town(town).unwrap();
        settle(&mut [&mut host, filler]);
    }
    assert_eq!(network.registry.members(town).len(), 4);

    second.travel().travel_to_town(town).unwrap();
    settle(&mut [&mut host, &mut second]);
    assert_eq!(second.view().state(), TravelState::Idle);
    assert!(second
        .drain()
        .contains(&TravelNotice::DirectoryFailed(format!("lobby {} is full", town))));
}

#[test]
fn lobby_list_describes_each_session() {
    let network = LoopbackNetwork::default();
    let host = hosted(&network, 1, "Hearth");
    let mut browser = hosted(&network, 2, "Brook");
    browser.drain();

    browser.travel().refresh_lobbies();
    settle(&mut [&mut browser]);
    let listing = browser
        .drain()
        .into_iter()
        .find_map(|n| match n {
            TravelNotice::LobbyList(list) => Some(list),
            _ => None,
        })
        .expect("lobby list");
    assert_eq!(listing.len(), 2);
    assert_eq!(
        listing[0],
        LobbySummary {
            id: host.session(),
            map_type: MapType::Town,
            display_name: "Hearth".into(),
            members: 1,
        }
    );
    assert_eq!(listing[1].display_name, "Brook");
}

#[test]
fn late_disconnect_from_a_former_host_is_ignored() {
    let network = LoopbackNetwork::default();
    let mut first = hosted(&network, 1, "Hearth");
    let mut visitor = hosted(&network, 2, "Brook");
    let mut second = hosted(&network, 3, "Fen");
    second.travel().enter_portal(0).unwrap();
    settle(&mut [&mut second]);
    let field = second.session();

    visitor.travel().travel_to_town(first.session()).unwrap();
    settle(&mut [&mut first, &mut visitor]);
    visitor.drain();

    // The first host leaves, but the visitor moves on before hearing about it.
    first.travel().leave_session().unwrap();
    settle(&mut [&mut first]);
    visitor.travel().travel_to_field(field).unwrap();
    settle(&mut [&mut first, &mut visitor, &mut second]);

    assert_eq!(
        visitor.view().state(),
        TravelState::Active {
            map: MapType::Field,
            role: Role::Client
        }
    );
    assert_eq!(visitor.session(), field);
    assert_eq!(network.hub.clients_of(PeerId(3)), vec![PeerId(2)]);
    let notices = visitor.drain();
    assert!(notices.contains(&TravelNotice::Arrived {
        session_id: field,
        map_type: MapType::Field,
        role: Role::Client,
    }));
    assert!(!notices
        .iter()
        .any(|n| matches!(n, TravelNotice::Disconnected { .. })));
}
