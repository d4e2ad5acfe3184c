//! Cached fields come back under a new lobby id with their content intact.

mod common;

use common::{hosted, settle, Player};
use waygate::field::{FieldParams, FieldState, ItemKind, ItemPlacement, PortalConfig, Position, Theme};
use waygate::inventory::Inventory;
use waygate::session::metadata::{GENERATION_SEED, MAP_TYPE};
use waygate::session::{LoopbackNetwork, MapType, Role, SessionDirectory, SessionId};
use waygate::travel::{TravelNotice, TravelState, RETURN_PORTAL_INDEX};

fn cached_field() -> FieldState {
    let params = FieldParams {
        seed: 77,
        origin_session_id: SessionId(40),
        origin_portal_index: 2,
        origin_map_name: "Old Mill".into(),
        theme: Theme::Frost,
    };
    let item = |kind, x, quantity| ItemPlacement {
        item_id: kind,
        position: Position { x, z: 3.0 },
        quantity,
    };
    let mut back = PortalConfig::unlinked(RETURN_PORTAL_INDEX, 0, Theme::Frost);
    back.link(SessionId(40), "Old Mill");
    let mut onward = PortalConfig::unlinked(1, 91, Theme::Frost);
    onward.link(SessionId(55), "Frost Field");
    let spare = PortalConfig::unlinked(2, 92, Theme::Frost);
    FieldState {
        params,
        items: vec![
            item(ItemKind::Crystal, 10.0, 3),
            item(ItemKind::Herb, -12.0, 1),
            item(ItemKind::Crystal, 20.0, 2),
        ],
        portals: vec![back, onward, spare],
    }
}

#[test]
fn restore_from_idle_remaps_old_id() {
    let network = LoopbackNetwork::starting_at(101);
    let mut player = Player::join(&network, 1, "Hearth");
    let state = cached_field();
    player.travel().cache_mut().cache(SessionId(100), state.clone());

    player.travel().restore_cached_field(SessionId(100)).unwrap();
    assert_eq!(player.view().state(), TravelState::Hosting(MapType::Field));
    settle(&mut [&mut player]);

    assert_eq!(player.session(), SessionId(101));
    assert!(player.view().is_active());
    let live = player.view().live_map().unwrap();
    assert_eq!(live.items, state.items);
    for cached in state.portals.iter().filter(|p| p.portal_index != RETURN_PORTAL_INDEX) {
        assert_eq!(live.portal(cached.portal_index), Some(cached));
    }
    let cache = player.view().cache();
    assert_eq!(cache.current_session_id(SessionId(100)), SessionId(101));
    assert_eq!(cache.current_session_id(SessionId(101)), SessionId(101));
    assert!(cache.get_cached_state(SessionId(100)).is_none());

    // metadata is rewritten for the new lobby so visitors can rebuild it
    let dir = player.view().directory();
    assert_eq!(dir.metadata(SessionId(101), MAP_TYPE).as_deref(), Some("field"));
    assert_eq!(dir.metadata(SessionId(101), GENERATION_SEED).as_deref(), Some("77"));
}

#[test]
fn picked_up_items_stay_picked_up() {
    let network = LoopbackNetwork::default();
    let mut player = hosted(&network, 1, "Hearth");
    player.travel().enter_portal(1).unwrap();
    settle(&mut [&mut player]);
    let field = player.session();
    let before = player.view().live_map().unwrap().items.clone();

    let mut bag = Inventory::new(20, 99);
    let taken = player.travel().pick_up_item(0, &mut bag).unwrap();
    assert_eq!(taken, before[0].quantity);

    player.travel().enter_portal(0).unwrap();
    settle(&mut [&mut player]);
    assert_eq!(player.view().map_type(), MapType::Town);
    assert_eq!(
        player.view().cache().get_cached_state(field).unwrap().items,
        before[1..].to_vec()
    );

    player.travel().restore_cached_field(field).unwrap();
    settle(&mut [&mut player]);
    assert_eq!(player.view().live_map().unwrap().items, before[1..].to_vec());
}

#[test]
fn partial_pickup_leaves_the_rest_on_the_ground() {
    let network = LoopbackNetwork::default();
    let mut player = hosted(&network, 1, "Hearth");
    player.travel().cache_mut().cache(SessionId(500), cached_field());
    player.travel().restore_cached_field(SessionId(500)).unwrap();
    settle(&mut [&mut player]);

    // one slot holding at most one item: only one of the three crystals fits
    let mut bag = Inventory::new(1, 1);
    assert_eq!(player.travel().pick_up_item(0, &mut bag), Ok(1));
    let after = &player.view().live_map().unwrap().items[0];
    assert_eq!(after.item_id, ItemKind::Crystal);
    assert_eq!(after.quantity, 2);

    assert_eq!(player.travel().pick_up_item(1, &mut bag), Ok(0));
    assert_eq!(player.view().live_map().unwrap().items.len(), 3);
    assert_eq!(
        player.travel().pick_up_item(7, &mut bag),
        Err(waygate::TravelError::ItemOutOfRange(7))
    );
}

#[test]
fn travelling_to_a_dead_cached_field_offers_a_restore() {
    let network = LoopbackNetwork::default();
    let mut player = hosted(&network, 1, "Hearth");
    player.travel().enter_portal(0).unwrap();
    settle(&mut [&mut player]);
    let field = player.session();
    player.travel().enter_portal(RETURN_PORTAL_INDEX).unwrap();
    settle(&mut [&mut player]);
    let town = player.session();
    assert!(player.view().cache().has_cached_state(field));
    player.drain();

    player.travel().travel_to_field(field).unwrap();
    settle(&mut [&mut player]);

    // Still home: nothing was left before the lobby was known to be gone.
    assert_eq!(player.session(), town);
    assert_eq!(
        player.view().state(),
        TravelState::Active {
            map: MapType::Town,
            role: Role::Host
        }
    );
    assert_eq!(
        player.drain(),
        vec![TravelNotice::RestoreOffered {
            portal_index: None,
            cached_id: field,
        }]
    );

    player.travel().restore_cached_field(field).unwrap();
    settle(&mut [&mut player]);
    assert_eq!(player.view().map_type(), MapType::Field);
    assert_eq!(
        player.view().cache().current_session_id(field),
        player.session()
    );
}

#[test]
fn travelling_to_a_live_cached_field_joins_it() {
    let network = LoopbackNetwork::default();
    let mut host = hosted(&network, 1, "Hearth");
    let mut visitor = hosted(&network, 2, "Brook");
    host.travel().enter_portal(1).unwrap();
    settle(&mut [&mut host, &mut visitor]);
    let field = host.session();

    // The visitor opens an onward field, so the host's field stays cached and linked.
    visitor.travel().travel_to_field(field).unwrap();
    settle(&mut [&mut host, &mut visitor]);
    visitor.travel().enter_portal(1).unwrap();
    settle(&mut [&mut host, &mut visitor]);
    assert_ne!(visitor.session(), field);
    assert!(visitor.view().cache().has_cached_state(field));

    visitor.travel().travel_to_field(field).unwrap();
    assert!(visitor.view().is_active(), "left before the lobby was confirmed");
    settle(&mut [&mut host, &mut visitor]);
    assert_eq!(visitor.session(), field);
    assert_eq!(
        visitor.view().state(),
        TravelState::Active {
            map: MapType::Field,
            role: Role::Client
        }
    );
}
