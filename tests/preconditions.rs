//! Requests that are rejected up front leave the coordinator untouched.

mod common;

use common::{hosted, settle, Player};
use waygate::field::FieldParams;
use waygate::session::{LoopbackNetwork, MapType, Role, SessionId};
use waygate::travel::TravelState;
use waygate::TravelError;

#[test]
fn idle_player_cannot_travel() {
    let network = LoopbackNetwork::default();
    let mut player = Player::join(&network, 1, "Hearth");

    let rejected = [
        player.travel().travel_to_field(SessionId(3)),
        player.travel().travel_to_town(SessionId(3)),
        player.travel().create_field(FieldParams::default()),
        player.travel().enter_portal(0),
        player.travel().leave_session(),
        player.travel().restore_cached_field(SessionId(3)),
    ];
    assert_eq!(
        rejected,
        [
            Err(TravelError::InvalidTarget(SessionId(3))),
            Err(TravelError::InvalidTarget(SessionId(3))),
            Err(TravelError::NoActiveSession),
            Err(TravelError::NoActiveSession),
            Err(TravelError::NoActiveSession),
            Err(TravelError::NoCachedState(SessionId(3))),
        ]
    );
    assert_eq!(player.view().state(), TravelState::Idle);
    assert!(network.registry.lobby_ids().is_empty());
    assert!(player.drain().is_empty());
}

#[test]
fn hosting_twice_is_rejected_without_side_effects() {
    let network = LoopbackNetwork::default();
    let mut player = hosted(&network, 1, "Hearth");
    let town = player.session();
    player.drain();

    let err = player.travel().host_town().unwrap_err();
    assert_eq!(err, TravelError::AlreadyInSession(town));
    assert!(err.is_precondition());
    settle(&mut [&mut player]);

    assert_eq!(
        player.view().state(),
        TravelState::Active {
            map: MapType::Town,
            role: Role::Host
        }
    );
    assert_eq!(player.session(), town);
    assert_eq!(network.registry.lobby_ids(), vec![town]);
    assert!(player.drain().is_empty());
}

#[test]
fn requests_wait_for_the_transition_in_flight() {
    let network = LoopbackNetwork::default();
    let mut player = hosted(&network, 1, "Hearth");
    let town = player.session();
    let other = hosted(&network, 2, "Elsewhere");

    player.travel().travel_to_town(other.session()).unwrap();
    assert_eq!(player.view().state(), TravelState::Joining);
    assert!(player.view().is_transitioning());
    for result in [
        player.travel().host_town(),
        player.travel().travel_to_field(town),
        player.travel().enter_portal(0),
        player.travel().leave_session(),
    ] {
        assert_eq!(result, Err(TravelError::AlreadyTransitioning));
    }
}

#[test]
fn travel_targets_must_be_real_and_elsewhere() {
    let network = LoopbackNetwork::default();
    let mut player = hosted(&network, 1, "Hearth");
    let town = player.session();

    assert_eq!(
        player.travel().travel_to_field(SessionId::NONE),
        Err(TravelError::InvalidTarget(SessionId::NONE))
    );
    assert_eq!(
        player.travel().travel_to_field(town),
        Err(TravelError::InvalidTarget(town))
    );
    assert_eq!(
        player.travel().enter_portal(42),
        Err(TravelError::PortalOutOfRange(42))
    );
    assert!(TravelError::PortalOutOfRange(42).is_precondition());
    assert!(!TravelError::Directory("full".into()).is_precondition());
    assert_eq!(player.session(), town);
}
