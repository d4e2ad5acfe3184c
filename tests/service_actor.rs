//! The async service: commands in through a handle, notices out on a channel.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Duration};
use waygate::inventory::Inventory;
use waygate::session::{LoopbackNetwork, MapType, PeerId, Role};
use waygate::travel::{TravelHandle, TravelNotice, TravelService, TravelSettings, TravelState};
use waygate::TravelError;

fn spawn_player(
    network: &LoopbackNetwork,
    identity: u64,
) -> (TravelHandle, UnboundedReceiver<TravelNotice>, tokio::task::JoinHandle<()>) {
    let settings = TravelSettings {
        identity: PeerId(identity),
        town_name: format!("Town {}", identity),
        ..TravelSettings::default()
    };
    let (service, notices) = TravelService::loopback(network, settings);
    let (handle, commands) = TravelHandle::channel();
    let task = tokio::spawn(service.run(commands));
    (handle, notices, task)
}

async fn wait_for_arrival(notices: &mut UnboundedReceiver<TravelNotice>) -> (MapType, Role) {
    loop {
        let notice = timeout(Duration::from_secs(2), notices.recv())
            .await
            .expect("timed out waiting for arrival")
            .expect("notice channel closed");
        if let TravelNotice::Arrived { map_type, role, .. } = notice {
            return (map_type, role);
        }
    }
}

#[tokio::test]
async fn two_players_meet_in_a_field() {
    let network = LoopbackNetwork::default();
    let (host, mut host_notices, host_task) = spawn_player(&network, 1);
    let (visitor, mut visitor_notices, visitor_task) = spawn_player(&network, 2);

    host.host_town().await.unwrap();
    assert_eq!(wait_for_arrival(&mut host_notices).await, (MapType::Town, Role::Host));
    visitor.host_town().await.unwrap();
    wait_for_arrival(&mut visitor_notices).await;

    host.enter_portal(1).await.unwrap();
    assert_eq!(wait_for_arrival(&mut host_notices).await, (MapType::Field, Role::Host));
    let field = host.snapshot().await.unwrap().session_id;

    visitor.travel_to_field(field).await.unwrap();
    assert_eq!(
        wait_for_arrival(&mut visitor_notices).await,
        (MapType::Field, Role::Client)
    );
    let snap = visitor.snapshot().await.unwrap();
    assert_eq!(snap.session_id, field);
    assert_eq!(
        snap.state,
        TravelState::Active {
            map: MapType::Field,
            role: Role::Client
        }
    );

    let (bag, taken) = visitor.pick_up_item(0, Inventory::new(10, 99)).await.unwrap();
    let taken = taken.unwrap();
    assert!(taken >= 1);
    assert_eq!(bag.slot(0).map(|s| s.quantity), Some(taken));

    host.shutdown();
    visitor.shutdown();
    host_task.await.unwrap();
    visitor_task.await.unwrap();
    assert!(network.registry.lobby_ids().is_empty());
    assert_eq!(visitor.host_town().await, Err(TravelError::ServiceClosed));
}

#[tokio::test]
async fn dropping_every_handle_stops_the_loop() {
    let network = LoopbackNetwork::default();
    let (handle, _notices, task) = spawn_player(&network, 3);
    handle.host_town().await.unwrap();
    drop(handle);
    timeout(Duration::from_secs(2), task)
        .await
        .expect("service did not stop")
        .unwrap();
}
