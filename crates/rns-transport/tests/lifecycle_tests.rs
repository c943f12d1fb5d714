//! Start/stop, persistence and the background maintenance loop.

mod common;

use std::time::Duration;

use common::*;
use rns_core::{DestinationType, Identity};
use rns_transport::constants::PATH_EXPIRY;
use rns_transport::engine::maintenance::Due;
use rns_transport::persist::Storage;
use rns_transport::time::now_ms;
use rns_transport::{PathState, Transport, TransportConfig, TransportError};

#[test]
fn start_needs_a_runtime() {
    let t = Transport::new(TransportConfig::default());
    assert!(matches!(t.start(None, false), Err(TransportError::NoRuntime)));
    assert!(!t.is_running());
}

#[tokio::test]
async fn start_twice_is_rejected_until_stopped() {
    let t = node(false);
    assert!(t.is_running());
    assert!(matches!(t.start(None, false), Err(TransportError::AlreadyRunning)));

    t.stop().await;
    assert!(!t.is_running());
    let identity = t.identity().unwrap().hash();
    t.start(None, true).unwrap();
    assert_eq!(t.identity().unwrap().hash(), identity);
    assert!(t.is_transport_enabled());
    t.stop().await;
}

#[tokio::test]
async fn start_adopts_given_identity() {
    let t = Transport::new(TransportConfig::default());
    let identity = Identity::generate();
    let hash = identity.hash();
    t.start(Some(identity), false).unwrap();
    assert_eq!(t.identity().unwrap().hash(), hash);
    assert_eq!(t.transport_id(), Some(hash.into()));
    t.stop().await;
}

#[tokio::test]
async fn persisted_state_restores_paths_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);
    let dest = announce.destination;
    t.mark_path_unresponsive(&dest);
    let original = t.path_entry(&dest).unwrap();
    t.persist_data(dir.path()).await.unwrap();

    let saved = Storage::open(dir.path()).await.unwrap().load_identity().await.unwrap();
    assert_eq!(saved.map(|i| i.hash()), t.identity().map(|i| i.hash()));

    let restored = node(false);
    let (ra, _) = attach(&restored, "a");
    let log = AnnounceLog::new(false);
    restored.register_announce_handler(log.clone());
    assert_eq!(restored.load_persisted_data(dir.path()).await.unwrap(), 1);
    let loaded = restored.path_entry(&dest).expect("restored path");
    assert_eq!(loaded.next_hop, original.next_hop);
    assert_eq!(loaded.hops, original.hops);
    assert_eq!(loaded.state, PathState::Unresponsive);
    assert_eq!(loaded.failure_count, 1);

    receive(&restored, &ra, &announce);
    assert_eq!(log.count(), 0);
}

#[tokio::test]
async fn loading_keeps_better_known_paths() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Identity::generate();

    let t = node(false);
    let (a, _) = attach(&t, "a");
    let mut far = rns_transport::router::to_transport(
        &announce_packet(&remote, "echo", None),
        rns_core::TruncatedHash::new([5; 16]),
    );
    far.hops = 3;
    receive(&t, &a, &far);
    t.persist_data(dir.path()).await.unwrap();

    let other = node(false);
    let (oa, _) = attach(&other, "a");
    receive(&other, &oa, &announce_packet(&remote, "echo", None));
    assert_eq!(other.load_persisted_data(dir.path()).await.unwrap(), 0);
    assert_eq!(other.hops_to(&far.destination), 1);
}

#[tokio::test]
async fn shutdown_persists_and_clears() {
    let dir = tempfile::tempdir().unwrap();
    let t = node(true);
    let (a, _) = attach(&t, "a");
    attach(&t, "b");
    receive(&t, &a, &announce_packet(&Identity::generate(), "echo", None));
    assert!(!t.path_table().is_empty());

    t.shutdown(Some(dir.path())).await.unwrap();
    assert!(!t.is_running());
    assert!(t.path_table().is_empty());
    assert!(t.announce_table().is_empty());
    assert_eq!(t.hashlist_len(), 0);
    assert!(dir.path().join("destination_table").exists());
    assert!(dir.path().join("packet_hashlist").exists());
}

#[tokio::test]
async fn cull_drops_expired_paths_and_their_announces() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);

    t.maintenance_tick(
        now_ms() + PATH_EXPIRY + 1000,
        Due {
            cull: true,
            ..Due::default()
        },
    )
    .await;
    assert!(t.path_table().is_empty());
    assert!(t.announce_table().is_empty());
}

#[tokio::test]
async fn retire_forgets_previous_hash_generation() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    receive(&t, &a, &announce_packet(&Identity::generate(), "echo", None));
    assert_eq!(t.hashlist_len(), 1);
    t.maintenance_tick(now_ms(), Due::all()).await;
    // Still in the current generation.
    assert_eq!(t.hashlist_len(), 1);
}

#[tokio::test]
async fn unvalidated_link_entries_expire_after_proof_timeout() {
    let t = node(true);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &b, &announce);

    let request = rns_core::RawPacket::new(
        rns_core::PacketType::LinkRequest,
        DestinationType::Single,
        announce.destination,
        rns_core::ContextType::None,
        vec![3; 64],
    );
    let relayed = rns_transport::router::to_transport(&request, t.transport_id().unwrap());
    receive(&t, &a, &relayed);
    assert_eq!(t.link_table().len(), 1);

    let cull = Due {
        cull: true,
        ..Due::default()
    };
    t.maintenance_tick(now_ms() + 1000, cull).await;
    assert_eq!(t.link_table().len(), 1);
    t.maintenance_tick(now_ms() + 7000, cull).await;
    assert!(t.link_table().is_empty());
}

#[tokio::test(start_paused = true)]
async fn background_loop_sends_queued_announces() {
    let t = node(true);
    let (a, _) = attach(&t, "a");
    let (b, b_id) = attach(&t, "b");

    receive(&t, &a, &announce_packet(&Identity::generate(), "echo", None));
    assert_eq!(t.announce_queue_len(&b_id), 1);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(b.sent_count(), 1);
    assert_eq!(t.announce_queue_len(&b_id), 0);

    t.stop().await;
    receive(&t, &a, &announce_packet(&Identity::generate(), "other", None));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(b.sent_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn background_loop_ends_when_engine_is_dropped() {
    let t = node(false);
    let weak = std::sync::Arc::downgrade(&t);
    drop(t);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn config_drives_engine_limits() {
    let config = TransportConfig::parse(
        r#"
        [transport]
        enable_transport = true
        max_tunnels = 0
        "#,
    )
    .unwrap();
    let t = Transport::new(config);
    t.start(None, true).unwrap();
    let (_, id) = attach(&t, "a");
    // The tunnel is refused but the synthesis still goes out.
    assert!(t.synthesize_tunnel(&id).is_ok());
    assert!(t.tunnels().is_empty());
    assert!(t.config().enable_transport);
    t.stop().await;
}
