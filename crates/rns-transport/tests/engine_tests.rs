//! Inbound and outbound dispatch against in-memory interfaces.

mod common;

use std::sync::Arc;

use common::*;
use rns_core::{
    ContextType, DestinationHash, DestinationType, HeaderType, Identity, PacketType, RawPacket,
    TruncatedHash,
};
use rns_transport::engine::maintenance::Due;
use rns_transport::ifac::{self, IfacCredentials};
use rns_transport::path::request::build_path_request;
use rns_transport::router::to_transport;
use rns_transport::testing::MemoryInterface;
use rns_transport::time::now_ms;
use rns_transport::{Interface, LocalDestination, TransportError};

#[tokio::test]
async fn valid_announce_installs_path_and_notifies_handlers() {
    let t = node(false);
    let (a, a_id) = attach(&t, "a");
    let log = AnnounceLog::new(false);
    t.register_announce_handler(log.clone());

    let remote = Identity::generate();
    let announce = announce_packet(&remote, "echo", Some(b"hello"));
    receive(&t, &a, &announce);

    let dest = announce.destination;
    assert!(t.has_path(&dest));
    assert_eq!(t.hops_to(&dest), 1);
    assert_eq!(t.next_hop(&dest), Some(TruncatedHash::from(dest)));
    assert_eq!(t.next_hop_interface(&dest), Some(a_id));
    assert_eq!(*log.seen.lock(), vec![(dest, Some(b"hello".to_vec()))]);
    assert!(t.announce_table().get(&dest).is_some());
}

#[tokio::test]
async fn duplicate_and_forged_announces_are_dropped() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let log = AnnounceLog::new(false);
    t.register_announce_handler(log.clone());

    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);
    receive(&t, &a, &announce);
    assert_eq!(log.count(), 1);

    let mut forged = announce_packet(&Identity::generate(), "echo", Some(b"x"));
    let last = forged.data.len() - 1;
    forged.data[last] ^= 0xff;
    receive(&t, &a, &forged);
    assert!(!t.has_path(&forged.destination));
    assert_eq!(log.count(), 1);
}

#[tokio::test]
async fn first_claiming_handler_stops_the_chain() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let first = AnnounceLog::new(true);
    let second = AnnounceLog::new(false);
    t.register_announce_handler(first.clone());
    let second_id = t.register_announce_handler(second.clone());

    receive(&t, &a, &announce_packet(&Identity::generate(), "one", None));
    assert_eq!(first.count(), 1);
    assert_eq!(second.count(), 0);

    assert!(t.deregister_announce_handler(second_id));
    assert!(!t.deregister_announce_handler(second_id));
}

#[tokio::test]
async fn shorter_announce_replaces_longer_path() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, b_id) = attach(&t, "b");
    let remote = Identity::generate();
    let relay = TruncatedHash::new([0x33; 16]);

    let mut far = to_transport(&announce_packet(&remote, "echo", None), relay);
    far.hops = 3;
    receive(&t, &a, &far);
    let dest = far.destination;
    assert_eq!(t.hops_to(&dest), 4);
    assert_eq!(t.next_hop(&dest), Some(relay));

    receive(&t, &b, &announce_packet(&remote, "echo", None));
    assert_eq!(t.hops_to(&dest), 1);
    assert_eq!(t.next_hop_interface(&dest), Some(b_id));
    assert_eq!(t.path_entry(&dest).map(|p| p.random_blobs.len()), Some(2));
}

#[tokio::test]
async fn longer_announce_only_tracks_blob() {
    let t = node(false);
    let (a, a_id) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let remote = Identity::generate();

    receive(&t, &a, &announce_packet(&remote, "echo", None));
    let dest = announce_packet(&remote, "echo", None).destination;

    let mut far = to_transport(&announce_packet(&remote, "echo", None), TruncatedHash::new([1; 16]));
    far.hops = 4;
    receive(&t, &b, &far);

    let entry = t.path_entry(&dest).expect("path");
    assert_eq!(entry.hops, 1);
    assert_eq!(entry.receiving_interface, a_id);
    assert_eq!(entry.random_blobs.len(), 2);
}

#[tokio::test]
async fn transport_node_rebroadcasts_on_other_interfaces() {
    let t = node(true);
    let (a, a_id) = attach(&t, "a");
    let (b, b_id) = attach(&t, "b");

    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);
    assert_eq!(t.announce_queue_len(&a_id), 0);
    assert_eq!(t.announce_queue_len(&b_id), 1);

    t.maintenance_tick(now_ms(), Due::default()).await;
    assert_eq!(a.sent_count(), 0);
    let sent = b.take_sent();
    assert_eq!(sent.len(), 1);

    let relayed = RawPacket::parse(&sent[0]).unwrap();
    assert_eq!(relayed.flags.header_type, HeaderType::Header2);
    assert_eq!(relayed.transport_id, t.transport_id());
    assert_eq!(relayed.hops, 1);
    assert_eq!(relayed.packet_hash(), announce.packet_hash());
}

#[tokio::test]
async fn queued_announce_waits_for_interface_to_come_back() {
    let t = node(true);
    let (a, _) = attach(&t, "a");
    let (b, b_id) = attach(&t, "b");

    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);
    assert_eq!(t.announce_queue_len(&b_id), 1);

    b.set_online(false);
    let now = now_ms();
    t.maintenance_tick(now, Due::default()).await;
    assert_eq!(b.sent_count(), 0);
    assert_eq!(t.announce_queue_len(&b_id), 1);

    b.set_writable(false);
    b.set_online(true);
    t.maintenance_tick(now + 10, Due::default()).await;
    assert_eq!(b.sent_count(), 0);
    assert_eq!(t.announce_queue_len(&b_id), 1);

    // No airtime was charged while the interface was unusable.
    b.set_writable(true);
    t.maintenance_tick(now + 20, Due::default()).await;
    let sent = b.take_sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(RawPacket::parse(&sent[0]).unwrap().packet_hash(), announce.packet_hash());
    assert_eq!(t.announce_queue_len(&b_id), 0);
}

#[tokio::test]
async fn non_transport_node_does_not_rebroadcast() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (_b, b_id) = attach(&t, "b");
    receive(&t, &a, &announce_packet(&Identity::generate(), "echo", None));
    assert_eq!(t.announce_queue_len(&b_id), 0);
}

#[tokio::test]
async fn path_responses_are_installed_but_not_rebroadcast() {
    let t = node(true);
    let (a, _) = attach(&t, "a");
    let (_b, b_id) = attach(&t, "b");

    let mut response = announce_packet(&Identity::generate(), "echo", None);
    response.context = ContextType::PathResponse;
    receive(&t, &a, &response);
    assert!(t.has_path(&response.destination));
    assert_eq!(t.announce_queue_len(&b_id), 0);
    assert!(t.announce_table().get(&response.destination).unwrap().path_response);
}

#[tokio::test]
async fn announce_retransmissions_are_rate_limited() {
    let t = node(true);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let log = AnnounceLog::new(false);
    t.register_announce_handler(log.clone());
    let remote = Identity::generate();

    let start = now_ms();
    for i in 0..7u64 {
        receive(&t, &a, &announce_packet(&remote, "echo", None));
        t.maintenance_tick(start + i * 1000, Due::default()).await;
    }
    assert_eq!(log.count(), 7);
    assert_eq!(b.sent_count(), 5);
}

#[tokio::test]
async fn one_hop_path_sends_on_path_interface_only() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);

    let packet = data_packet(announce.destination, DestinationType::Single, b"payload");
    assert!(t.outbound(&packet));
    assert_eq!(a.take_sent(), vec![wire(&packet)]);
    assert_eq!(b.sent_count(), 0);
}

#[tokio::test]
async fn no_path_broadcasts_on_usable_interfaces() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let (offline, _) = attach(&t, "offline");
    offline.set_online(false);
    let (mute, _) = attach(&t, "mute");
    mute.set_writable(false);

    let packet = data_packet(DestinationHash::new([0x77; 16]), DestinationType::Single, b"hi");
    assert!(t.outbound(&packet));
    assert_eq!(a.sent_count(), 1);
    assert_eq!(b.sent_count(), 1);
    assert_eq!(offline.sent_count(), 0);
    assert_eq!(mute.sent_count(), 0);

    // Our own broadcast looping back is a duplicate.
    let log = AnnounceLog::new(false);
    t.register_announce_handler(log.clone());
    let announce = announce_packet(&Identity::generate(), "echo", None);
    assert!(t.outbound(&announce));
    receive(&t, &a, &announce);
    assert_eq!(log.count(), 0);
}

#[tokio::test]
async fn outbound_fails_when_nothing_can_send() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    a.set_online(false);
    let packet = data_packet(DestinationHash::new([1; 16]), DestinationType::Single, b"x");
    assert!(!t.outbound(&packet));
}

#[tokio::test]
async fn multi_hop_paths_rewrite_link_requests_but_broadcast_data() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let relay = TruncatedHash::new([0x42; 16]);
    let mut announce = to_transport(&announce_packet(&Identity::generate(), "echo", None), relay);
    announce.hops = 2;
    receive(&t, &a, &announce);
    let dest = announce.destination;
    assert_eq!(t.hops_to(&dest), 3);

    let request = RawPacket::new(
        PacketType::LinkRequest,
        DestinationType::Single,
        dest,
        ContextType::None,
        vec![0x5a; 64],
    );
    assert!(t.outbound(&request));
    let sent = a.take_sent();
    assert_eq!(sent.len(), 1);
    let routed = RawPacket::parse(&sent[0]).unwrap();
    assert_eq!(routed.flags.header_type, HeaderType::Header2);
    assert_eq!(routed.transport_id, Some(relay));
    assert_eq!(b.sent_count(), 0);

    let data = data_packet(dest, DestinationType::Single, b"multi-hop");
    assert!(t.outbound(&data));
    assert_eq!(a.take_sent(), vec![wire(&data)]);
    assert_eq!(b.take_sent(), vec![wire(&data)]);
}

#[tokio::test]
async fn plain_destinations_always_broadcast() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);

    let packet = data_packet(announce.destination, DestinationType::Plain, b"plain");
    assert!(t.outbound(&packet));
    assert_eq!(a.sent_count(), 1);
    assert_eq!(b.sent_count(), 1);
}

#[tokio::test]
async fn path_via_offline_interface_falls_back_to_broadcast() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let announce = announce_packet(&Identity::generate(), "echo", None);
    receive(&t, &a, &announce);
    a.set_online(false);

    let packet = data_packet(announce.destination, DestinationType::Single, b"x");
    assert!(t.outbound(&packet));
    assert_eq!(b.sent_count(), 1);
}

#[tokio::test]
async fn local_destinations_receive_their_traffic() {
    let t = node(false);
    let (a, _) = attach(&t, "a");

    let plain_rx = Arc::new(Recorder::default());
    let plain = LocalDestination::plain("testapp", &["broadcast"], plain_rx.clone());
    let plain_hash = plain.hash;
    t.register_destination(plain);

    let owner = Arc::new(Identity::generate());
    let single_rx = Arc::new(Recorder::default());
    let single = LocalDestination::single(owner.clone(), "testapp", &["inbox"], single_rx.clone());
    let single_hash = single.hash;
    t.register_destination(single);

    receive(&t, &a, &data_packet(plain_hash, DestinationType::Plain, b"to everyone"));
    let sealed = owner.encrypt(b"secret");
    receive(&t, &a, &data_packet(single_hash, DestinationType::Single, &sealed));
    receive(&t, &a, &data_packet(single_hash, DestinationType::Single, b"not a ciphertext"));

    assert_eq!(*plain_rx.payloads.lock(), vec![b"to everyone".to_vec()]);
    assert_eq!(*single_rx.payloads.lock(), vec![b"secret".to_vec()]);

    let request = RawPacket::new(
        PacketType::LinkRequest,
        DestinationType::Single,
        single_hash,
        ContextType::None,
        vec![1; 64],
    );
    receive(&t, &a, &request);
    assert_eq!(single_rx.link_requests.lock().len(), 1);

    assert!(t.deregister_destination(&single_hash));
    receive(&t, &a, &data_packet(single_hash, DestinationType::Single, &owner.encrypt(b"late")));
    assert_eq!(single_rx.payloads.lock().len(), 1);
}

#[tokio::test]
async fn repeated_data_frames_are_delivered_once() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");

    let rx = Arc::new(Recorder::default());
    let local = LocalDestination::plain("testapp", &["once"], rx.clone());
    let dest = local.hash;
    t.register_destination(local);

    let frame = data_packet(dest, DestinationType::Plain, b"ping");
    let before = t.hashlist_len();
    receive(&t, &a, &frame);
    receive(&t, &a, &frame);
    // The same frame looping back over another interface is still a duplicate.
    receive(&t, &b, &frame);
    assert_eq!(*rx.payloads.lock(), vec![b"ping".to_vec()]);
    assert_eq!(t.hashlist_len(), before + 1);

    // Hop count is outside the hashed part, so a rebroadcast copy is caught too.
    receive(&t, &a, &RawPacket { hops: 3, ..frame.clone() });
    assert_eq!(rx.payloads.lock().len(), 1);

    receive(&t, &a, &data_packet(dest, DestinationType::Plain, b"pong"));
    assert_eq!(rx.payloads.lock().len(), 2);
}

#[tokio::test]
async fn announces_for_local_destinations_are_ignored() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let owner = Arc::new(Identity::generate());
    let local = LocalDestination::single(owner.clone(), "testapp", &["echo"], Arc::new(Recorder::default()));
    let hash = local.hash;
    t.register_destination(local);

    receive(&t, &a, &announce_packet(&owner, "echo", None));
    assert!(!t.has_path(&hash));
}

#[tokio::test]
async fn local_announce_reaches_peers() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let owner = Arc::new(Identity::generate());
    let local = LocalDestination::single(owner, "testapp", &["echo"], Arc::new(Recorder::default()));
    let hash = local.hash;
    t.register_destination(local);

    assert!(t.announce(&hash, Some(b"meta"), false).unwrap());
    assert_eq!(a.sent_count(), 1);
    let frame = b.take_sent().remove(0);

    let peer = node(false);
    let (p, p_id) = attach(&peer, "p");
    let log = AnnounceLog::new(false);
    peer.register_announce_handler(log.clone());
    peer.inbound(&frame, &p_id);
    assert!(peer.has_path(&hash));
    assert_eq!(*log.seen.lock(), vec![(hash, Some(b"meta".to_vec()))]);
    assert_eq!(p.sent_count(), 0);
}

#[tokio::test]
async fn announce_errors() {
    let t = node(false);
    let unknown = DestinationHash::new([9; 16]);
    assert!(matches!(
        t.announce(&unknown, None, false),
        Err(TransportError::UnknownDestination(d)) if d == unknown
    ));

    let plain = LocalDestination::plain("testapp", &["plain"], Arc::new(Recorder::default()));
    let hash = plain.hash;
    t.register_destination(plain);
    assert!(matches!(
        t.announce(&hash, None, false),
        Err(TransportError::DestinationWithoutIdentity(_))
    ));
}

#[tokio::test]
async fn path_request_for_local_destination_is_answered_on_arrival_interface() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let (b, _) = attach(&t, "b");
    let owner = Arc::new(Identity::generate());
    let local = LocalDestination::single(owner, "testapp", &["echo"], Arc::new(Recorder::default()));
    let hash = local.hash;
    t.register_destination(local);

    let tag = [7u8; 16];
    receive(&t, &a, &build_path_request(&hash, None, &tag));
    let sent = a.take_sent();
    assert_eq!(sent.len(), 1);
    let response = RawPacket::parse(&sent[0]).unwrap();
    assert!(response.is_announce());
    assert_eq!(response.context, ContextType::PathResponse);
    assert_eq!(response.destination, hash);
    assert_eq!(b.sent_count(), 0);

    // Same destination and tag through another relay is the same request.
    let relay = TruncatedHash::new([3; 16]);
    receive(&t, &b, &build_path_request(&hash, Some(&relay), &tag));
    assert_eq!(a.sent_count() + b.sent_count(), 0);
}

#[tokio::test]
async fn request_path_is_paced_per_destination() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let dest = DestinationHash::new([0x10; 16]);

    assert!(t.request_path(&dest));
    assert!(!t.request_path(&dest));
    assert!(t.request_path(&DestinationHash::new([0x11; 16])));

    let first = RawPacket::parse(&a.sent()[0]).unwrap();
    assert_eq!(first.flags.destination_type, DestinationType::Plain);
    assert_eq!(&first.data[..16], dest.as_ref());
}

#[tokio::test]
async fn ifac_interface_accepts_only_authenticated_frames() {
    let t = node(false);
    let creds = IfacCredentials::new(Some("meshnet"), Some("secret"), 8).unwrap();
    let iface = Arc::new(
        MemoryInterface::new("ifac0")
            .with_ifac(IfacCredentials::new(Some("meshnet"), Some("secret"), 8).unwrap()),
    );
    let id = t.register_interface(iface.clone()).unwrap();

    let good = announce_packet(&Identity::generate(), "echo", None);
    t.inbound(&ifac::mask(&creds, &wire(&good)).unwrap(), &id);
    assert!(t.has_path(&good.destination));

    let bare = announce_packet(&Identity::generate(), "echo", None);
    t.inbound(&wire(&bare), &id);
    assert!(!t.has_path(&bare.destination));

    let outsider = IfacCredentials::new(Some("othernet"), None, 8).unwrap();
    let foreign = announce_packet(&Identity::generate(), "echo", None);
    t.inbound(&ifac::mask(&outsider, &wire(&foreign)).unwrap(), &id);
    assert!(!t.has_path(&foreign.destination));

    let packet = data_packet(good.destination, DestinationType::Single, b"masked");
    assert!(t.outbound(&packet));
    let sent = iface.take_sent();
    assert!(ifac::has_ifac_flag(&sent[0]));
    assert_eq!(ifac::unmask(&creds, &sent[0]).unwrap(), wire(&packet));
}

#[tokio::test]
async fn open_interface_drops_flagged_frames() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    let mut raw = wire(&announce_packet(&Identity::generate(), "echo", None));
    raw[0] |= ifac::IFAC_FLAG;
    t.inbound(&raw, &a.id());
    assert!(t.path_table().is_empty());
}

#[tokio::test]
async fn runt_and_unknown_interface_frames_are_dropped() {
    let t = node(false);
    let (a, _) = attach(&t, "a");
    t.inbound(&[0u8; 10], &a.id());
    let announce = announce_packet(&Identity::generate(), "echo", None);
    t.inbound(&wire(&announce), &rns_transport::InterfaceId::from_name("nowhere"));
    assert!(t.path_table().is_empty());
    assert_eq!(t.hashlist_len(), 0);
}

#[tokio::test]
async fn interface_registration_rules() {
    let t = node(false);
    let (a, a_id) = attach(&t, "a");
    assert!(matches!(
        t.register_interface(a.clone()),
        Err(TransportError::DuplicateInterface(id)) if id == a_id
    ));
    assert!(t.deregister_interface(&a_id).is_some());
    assert!(t.deregister_interface(&a_id).is_none());
    assert!(t.interfaces().is_empty());
}

#[tokio::test]
async fn traffic_counters_follow_frames() {
    let t = node(false);
    let (a, a_id) = attach(&t, "a");
    let announce = wire(&announce_packet(&Identity::generate(), "echo", None));
    t.inbound(&announce, &a_id);
    let packet = data_packet(DestinationHash::new([2; 16]), DestinationType::Single, b"x");
    t.outbound(&packet);

    let stats = t.traffic().interface(&a_id).unwrap();
    assert_eq!(stats.packets_rx, 1);
    assert_eq!(stats.bytes_rx, announce.len() as u64);
    assert_eq!(stats.packets_tx, 1);
    assert_eq!(stats.bytes_tx, wire(&packet).len() as u64);
}
