//! Fixtures shared by the engine integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use rns_core::announce::make_random_hash;
use rns_core::destination::name_hash;
use rns_core::{
    Announce, ContextType, DestinationHash, DestinationType, Identity, PacketType, RawPacket,
};
use rns_transport::testing::MemoryInterface;
use rns_transport::time::now_secs;
use rns_transport::{
    AnnounceHandler, Interface, InterfaceId, PacketCallback, ProofCallback, Transport,
    TransportConfig,
};

/// A started engine. Must be called inside a tokio runtime.
pub fn node(transport_enabled: bool) -> Arc<Transport> {
    rns_transport::logging::init_for_tests();
    let transport = Transport::new(TransportConfig::default());
    transport
        .start(None, transport_enabled)
        .expect("start transport");
    transport
}

pub fn attach(transport: &Transport, name: &str) -> (Arc<MemoryInterface>, InterfaceId) {
    let iface = Arc::new(MemoryInterface::new(name));
    let id = transport
        .register_interface(iface.clone())
        .expect("register interface");
    (iface, id)
}

/// A fresh signed announce for `identity` under `testapp.<aspect>`.
pub fn announce_packet(identity: &Identity, aspect: &str, app_data: Option<&[u8]>) -> RawPacket {
    Announce::create(
        identity,
        name_hash("testapp", &[aspect]),
        make_random_hash(now_secs()),
        None,
        app_data,
    )
    .expect("sign announce")
    .to_packet(ContextType::None)
}

pub fn data_packet(dest: DestinationHash, destination_type: DestinationType, payload: &[u8]) -> RawPacket {
    RawPacket::new(
        PacketType::Data,
        destination_type,
        dest,
        ContextType::None,
        payload.to_vec(),
    )
}

pub fn wire(packet: &RawPacket) -> Vec<u8> {
    packet.serialize().expect("serialize")
}

/// Deliver `packet` to `transport` as if it arrived on `iface`.
pub fn receive(transport: &Transport, iface: &MemoryInterface, packet: &RawPacket) {
    transport.inbound(&wire(packet), &iface.id());
}

#[derive(Default)]
pub struct Recorder {
    pub payloads: Mutex<Vec<Vec<u8>>>,
    pub link_requests: Mutex<Vec<RawPacket>>,
}

impl PacketCallback for Recorder {
    fn on_packet(&self, payload: &[u8], _packet: &RawPacket) {
        self.payloads.lock().push(payload.to_vec());
    }

    fn on_link_request(&self, packet: &RawPacket) {
        self.link_requests.lock().push(packet.clone());
    }
}

/// Records announces and optionally claims them.
pub struct AnnounceLog {
    pub seen: Mutex<Vec<(DestinationHash, Option<Vec<u8>>)>>,
    claim: bool,
}

impl AnnounceLog {
    pub fn new(claim: bool) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            claim,
        })
    }

    pub fn count(&self) -> usize {
        self.seen.lock().len()
    }
}

impl AnnounceHandler for AnnounceLog {
    fn handle(&self, destination: DestinationHash, _identity: &Identity, app_data: Option<&[u8]>) -> bool {
        self.seen
            .lock()
            .push((destination, app_data.map(<[u8]>::to_vec)));
        self.claim
    }
}

pub struct ProofRecorder {
    accept: bool,
    pub proofs: AtomicUsize,
    pub timeouts: AtomicUsize,
}

impl ProofRecorder {
    pub fn new(accept: bool) -> Arc<Self> {
        Arc::new(Self {
            accept,
            proofs: AtomicUsize::new(0),
            timeouts: AtomicUsize::new(0),
        })
    }

    pub fn proofs(&self) -> usize {
        self.proofs.load(Ordering::SeqCst)
    }

    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::SeqCst)
    }
}

impl ProofCallback for ProofRecorder {
    fn on_proof(&self, _proof: &RawPacket) -> bool {
        self.proofs.fetch_add(1, Ordering::SeqCst);
        self.accept
    }

    fn on_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::SeqCst);
    }
}
