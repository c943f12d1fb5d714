//! The transport engine.
//!
//! Every routing decision runs under one reentrant lock and produces a list
//! of [`RouterAction`]s. The actions (interface sends and upper-layer
//! callbacks) run once the lock is released, so a slow driver or a callback
//! that re-enters the transport never stalls routing.

mod announce;
mod control;
mod inbound;
pub mod maintenance;
mod outbound;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use tracing::{debug, info, warn};

use rns_core::{DestinationHash, Identity, LinkId, PacketHash, RawPacket, TruncatedHash};

use crate::announce::{AnnounceQueue, AnnounceRateLimiter, AnnounceTable};
use crate::config::{TransportConfig, TransportSection};
use crate::dedup::PacketHashlist;
use crate::error::{PersistError, TransportError};
use crate::handlers::{AnnounceHandler, HandlerId, LinkSink, LocalDestination, ProofCallback};
use crate::ifac;
use crate::interface::{InterfaceId, InterfaceRef};
use crate::path::request::PathRequestTracker;
use crate::path::{PathEntry, PathState, PathTable};
use crate::persist::Storage;
use crate::receipt::{PacketReceipt, ReceiptTable};
use crate::router::{LinkTable, ReverseTable, RouterAction};
use crate::shutdown::ShutdownToken;
use crate::stats::TrafficCounters;
use crate::time::now_ms;
use crate::tunnel::TunnelManager;

pub struct Transport {
    config: TransportSection,
    identity: RwLock<Option<Arc<Identity>>>,
    transport_enabled: AtomicBool,
    decision: ReentrantMutex<()>,
    shutdown: ShutdownToken,

    interfaces: DashMap<InterfaceId, InterfaceRef>,
    path_table: PathTable,
    link_table: LinkTable,
    reverse_table: ReverseTable,
    announces: AnnounceTable,
    announce_rate: AnnounceRateLimiter,
    announce_queues: DashMap<InterfaceId, AnnounceQueue>,
    tunnels: TunnelManager,
    receipts: ReceiptTable,
    hashlist: Mutex<PacketHashlist>,
    path_requests: Mutex<PathRequestTracker>,
    traffic: TrafficCounters,

    destinations: DashMap<DestinationHash, LocalDestination>,
    links: DashMap<LinkId, Arc<dyn LinkSink>>,
    announce_handlers: RwLock<Vec<(HandlerId, Arc<dyn AnnounceHandler>)>>,
    next_handler_id: AtomicU64,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Arc<Self> {
        let section = config.transport;
        Arc::new(Self {
            transport_enabled: AtomicBool::new(section.enable_transport),
            identity: RwLock::new(None),
            decision: ReentrantMutex::new(()),
            shutdown: ShutdownToken::new(),
            interfaces: DashMap::new(),
            path_table: PathTable::new(),
            link_table: LinkTable::new(),
            reverse_table: ReverseTable::new(),
            announces: AnnounceTable::new(),
            announce_rate: AnnounceRateLimiter::new(
                section.announce_rate_window_ms(),
                section.announce_rate_max,
            ),
            announce_queues: DashMap::new(),
            tunnels: TunnelManager::new(section.max_tunnels),
            receipts: ReceiptTable::new(),
            hashlist: Mutex::new(PacketHashlist::with_max_size(section.hashlist_max_size)),
            path_requests: Mutex::new(PathRequestTracker::new()),
            traffic: TrafficCounters::new(),
            destinations: DashMap::new(),
            links: DashMap::new(),
            announce_handlers: RwLock::new(Vec::new()),
            next_handler_id: AtomicU64::new(1),
            config: section,
        })
    }

    // -- Lifecycle --

    /// Adopt `identity` (or generate one) and start the maintenance task on
    /// the current tokio runtime.
    pub fn start(self: &Arc<Self>, identity: Option<Identity>, transport_enabled: bool) -> Result<(), TransportError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        if !self.shutdown.begin() {
            return Err(TransportError::AlreadyRunning);
        }

        {
            let mut current = self.identity.write();
            match identity {
                Some(identity) => *current = Some(Arc::new(identity)),
                None if current.is_none() => *current = Some(Arc::new(Identity::generate())),
                None => {}
            }
        }
        self.transport_enabled.store(transport_enabled, Ordering::SeqCst);

        let task = maintenance::run(
            Arc::downgrade(self),
            self.shutdown.subscribe(),
            self.config.clone(),
        );
        self.shutdown.add_task(runtime.spawn(task));

        info!(
            transport_id = ?self.transport_id(),
            transport_enabled,
            "transport started"
        );
        Ok(())
    }

    /// Stop the maintenance task and drop all scheduled announces.
    pub async fn stop(&self) {
        self.shutdown.signal_stop();
        self.shutdown.join_all().await;
        for mut queue in self.announce_queues.iter_mut() {
            queue.clear();
        }
        info!("transport stopped");
    }

    /// Stop, optionally persist to `persist_dir`, then clear every table.
    pub async fn shutdown(&self, persist_dir: Option<&Path>) -> Result<(), TransportError> {
        self.stop().await;
        let persisted = match persist_dir {
            Some(dir) => self.persist_data(dir).await,
            None => Ok(()),
        };
        self.clear_tables();
        persisted.map_err(TransportError::from)
    }

    fn clear_tables(&self) {
        let _guard = self.decision.lock();
        self.path_table.clear();
        self.link_table.clear();
        self.reverse_table.clear();
        self.announces.clear();
        self.announce_rate.clear();
        self.announce_queues.clear();
        self.tunnels.clear();
        self.receipts.clear();
        self.hashlist.lock().clear();
        self.path_requests.lock().clear();
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Write the path table, packet hashlist and identity to `dir`.
    pub async fn persist_data(&self, dir: &Path) -> Result<(), PersistError> {
        let storage = Storage::open(dir).await?;
        let paths = self.path_table.snapshot();
        let hashes: Vec<PacketHash> = self.hashlist.lock().iter().copied().collect();
        storage.save_path_table(&paths).await?;
        storage.save_hashlist(&hashes).await?;
        if let Some(identity) = self.identity()
            && identity.has_private_key()
        {
            storage.save_identity(&identity).await?;
        }
        debug!(paths = paths.len(), hashes = hashes.len(), "persisted transport state");
        Ok(())
    }

    /// Restore paths and remembered packet hashes from `dir`. Paths already
    /// known with equal or fewer hops are kept. Returns the number of paths
    /// restored.
    pub async fn load_persisted_data(&self, dir: &Path) -> Result<usize, PersistError> {
        let storage = Storage::open(dir).await?;
        let now = now_ms();
        let paths = storage.load_path_table(now).await?;
        let hashes = storage.load_hashlist().await?;

        let _guard = self.decision.lock();
        let mut restored = 0;
        for (dest, entry) in paths {
            let keep_existing = self
                .path_table
                .live(&dest, now)
                .is_some_and(|current| current.hops <= entry.hops);
            if !keep_existing {
                self.path_table.insert(dest, entry);
                restored += 1;
            }
        }
        let mut hashlist = self.hashlist.lock();
        for hash in hashes {
            hashlist.remember(hash);
        }
        info!(restored, "loaded persisted transport state");
        Ok(restored)
    }

    // -- Identity --

    pub fn identity(&self) -> Option<Arc<Identity>> {
        self.identity.read().clone()
    }

    /// Our identity hash, used as the transport id on relayed packets.
    pub fn transport_id(&self) -> Option<TruncatedHash> {
        self.identity.read().as_ref().map(|i| TruncatedHash::from(i.hash()))
    }

    pub fn is_transport_enabled(&self) -> bool {
        self.transport_enabled.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &TransportSection {
        &self.config
    }

    // -- Interfaces --

    pub fn register_interface(&self, interface: InterfaceRef) -> Result<InterfaceId, TransportError> {
        let id = interface.id();
        match self.interfaces.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(TransportError::DuplicateInterface(id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(name = interface.name(), %id, "interface registered");
                slot.insert(interface);
            }
        }
        self.announce_queues
            .insert(id, AnnounceQueue::new(self.config.max_queued_announces));
        Ok(id)
    }

    /// Remove an interface. Its tunnels lose their interface but are kept
    /// until they expire; paths learned on it are left to expire as well.
    pub fn deregister_interface(&self, id: &InterfaceId) -> Option<InterfaceRef> {
        let (_, interface) = self.interfaces.remove(id)?;
        self.announce_queues.remove(id);
        if let Some(tunnel) = self.tunnels.void_interface(id) {
            debug!(%tunnel, "tunnel detached from interface");
        }
        self.traffic.forget(id);
        info!(name = interface.name(), %id, "interface deregistered");
        Some(interface)
    }

    pub fn interface(&self, id: &InterfaceId) -> Option<InterfaceRef> {
        self.interfaces.get(id).map(|i| Arc::clone(i.value()))
    }

    fn interface_usable(&self, id: &InterfaceId) -> bool {
        self.interfaces.get(id).is_some_and(|i| i.is_online())
    }

    pub fn interfaces(&self) -> Vec<InterfaceRef> {
        self.interfaces.iter().map(|i| Arc::clone(i.value())).collect()
    }

    pub fn announce_queue_len(&self, id: &InterfaceId) -> usize {
        self.announce_queues.get(id).map_or(0, |q| q.len())
    }

    // -- Local endpoints --

    pub fn register_destination(&self, destination: LocalDestination) {
        debug!(hash = %destination.hash, "local destination registered");
        self.destinations.insert(destination.hash, destination);
    }

    pub fn deregister_destination(&self, hash: &DestinationHash) -> bool {
        self.destinations.remove(hash).is_some()
    }

    pub fn register_link(&self, link_id: LinkId, sink: Arc<dyn LinkSink>) {
        self.links.insert(link_id, sink);
    }

    pub fn deregister_link(&self, link_id: &LinkId) -> bool {
        self.links.remove(link_id).is_some()
    }

    /// Handlers see announces in registration order.
    pub fn register_announce_handler(&self, handler: Arc<dyn AnnounceHandler>) -> HandlerId {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        self.announce_handlers.write().push((id, handler));
        id
    }

    pub fn deregister_announce_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.announce_handlers.write();
        let before = handlers.len();
        handlers.retain(|(h, _)| *h != id);
        handlers.len() != before
    }

    /// Expect a proof for `packet` within `timeout` ms. Returns the key the
    /// proof will be addressed to.
    pub fn register_receipt(
        &self,
        packet: &RawPacket,
        timeout: u64,
        callback: Arc<dyn ProofCallback>,
    ) -> TruncatedHash {
        let now = now_ms();
        let hash = packet.packet_hash().truncated();
        self.receipts.register(PacketReceipt {
            hash,
            destination: packet.destination,
            sent_at: now,
            deadline: now.saturating_add(timeout),
            callback,
        });
        hash
    }

    // -- Tables --

    pub fn path_table(&self) -> &PathTable {
        &self.path_table
    }

    pub fn link_table(&self) -> &LinkTable {
        &self.link_table
    }

    pub fn reverse_table(&self) -> &ReverseTable {
        &self.reverse_table
    }

    pub fn announce_table(&self) -> &AnnounceTable {
        &self.announces
    }

    pub fn tunnels(&self) -> &TunnelManager {
        &self.tunnels
    }

    pub fn receipts(&self) -> &ReceiptTable {
        &self.receipts
    }

    pub fn traffic(&self) -> &TrafficCounters {
        &self.traffic
    }

    pub fn hashlist_len(&self) -> usize {
        self.hashlist.lock().len()
    }

    pub fn has_path(&self, dest: &DestinationHash) -> bool {
        self.path_table.has_path(dest, now_ms())
    }

    pub fn hops_to(&self, dest: &DestinationHash) -> u8 {
        self.path_table.hops_to(dest, now_ms())
    }

    pub fn next_hop(&self, dest: &DestinationHash) -> Option<TruncatedHash> {
        self.path_table.next_hop(dest, now_ms())
    }

    pub fn next_hop_interface(&self, dest: &DestinationHash) -> Option<InterfaceId> {
        self.path_table.next_hop_interface(dest, now_ms())
    }

    pub fn path_entry(&self, dest: &DestinationHash) -> Option<PathEntry> {
        self.path_table.get(dest)
    }

    pub fn mark_path_unresponsive(&self, dest: &DestinationHash) -> Option<PathState> {
        let _guard = self.decision.lock();
        let state = self.path_table.mark_unresponsive(dest);
        if state == Some(PathState::Stale) {
            self.announces.remove(dest);
            debug!(%dest, "path went stale and was removed");
        }
        state
    }

    pub fn mark_path_responsive(&self, dest: &DestinationHash) -> bool {
        let _guard = self.decision.lock();
        self.path_table.mark_responsive(dest)
    }

    // -- Transmission --

    /// Send on one interface, masking for IFAC. True if the driver accepted it.
    pub(crate) fn transmit(&self, id: &InterfaceId, raw: &[u8]) -> bool {
        match self.interface(id) {
            Some(interface) => self.transmit_on(&interface, raw),
            None => {
                tracing::trace!(%id, "transmit to unknown interface");
                false
            }
        }
    }

    fn transmit_on(&self, interface: &InterfaceRef, raw: &[u8]) -> bool {
        if !interface.is_online() || !interface.can_send() {
            return false;
        }
        let masked;
        let frame = match interface.ifac() {
            Some(creds) => match ifac::mask(creds, raw) {
                Ok(m) => {
                    masked = m;
                    masked.as_slice()
                }
                Err(e) => {
                    warn!(name = interface.name(), "ifac masking failed: {e}");
                    return false;
                }
            },
            None => raw,
        };
        match interface.send(frame) {
            Ok(()) => {
                let id = interface.id();
                self.traffic.record_tx(&id, frame.len());
                self.tunnels.record_tx(&id, frame.len(), now_ms());
                true
            }
            Err(e) => {
                debug!(name = interface.name(), "send failed: {e}");
                false
            }
        }
    }

    /// Send on every usable interface except `exclude`. Returns how many
    /// accepted the frame.
    pub(crate) fn broadcast(&self, raw: &[u8], exclude: Option<&InterfaceId>) -> usize {
        self.interfaces()
            .iter()
            .filter(|i| exclude != Some(&i.id()))
            .filter(|i| self.transmit_on(i, raw))
            .count()
    }

    pub(crate) fn run_actions(&self, actions: Vec<RouterAction>) {
        for action in actions {
            match action {
                RouterAction::Transmit { interface, raw } => {
                    self.transmit(&interface, &raw);
                }
                RouterAction::Broadcast { exclude, raw } => {
                    self.broadcast(&raw, exclude.as_ref());
                }
                RouterAction::Deliver {
                    callback,
                    payload,
                    packet,
                } => callback.on_packet(&payload, &packet),
                RouterAction::LinkRequest { callback, packet } => callback.on_link_request(&packet),
                RouterAction::ToLink { sink, packet } => sink.receive(&packet),
                RouterAction::NotifyAnnounce {
                    destination,
                    identity,
                    app_data,
                } => {
                    let handlers: Vec<_> = self
                        .announce_handlers
                        .read()
                        .iter()
                        .map(|(_, h)| Arc::clone(h))
                        .collect();
                    for handler in handlers {
                        if handler.handle(destination, &identity, app_data.as_deref()) {
                            break;
                        }
                    }
                }
                RouterAction::Proof {
                    hash,
                    destination,
                    callback,
                    packet,
                } => {
                    if callback.on_proof(&packet) {
                        self.receipts.take(&hash);
                        self.mark_path_responsive(&destination);
                    } else {
                        debug!(%hash, "proof rejected by receipt callback");
                    }
                }
            }
        }
    }
}

/// Link ids travel in the destination field.
fn link_key(dest: &DestinationHash) -> LinkId {
    LinkId::from(TruncatedHash::from(*dest))
}
