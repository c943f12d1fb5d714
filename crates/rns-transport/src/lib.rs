//! Routing engine for Reticulum-compatible mesh networks.
//!
//! The [`Transport`] engine owns every routing table: paths learned from
//! announces, link and reverse entries that route proofs back along the way a
//! request came, per-interface announce queues, tunnels and outstanding
//! receipts. Interface drivers hand it raw frames through
//! [`Transport::inbound`]; upper layers send through [`Transport::outbound`].
//! A background task started by [`Transport::start`] keeps the tables culled
//! and paces announce retransmissions.

pub mod announce;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod ifac;
pub mod interface;
pub mod logging;
pub mod path;
pub mod persist;
pub mod receipt;
pub mod router;
pub mod shutdown;
pub mod stats;
pub mod testing;
pub mod time;
pub mod tunnel;

pub use config::TransportConfig;
pub use engine::Transport;
pub use error::{ConfigError, IfacError, InterfaceError, PersistError, TransportError};
pub use handlers::{AnnounceHandler, LinkSink, LocalDestination, PacketCallback, ProofCallback};
pub use ifac::IfacCredentials;
pub use interface::{Interface, InterfaceId, InterfaceRef};
pub use path::{PathEntry, PathState, PathTable};
