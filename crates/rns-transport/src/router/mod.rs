//! Link and reverse tables, and the header rewrites used when relaying.

pub mod header;
pub mod tables;
pub mod types;

pub use header::{relay_rewrite, to_broadcast, to_transport};
pub use tables::{LinkTable, ReverseTable};
pub use types::{LinkEntry, ReverseEntry, RouterAction};
