//! Path table: the best known route to each destination.

pub mod decision;
pub mod request;
pub mod table;
pub mod types;

pub use decision::{PathUpdate, decide_path_update};
pub use table::PathTable;
pub use types::{PathEntry, PathState};
