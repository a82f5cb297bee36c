pub mod discovery;
pub mod table;

pub use discovery::{Discovery, JoinOutcome};
pub use table::{RoutingEntry, RoutingTable};
