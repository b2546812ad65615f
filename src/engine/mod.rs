// Loader engine: status store, coordination, notifications and counters.

pub mod bus;
pub mod coordinator;
pub mod preload;
pub mod stats;
pub mod status;
