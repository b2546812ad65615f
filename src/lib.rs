//! On-demand loader for external script and stylesheet resources.
//!
//! A [`ResourceLoader`](engine::coordinator::ResourceLoader) fetches each
//! registered resource at most once per successful load, coalesces concurrent
//! requests for the same id, loads a declared prerequisite first, and checks
//! that the expected runtime symbol exists afterwards. Observers subscribe to
//! immutable status snapshots instead of polling.

pub mod api;
pub mod config;
pub mod detect;
pub mod engine;
pub mod error;
pub mod host;
pub mod registry;
pub mod transport;

pub use engine::coordinator::{LoadTicket, ResourceLoader};
pub use engine::status::{LoadPhase, StatusSnapshot};
pub use error::{LoadError, RegistryError};
