// Fetch primitives: inject executable and stylesheet resources into a document.

pub mod http_transport;
pub mod traits;
