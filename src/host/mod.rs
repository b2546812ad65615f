// Host environment abstraction: the document resources are injected into and
// the global namespace they populate.

pub mod memory;
pub mod traits;
