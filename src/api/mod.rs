// Consumer surface: tracing bootstrap and the process-wide loader.

pub mod loader_api;
pub mod simple;
