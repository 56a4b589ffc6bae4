// Vampire Hunter - find and kill processes listening on TCP ports

pub mod catalog;
pub mod config;
pub mod inspect;
pub mod killer;
pub mod session;

// Re-export commonly used types
pub use catalog::{build_catalog, format_memory, Catalog, CatalogEntry};
pub use config::Config;
pub use inspect::{ListenerBinding, ProcessInspector, ProcessSample};
