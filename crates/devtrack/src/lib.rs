//! DevTrack ticket tracker library
//!
//! Tickets move through a fixed delivery workflow
//! (`To Do → In Progress → Testing → Deployed`) and are kept by one of three
//! interchangeable stores: in-memory, a JSON file, or SQLite. The HTTP server
//! and the `devtrack` CLI are both thin layers over [`TicketService`].

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::{DevtrackConfig, StorageConfig};
pub use domain::{NewTicket, Status, Ticket, TicketPatch};
pub use errors::TicketError;
pub use service::{StatusSummary, TicketService};
pub use storage::{InMemoryStorage, JsonFileStorage, SqliteStorage, TicketStore};
