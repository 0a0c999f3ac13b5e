//! Storage abstraction layer for persisting tickets.
//!
//! This module defines the `TicketStore` trait that owns the ticket collection
//! and its id sequence, allowing different backends (in-memory, JSON file,
//! SQLite) to be used interchangeably.

use crate::domain::{NewTicket, Ticket, TicketPatch};
use crate::errors::Result;
use std::sync::Arc;

pub mod json;
pub mod lock;
pub mod memory;
pub mod sqlite;

#[cfg(test)]
mod store_proptests;

// Re-export for convenience
pub use json::JsonFileStorage;
pub use lock::FileLocker;
pub use memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

/// A read-modify-write step applied to one ticket inside the store's
/// critical section. Returning an error aborts the write.
pub type TicketMutation<'a> = &'a mut dyn FnMut(&mut Ticket) -> Result<()>;

/// Trait for storage backends that own the ticket collection.
///
/// Every mutating method is atomic with respect to other mutations on the
/// same store, and durable before it returns (for persistent backends).
/// Ids are assigned by the store, strictly increasing, and never reused.
///
/// The trait is object safe so the backend can be picked at startup and
/// shared as `Arc<dyn TicketStore>`.
///
/// # Examples
///
/// ```
/// use devtrack::storage::{InMemoryStorage, TicketStore};
///
/// let storage = InMemoryStorage::new();
/// storage.init().unwrap();
///
/// let ticket = storage.create_ticket("Fix bug", "To Do").unwrap();
/// assert_eq!(ticket.id, 1);
///
/// let loaded = storage.load_ticket(ticket.id).unwrap();
/// assert_eq!(loaded.title, "Fix bug");
/// ```
pub trait TicketStore: Send + Sync {
    /// Initialize the storage backend (idempotent).
    ///
    /// Creates necessary directories, files, or database tables.
    fn init(&self) -> Result<()>;

    /// Short label for the backend, used in logs and health output.
    fn backend_name(&self) -> &'static str;

    /// List all tickets in creation order.
    fn list_tickets(&self) -> Result<Vec<Ticket>>;

    /// Load a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::NotFound` if no ticket has this id.
    fn load_ticket(&self, id: u64) -> Result<Ticket>;

    /// Persist a validated ticket under the next id.
    fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket>;

    /// Apply `mutate` to the stored ticket and persist the result atomically.
    ///
    /// The mutation sees the current stored state. If it fails, nothing is
    /// written and its error is returned.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::NotFound` if no ticket has this id.
    fn update_with(&self, id: u64, mutate: TicketMutation<'_>) -> Result<Ticket>;

    /// Remove a ticket. Its id is never handed out again.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::NotFound` if no ticket has this id, including
    /// when it was already deleted.
    fn delete_ticket(&self, id: u64) -> Result<()>;

    /// Validate and create a ticket.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::Validation` if `title` or `status` is blank
    /// after trimming; the collection is left unchanged.
    fn create_ticket(&self, title: &str, status: &str) -> Result<Ticket> {
        let ticket = NewTicket::new(title, status)?;
        self.insert_ticket(ticket)
    }

    /// Replace the non-blank fields of `patch` on an existing ticket.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::NotFound` if no ticket has this id.
    fn update_ticket(&self, id: u64, patch: &TicketPatch) -> Result<Ticket> {
        self.update_with(id, &mut |ticket| {
            patch.apply(ticket);
            Ok(())
        })
    }
}

macro_rules! forward_ticket_store {
    ($wrapper:ident) => {
        impl<S: TicketStore + ?Sized> TicketStore for $wrapper<S> {
            fn init(&self) -> Result<()> {
                (**self).init()
            }

            fn backend_name(&self) -> &'static str {
                (**self).backend_name()
            }

            fn list_tickets(&self) -> Result<Vec<Ticket>> {
                (**self).list_tickets()
            }

            fn load_ticket(&self, id: u64) -> Result<Ticket> {
                (**self).load_ticket(id)
            }

            fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
                (**self).insert_ticket(ticket)
            }

            fn update_with(&self, id: u64, mutate: TicketMutation<'_>) -> Result<Ticket> {
                (**self).update_with(id, mutate)
            }

            fn delete_ticket(&self, id: u64) -> Result<()> {
                (**self).delete_ticket(id)
            }

            fn create_ticket(&self, title: &str, status: &str) -> Result<Ticket> {
                (**self).create_ticket(title, status)
            }

            fn update_ticket(&self, id: u64, patch: &TicketPatch) -> Result<Ticket> {
                (**self).update_ticket(id, patch)
            }
        }
    };
}

forward_ticket_store!(Arc);
forward_ticket_store!(Box);

/// Next id for a collection: one past the highest id seen, starting at 1.
pub(crate) fn next_id_after<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> u64 {
    tickets.into_iter().map(|t| t.id).max().unwrap_or(0) + 1
}
