//! In-memory storage implementation.
//!
//! Tickets live only as long as the process. Each instance is isolated;
//! clones share the same collection, which makes it the default backend for
//! tests and throwaway servers.

use crate::domain::{NewTicket, Ticket};
use crate::errors::{Result, TicketError};
use crate::storage::{TicketMutation, TicketStore};
use anyhow::anyhow;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug)]
struct MemoryState {
    tickets: Vec<Ticket>,
    next_id: u64,
}

/// In-memory storage backend.
///
/// Uses `Arc<Mutex<>>` so clones share the same data and every operation
/// runs under one collection-wide lock.
///
/// # Examples
///
/// ```
/// use devtrack::storage::{InMemoryStorage, TicketStore};
///
/// let storage = InMemoryStorage::new();
/// storage.create_ticket("Set up CI pipeline", "In Progress").unwrap();
///
/// let shared = storage.clone();
/// assert_eq!(shared.list_tickets().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStorage {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::with_tickets(Vec::new())
    }

    /// Create a store seeded with existing tickets.
    ///
    /// The id sequence continues after the highest seeded id.
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        let next_id = super::next_id_after(&tickets);
        Self {
            state: Arc::new(Mutex::new(MemoryState { tickets, next_id })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| TicketError::Storage(anyhow!("In-memory ticket store lock poisoned")))
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketStore for InMemoryStorage {
    fn init(&self) -> Result<()> {
        // No initialization needed for in-memory storage
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn list_tickets(&self) -> Result<Vec<Ticket>> {
        Ok(self.lock()?.tickets.clone())
    }

    fn load_ticket(&self, id: u64) -> Result<Ticket> {
        self.lock()?
            .tickets
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(TicketError::NotFound(id))
    }

    fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket> {
        let mut state = self.lock()?;
        let ticket = ticket.into_ticket(state.next_id);
        state.next_id += 1;
        state.tickets.push(ticket.clone());
        Ok(ticket)
    }

    fn update_with(&self, id: u64, mutate: TicketMutation<'_>) -> Result<Ticket> {
        let mut state = self.lock()?;
        let slot = state
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TicketError::NotFound(id))?;

        let mut updated = slot.clone();
        mutate(&mut updated)?;
        *slot = updated.clone();
        Ok(updated)
    }

    fn delete_ticket(&self, id: u64) -> Result<()> {
        let mut state = self.lock()?;
        let position = state
            .tickets
            .iter()
            .position(|t| t.id == id)
            .ok_or(TicketError::NotFound(id))?;
        state.tickets.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TicketPatch;

    fn seeded(ids: &[u64]) -> InMemoryStorage {
        let tickets = ids
            .iter()
            .map(|&id| Ticket {
                id,
                title: format!("Ticket {}", id),
                status: "To Do".to_string(),
            })
            .collect();
        InMemoryStorage::with_tickets(tickets)
    }

    #[test]
    fn test_init_is_noop() {
        let storage = InMemoryStorage::new();
        storage.init().unwrap();
        storage.init().unwrap(); // Should be idempotent
    }

    #[test]
    fn test_first_id_is_one() {
        let storage = InMemoryStorage::new();
        let ticket = storage.create_ticket("Fix bug", "To Do").unwrap();
        assert_eq!(ticket.id, 1);
    }

    #[test]
    fn test_seeded_store_continues_after_max_id() {
        let storage = seeded(&[3, 9, 5]);
        let ticket = storage.create_ticket("Next", "To Do").unwrap();
        assert_eq!(ticket.id, 10);
    }

    #[test]
    fn test_delete_highest_id_does_not_rewind_sequence() {
        let storage = InMemoryStorage::new();
        storage.create_ticket("A", "To Do").unwrap();
        let b = storage.create_ticket("B", "To Do").unwrap();
        storage.delete_ticket(b.id).unwrap();

        let c = storage.create_ticket("C", "To Do").unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_delete_keeps_order_of_remaining() {
        let storage = seeded(&[1, 2, 3]);
        storage.delete_ticket(2).unwrap();

        let ids: Vec<_> = storage.list_tickets().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_clone_shares_storage() {
        let storage1 = InMemoryStorage::new();
        let storage2 = storage1.clone();

        storage1.create_ticket("Ticket 1", "To Do").unwrap();
        storage2
            .update_ticket(1, &TicketPatch::new(None, Some("Testing".to_string())))
            .unwrap();

        assert_eq!(storage1.load_ticket(1).unwrap().status, "Testing");
        assert_eq!(storage2.list_tickets().unwrap().len(), 1);
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let storage = InMemoryStorage::new();
        storage.create_ticket("Fix bug", "To Do").unwrap();

        let mut snapshot = storage.list_tickets().unwrap();
        snapshot[0].title = "Changed locally".to_string();

        assert_eq!(storage.load_ticket(1).unwrap().title, "Fix bug");
    }
}
