//! Ticket business logic.
//!
//! `TicketService` enforces the delivery workflow on top of any
//! [`TicketStore`]. It keeps no state of its own: every call reads the
//! current tickets from the store.

use crate::domain::{Status, Ticket, TicketPatch};
use crate::errors::{Result, TicketError};
use crate::storage::TicketStore;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Ticket counts per workflow step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub to_do: usize,
    pub in_progress: usize,
    pub testing: usize,
    pub deployed: usize,
    /// Tickets whose status is not a workflow step
    pub other: usize,
    pub total: usize,
}

impl StatusSummary {
    fn count(&mut self, ticket: &Ticket) {
        let slot = match ticket.workflow_status() {
            Some(Status::ToDo) => &mut self.to_do,
            Some(Status::InProgress) => &mut self.in_progress,
            Some(Status::Testing) => &mut self.testing,
            Some(Status::Deployed) => &mut self.deployed,
            None => &mut self.other,
        };
        *slot += 1;
        self.total += 1;
    }
}

/// Executes ticket operations with workflow validation.
///
/// Generic over storage backend; the service never learns which one is active.
pub struct TicketService<S: TicketStore> {
    storage: S,
}

impl<S: TicketStore> TicketService<S> {
    /// Create a new service over the given storage
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Get reference to the storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn init(&self) -> Result<()> {
        self.storage.init()
    }

    /// Create a ticket with an explicit status.
    ///
    /// The status only has to be non-blank; it is not checked against the
    /// workflow, so tickets can be imported in any state.
    ///
    /// # Errors
    ///
    /// `TicketError::Validation` if title or status is blank.
    pub fn create_ticket(&self, title: &str, status: &str) -> Result<Ticket> {
        let ticket = self.storage.create_ticket(title, status)?;
        info!(id = ticket.id, status = %ticket.status, "Created ticket");
        Ok(ticket)
    }

    pub fn list_tickets(&self) -> Result<Vec<Ticket>> {
        self.storage.list_tickets()
    }

    pub fn show_ticket(&self, id: u64) -> Result<Ticket> {
        self.storage.load_ticket(id)
    }

    /// Replace title and/or status directly.
    ///
    /// This is a free-form edit: the new status is not checked against the
    /// workflow. Absent or blank fields keep their stored value.
    pub fn update_ticket(
        &self,
        id: u64,
        title: Option<String>,
        status: Option<String>,
    ) -> Result<Ticket> {
        let patch = TicketPatch::new(title, status);
        let ticket = self.storage.update_ticket(id, &patch)?;
        info!(id, status = %ticket.status, "Updated ticket");
        Ok(ticket)
    }

    /// Move a ticket one step along the workflow.
    ///
    /// The check and the write happen in one store critical section, so two
    /// concurrent advances move the ticket two steps, never one.
    ///
    /// # Errors
    ///
    /// - `TicketError::NotFound` if the ticket does not exist
    /// - `TicketError::InvalidState` if its status is not a workflow step
    /// - `TicketError::AlreadyFinal` if it is already `Deployed`
    pub fn advance_ticket(&self, id: u64) -> Result<Ticket> {
        let mut transition = None;

        let ticket = self.storage.update_with(id, &mut |ticket| {
            let current = ticket
                .workflow_status()
                .ok_or_else(|| TicketError::InvalidState {
                    id: ticket.id,
                    status: ticket.status.clone(),
                })?;
            let next = current.next().ok_or(TicketError::AlreadyFinal(ticket.id))?;

            TicketPatch::status(next).apply(ticket);
            transition = Some((current, next));
            Ok(())
        })?;

        if let Some((from, to)) = transition {
            info!(id, %from, %to, "Advanced ticket");
        }
        Ok(ticket)
    }

    pub fn delete_ticket(&self, id: u64) -> Result<()> {
        self.storage.delete_ticket(id)?;
        info!(id, "Deleted ticket");
        Ok(())
    }

    /// Count tickets per workflow step
    pub fn status_summary(&self) -> Result<StatusSummary> {
        let mut summary = StatusSummary::default();
        for ticket in self.storage.list_tickets()? {
            summary.count(&ticket);
        }
        Ok(summary)
    }
}
