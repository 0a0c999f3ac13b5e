//! Core domain types for the ticket tracker.
//!
//! This module defines the ticket itself, the fixed delivery workflow a
//! ticket moves through, and the input shapes used to create and patch
//! tickets.

use crate::errors::{Result, TicketError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A step in the delivery workflow.
///
/// The order of the variants is the order tickets advance through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    /// Accepted but not started
    #[serde(rename = "To Do")]
    ToDo,
    /// Being worked on
    #[serde(rename = "In Progress")]
    InProgress,
    /// Under verification
    #[serde(rename = "Testing")]
    Testing,
    /// Shipped; terminal
    #[serde(rename = "Deployed")]
    Deployed,
}

impl Status {
    /// Every status, in advance order.
    pub const WORKFLOW: [Status; 4] = [
        Status::ToDo,
        Status::InProgress,
        Status::Testing,
        Status::Deployed,
    ];

    /// The label stored on tickets and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::ToDo => "To Do",
            Status::InProgress => "In Progress",
            Status::Testing => "Testing",
            Status::Deployed => "Deployed",
        }
    }

    /// Parse a stored status label. Matching is exact.
    pub fn parse(label: &str) -> Option<Self> {
        Self::WORKFLOW.into_iter().find(|s| s.as_str() == label)
    }

    /// Position of this status within [`Status::WORKFLOW`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The status that follows this one, or `None` at the end of the workflow.
    pub fn next(self) -> Option<Self> {
        Self::WORKFLOW.get(self.index() + 1).copied()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of trackable work.
///
/// `status` is kept as free text: tickets may be created or edited with a
/// label outside the workflow, and only [`Ticket::workflow_status`] interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identifier, never reused
    pub id: u64,
    /// Short summary
    pub title: String,
    /// Current status label
    pub status: String,
}

impl Ticket {
    /// The workflow step this ticket is at, if its status is a known one.
    pub fn workflow_status(&self) -> Option<Status> {
        Status::parse(&self.status)
    }
}

/// Validated input for creating a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub title: String,
    pub status: String,
}

impl NewTicket {
    /// Trim and validate the creation fields.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Validation`] when either field is blank.
    pub fn new(title: &str, status: &str) -> Result<Self> {
        let title = title.trim();
        let status = status.trim();

        if title.is_empty() {
            return Err(TicketError::Validation("title is required".to_string()));
        }
        if status.is_empty() {
            return Err(TicketError::Validation("status is required".to_string()));
        }

        Ok(Self {
            title: title.to_string(),
            status: status.to_string(),
        })
    }

    pub(crate) fn into_ticket(self, id: u64) -> Ticket {
        Ticket {
            id,
            title: self.title,
            status: self.status,
        }
    }
}

/// Field-by-field replacement for an existing ticket.
///
/// Absent or blank fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TicketPatch {
    pub fn new(title: Option<String>, status: Option<String>) -> Self {
        Self { title, status }
    }

    /// Patch that only moves the ticket to `status`.
    pub fn status(status: Status) -> Self {
        Self {
            title: None,
            status: Some(status.as_str().to_string()),
        }
    }

    /// Apply the non-blank fields to `ticket`.
    pub fn apply(&self, ticket: &mut Ticket) {
        if let Some(title) = non_blank(self.title.as_deref()) {
            ticket.title = title.to_string();
        }
        if let Some(status) = non_blank(self.status.as_deref()) {
            ticket.status = status.to_string();
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
