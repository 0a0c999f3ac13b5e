//! Error taxonomy shared by the store, the service, and both front ends.
//!
//! Domain failures (`Validation`, `NotFound`, `AlreadyFinal`, `InvalidState`)
//! are recoverable at the request boundary. `Storage` wraps backend failures
//! (I/O, serialization, SQLite, lock timeouts) with their `anyhow` context chain.

use thiserror::Error;

/// Errors returned by ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// A required field was missing or blank
    #[error("Validation failed: {0}")]
    Validation(String),
    /// No ticket has the given id
    #[error("Ticket not found: {0}")]
    NotFound(u64),
    /// Advance was requested on a ticket at the end of the workflow
    #[error("Ticket {0} is already Deployed and cannot advance")]
    AlreadyFinal(u64),
    /// Advance was requested on a ticket whose status is not a workflow step
    #[error("Ticket {id} has status '{status}', which is not part of the workflow")]
    InvalidState { id: u64, status: String },
    /// The storage backend failed
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl TicketError {
    /// Stable machine-readable code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            TicketError::Validation(_) => "VALIDATION_FAILED",
            TicketError::NotFound(_) => "TICKET_NOT_FOUND",
            TicketError::AlreadyFinal(_) => "ALREADY_FINAL",
            TicketError::InvalidState { .. } => "INVALID_STATE",
            TicketError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the caller caused the failure (as opposed to the backend).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, TicketError::Storage(_))
    }
}

impl From<rusqlite::Error> for TicketError {
    fn from(err: rusqlite::Error) -> Self {
        TicketError::Storage(anyhow::Error::new(err).context("SQLite operation failed"))
    }
}

pub type Result<T, E = TicketError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_messages_name_the_ticket() {
        assert_eq!(TicketError::NotFound(7).to_string(), "Ticket not found: 7");
        assert!(TicketError::AlreadyFinal(3).to_string().contains("Deployed"));

        let err = TicketError::InvalidState {
            id: 2,
            status: "Blocked".to_string(),
        };
        assert!(err.to_string().contains("'Blocked'"));
    }

    #[test]
    fn test_storage_error_keeps_context_chain() {
        let err: TicketError = anyhow!("disk full").context("Failed to write tickets").into();
        let msg = err.to_string();
        assert!(msg.contains("Failed to write tickets"));
        assert!(msg.contains("disk full"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            TicketError::Validation("x".to_string()),
            TicketError::NotFound(1),
            TicketError::AlreadyFinal(1),
            TicketError::InvalidState {
                id: 1,
                status: "x".to_string(),
            },
            TicketError::Storage(anyhow!("x")),
        ];
        let mut codes: Vec<_> = errors.iter().map(TicketError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
