//! Property-based tests for ticket store invariants
//!
//! Random sequences of creates, updates, advances, and deletes are replayed
//! against each backend and checked against a simple model.

use super::*;
use crate::errors::TicketError;
use crate::service::TicketService;
use proptest::prelude::*;
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum Op {
    Create(String),
    CreateBlank,
    Delete(usize),
    Advance(usize),
    Retitle(usize, String),
}

// Indices pick among ids handed out so far (modulo), so deletes and
// advances often target real and already-deleted tickets alike
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => "[A-Za-z][A-Za-z ]{0,12}".prop_map(Op::Create),
        1 => Just(Op::CreateBlank),
        2 => any::<usize>().prop_map(Op::Delete),
        2 => any::<usize>().prop_map(Op::Advance),
        1 => (any::<usize>(), "[a-z]{1,8}").prop_map(|(i, t)| Op::Retitle(i, t)),
    ]
}

/// Replay `ops`, checking each result against the expected live set.
fn check_sequence<S: TicketStore>(storage: S, ops: &[Op]) -> Result<(), TestCaseError> {
    storage.init().unwrap();
    let service = TicketService::new(storage);

    let mut issued: Vec<u64> = Vec::new();
    let mut live: Vec<u64> = Vec::new();

    for op in ops {
        match op {
            Op::Create(title) => {
                let ticket = service.create_ticket(title, "To Do").unwrap();
                if let Some(last) = issued.last() {
                    prop_assert!(ticket.id > *last, "id {} after {}", ticket.id, last);
                }
                issued.push(ticket.id);
                live.push(ticket.id);
            }
            Op::CreateBlank => {
                let before = service.list_tickets().unwrap().len();
                let result = service.create_ticket("   ", "To Do");
                prop_assert!(matches!(result, Err(TicketError::Validation(_))));
                prop_assert_eq!(service.list_tickets().unwrap().len(), before);
            }
            Op::Delete(i) if !issued.is_empty() => {
                let id = issued[i % issued.len()];
                let result = service.delete_ticket(id);
                if let Some(pos) = live.iter().position(|&l| l == id) {
                    prop_assert!(result.is_ok());
                    live.remove(pos);
                } else {
                    prop_assert!(matches!(result, Err(TicketError::NotFound(_))));
                }
            }
            Op::Advance(i) if !issued.is_empty() => {
                let id = issued[i % issued.len()];
                let result = service.advance_ticket(id);
                if live.contains(&id) {
                    prop_assert!(matches!(
                        result,
                        Ok(_) | Err(TicketError::AlreadyFinal(_))
                    ));
                } else {
                    prop_assert!(matches!(result, Err(TicketError::NotFound(_))));
                }
            }
            Op::Retitle(i, title) if !issued.is_empty() => {
                let id = issued[i % issued.len()];
                let result = service.update_ticket(id, Some(title.clone()), None);
                prop_assert_eq!(result.is_ok(), live.contains(&id));
            }
            _ => {}
        }
    }

    let listed: Vec<u64> = service.list_tickets().unwrap().iter().map(|t| t.id).collect();
    prop_assert_eq!(listed, live);
    Ok(())
}

// Property: ids strictly increase and never repeat, live set matches model
proptest! {
    #[test]
    fn prop_memory_store_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        check_sequence(InMemoryStorage::new(), &ops)?;
    }

    #[test]
    fn prop_sqlite_store_matches_model(ops in prop::collection::vec(op_strategy(), 1..60)) {
        check_sequence(SqliteStorage::open_in_memory().unwrap(), &ops)?;
    }
}

// File I/O per operation is slow; fewer, shorter cases
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_json_store_matches_model(ops in prop::collection::vec(op_strategy(), 1..25)) {
        let temp_dir = TempDir::new().unwrap();
        check_sequence(JsonFileStorage::new(temp_dir.path().join("tickets.json")), &ops)?;
    }
}
