//! DevTrack command-line client
//!
//! Works directly against the configured ticket store, so it can share a
//! JSON file or SQLite database with a running server.

use anyhow::{Context, Result};
use clap::Parser;
use devtrack::cli::{Cli, Commands};
use devtrack::{DevtrackConfig, Ticket, TicketError, TicketService};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Standardized exit codes for the devtrack CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
enum ExitCode {
    Success = 0,
    GenericError = 1,
    NotFound = 3,
    ValidationFailed = 4,
}

fn error_to_exit_code(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<TicketError>() {
        Some(TicketError::NotFound(_)) => ExitCode::NotFound,
        Some(TicketError::Validation(_))
        | Some(TicketError::AlreadyFinal(_))
        | Some(TicketError::InvalidState { .. }) => ExitCode::ValidationFailed,
        Some(TicketError::Storage(_)) | None => ExitCode::GenericError,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let exit_code = match run(cli) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            report_error(json, &e);
            error_to_exit_code(&e)
        }
    };

    if exit_code != ExitCode::Success {
        std::process::exit(exit_code as i32);
    }
}

/// Machine-readable error printed on stdout in `--json` mode
#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

fn error_code(error: &anyhow::Error) -> &'static str {
    error
        .downcast_ref::<TicketError>()
        .map(TicketError::code)
        .unwrap_or("ERROR")
}

fn report_error(json: bool, error: &anyhow::Error) {
    let detail = ErrorDetail {
        code: error_code(error),
        message: format!("{:#}", error),
    };
    if json {
        let body = serde_json::json!({ "error": detail });
        if let Ok(out) = serde_json::to_string_pretty(&body) {
            println!("{}", out);
        }
    }
    eprintln!("Error [{}]: {}", detail.code, detail.message);
}

fn run(cli: Cli) -> Result<()> {
    let config = DevtrackConfig::load_or_default(cli.config.as_deref())?;
    let storage = config.storage_config(cli.storage.as_deref())?;
    let service = TicketService::new(storage.open()?);
    let json = cli.json;

    match cli.command {
        Commands::List => {
            let tickets = service.list_tickets()?;
            if json {
                print_json(&tickets)?;
            } else if tickets.is_empty() {
                println!("No tickets");
            } else {
                tickets.iter().for_each(print_ticket);
            }
        }
        Commands::Show { id } => emit(json, &service.show_ticket(id)?)?,
        Commands::Create { title, status } => {
            emit(json, &service.create_ticket(&title, &status)?)?
        }
        Commands::Update { id, title, status } => {
            emit(json, &service.update_ticket(id, title, status)?)?
        }
        Commands::Advance { id } => emit(json, &service.advance_ticket(id)?)?,
        Commands::Delete { id } => {
            service.delete_ticket(id)?;
            if json {
                print_json(&serde_json::json!({ "deleted": id }))?;
            } else {
                println!("Deleted ticket {}", id);
            }
        }
        Commands::Status => {
            let summary = service.status_summary()?;
            if json {
                print_json(&summary)?;
            } else {
                println!("To Do:       {}", summary.to_do);
                println!("In Progress: {}", summary.in_progress);
                println!("Testing:     {}", summary.testing);
                println!("Deployed:    {}", summary.deployed);
                if summary.other > 0 {
                    println!("Other:       {}", summary.other);
                }
                println!("Total:       {}", summary.total);
            }
        }
    }

    Ok(())
}

fn emit(json: bool, ticket: &Ticket) -> Result<()> {
    if json {
        print_json(ticket)
    } else {
        print_ticket(ticket);
        Ok(())
    }
}

fn print_ticket(ticket: &Ticket) {
    println!("{:>4}  [{}]  {}", ticket.id, ticket.status, ticket.title);
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

