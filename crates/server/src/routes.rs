//! API route definitions

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use devtrack::service::StatusSummary;
use devtrack::{Ticket, TicketError, TicketService, TicketStore};

/// Shared application state
pub type AppState<S> = Arc<TicketService<S>>;

/// Create API routes
pub fn create_routes<S: TicketStore + 'static>(service: Arc<TicketService<S>>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route("/tickets/", get(list_tickets).post(create_ticket))
        .route(
            "/tickets/:id",
            get(get_ticket)
                .put(update_ticket)
                .patch(update_ticket)
                .delete(delete_ticket),
        )
        .route("/tickets/:id/advance", patch(advance_ticket).post(advance_ticket))
        .with_state(service)
}

/// Failure translated to an HTTP status and `{"error", "code"}` body
#[derive(Debug)]
pub enum ApiError {
    Ticket(TicketError),
    /// Malformed request body
    BadRequest(String),
    /// Path segment that cannot name any ticket
    UnknownId(String),
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        ApiError::Ticket(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ticket(TicketError::NotFound(_)) | ApiError::UnknownId(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Ticket(e) if !e.is_client_error() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Ticket(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Ticket(e) => e.code(),
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::UnknownId(_) => TicketError::NotFound(0).code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();
        let error = match self {
            ApiError::Ticket(e) if !e.is_client_error() => {
                tracing::error!("Storage failure: {}", e);
                "Internal storage error".to_string()
            }
            ApiError::Ticket(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg,
            ApiError::UnknownId(raw) => format!("Ticket not found: {}", raw),
        };
        (status, Json(ErrorBody { error, code })).into_response()
    }
}

/// Ticket id from the raw path segment; anything that is not a u64 cannot exist.
fn ticket_id(raw: String) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| ApiError::UnknownId(raw))
}

/// Run a store call on the blocking pool; file locks and fsync may wait.
async fn with_service<S, T, F>(service: AppState<S>, call: F) -> Result<T, ApiError>
where
    S: TicketStore + 'static,
    T: Send + 'static,
    F: FnOnce(&TicketService<S>) -> devtrack::errors::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| TicketError::Storage(anyhow::anyhow!("Store task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Health check endpoint
async fn health_check<S: TicketStore>(
    State(service): State<AppState<S>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "devtrack-api",
        "storage": service.storage().backend_name(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ticket fields accepted on create and update. Missing fields are `None`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TicketRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// List all tickets
async fn list_tickets<S: TicketStore + 'static>(
    State(service): State<AppState<S>>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    Ok(Json(with_service(service, |s| s.list_tickets()).await?))
}

/// Create a ticket
async fn create_ticket<S: TicketStore + 'static>(
    State(service): State<AppState<S>>,
    payload: Result<Json<TicketRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let Json(request) = payload?;
    let ticket = with_service(service, move |s| {
        s.create_ticket(
            request.title.as_deref().unwrap_or_default(),
            request.status.as_deref().unwrap_or_default(),
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Get single ticket by id
async fn get_ticket<S: TicketStore + 'static>(
    Path(raw): Path<String>,
    State(service): State<AppState<S>>,
) -> Result<Json<Ticket>, ApiError> {
    let id = ticket_id(raw)?;
    Ok(Json(with_service(service, move |s| s.show_ticket(id)).await?))
}

/// Edit title and/or status directly
async fn update_ticket<S: TicketStore + 'static>(
    Path(raw): Path<String>,
    State(service): State<AppState<S>>,
    payload: Result<Json<TicketRequest>, JsonRejection>,
) -> Result<Json<Ticket>, ApiError> {
    let id = ticket_id(raw)?;
    let Json(request) = payload?;
    let ticket =
        with_service(service, move |s| s.update_ticket(id, request.title, request.status))
            .await?;
    Ok(Json(ticket))
}

/// Move a ticket to the next workflow status
async fn advance_ticket<S: TicketStore + 'static>(
    Path(raw): Path<String>,
    State(service): State<AppState<S>>,
) -> Result<Json<Ticket>, ApiError> {
    let id = ticket_id(raw)?;
    Ok(Json(with_service(service, move |s| s.advance_ticket(id)).await?))
}

/// Delete a ticket
async fn delete_ticket<S: TicketStore + 'static>(
    Path(raw): Path<String>,
    State(service): State<AppState<S>>,
) -> Result<StatusCode, ApiError> {
    let id = ticket_id(raw)?;
    with_service(service, move |s| s.delete_ticket(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ticket counts per status
async fn get_status<S: TicketStore + 'static>(
    State(service): State<AppState<S>>,
) -> Result<Json<StatusSummary>, ApiError> {
    Ok(Json(with_service(service, |s| s.status_summary()).await?))
}
