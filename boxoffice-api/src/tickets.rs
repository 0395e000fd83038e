use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/tickets/event/:event_id", get(list_available_tickets))
        .route("/api/v1/tickets/reserve", post(reserve_ticket))
        .route("/api/v1/tickets/customer/:email", get(list_customer_tickets))
}

async fn list_available_tickets(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id: i64 = event_id.parse().map_err(|_| {
        ApiError::validation(
            format!("Invalid value '{}' for parameter 'eventId'", event_id),
            uri.path(),
        )
    })?;

    let tickets = state
        .catalog
        .list_available_tickets(event_id)
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok(Json(tickets))
}

/// Reservation parameters arrive as query parameters; they are parsed by
/// hand so missing or malformed values surface in the standard error body.
async fn reserve_ticket(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = params
        .get("eventId")
        .ok_or_else(|| ApiError::validation("Event ID is required", uri.path()))?;
    let event_id: i64 = event_id.parse().map_err(|_| {
        ApiError::validation(
            format!("Invalid value '{}' for parameter 'eventId'", event_id),
            uri.path(),
        )
    })?;

    let customer_email = params
        .get("customerEmail")
        .ok_or_else(|| ApiError::validation("Email is required", uri.path()))?;

    let ticket = state
        .reservations
        .reserve(event_id, customer_email)
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn list_customer_tickets(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tickets = state
        .catalog
        .list_by_customer(&email)
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok(Json(tickets))
}
