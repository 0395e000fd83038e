use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;

use boxoffice_domain::{NewEvent, PageRequest};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/events", get(list_events).post(create_event))
        .route("/api/v1/events/paged", get(list_events_paged))
        .route("/api/v1/events/available", get(list_available_events))
        .route("/api/v1/events/:id", get(get_event))
}

async fn list_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse, ApiError> {
    let events = state
        .catalog
        .list_events()
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok(Json(events))
}

async fn list_events_paged(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let page = parse_number(&params, "page", uri.path())?;
    let size = parse_number(&params, "size", uri.path())?;

    let request = PageRequest::parse(page, size, params.get("sort").map(String::as_str))
        .map_err(|e| ApiError::new(e, uri.path()))?;

    let page = state
        .catalog
        .list_events_paged(&request)
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok(Json(page))
}

async fn get_event(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: i64 = id.parse().map_err(|_| {
        ApiError::validation(
            format!("Invalid value '{}' for parameter 'id'", id),
            uri.path(),
        )
    })?;

    let event = state
        .catalog
        .get_event(id)
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok(Json(event))
}

async fn list_available_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse, ApiError> {
    let events = state
        .catalog
        .list_available_events()
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok(Json(events))
}

async fn create_event(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<NewEvent>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .catalog
        .create_event(payload)
        .await
        .map_err(|e| ApiError::new(e, uri.path()))?;
    Ok((StatusCode::CREATED, Json(event)))
}

fn parse_number(
    params: &HashMap<String, String>,
    name: &str,
    path: &str,
) -> Result<Option<u32>, ApiError> {
    params
        .get(name)
        .map(|raw| {
            raw.parse().map_err(|_| {
                ApiError::validation(
                    format!("Invalid value '{}' for parameter '{}'", raw, name),
                    path,
                )
            })
        })
        .transpose()
}
