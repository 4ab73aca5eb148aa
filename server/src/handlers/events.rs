use axum::extract::State;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{EventSummary, NewEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path};
use crate::utils::response::{created, success};

pub async fn list_events(State(state): State<AppState>) -> Result<Response, AppError> {
    let events: Vec<EventSummary> = state
        .store
        .list_events()
        .await?
        .into_iter()
        .map(EventSummary::from)
        .collect();
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .get_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", event_id)))?;
    Ok(success(event, "Event retrieved"))
}

pub async fn create_event(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<NewEvent>,
) -> Result<Response, AppError> {
    let organizer = caller.require_staff()?;
    let event = payload.into_event(organizer.id)?;
    state.store.insert_event(&event).await?;

    tracing::info!(
        event_id = %event.id,
        organizer_id = %organizer.id,
        total_tickets = ?event.total_tickets,
        "Event created"
    );
    Ok(created(event, "Event created"))
}
