use axum::extract::State;
use axum::response::Response;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::booking;
use crate::models::{NewReservation, ReservationUpdate};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{Json, Path};
use crate::utils::response::{created, success};

pub async fn list_reservations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Response, AppError> {
    let reservations = booking::list_reservations(state.store.as_ref(), &user).await?;
    Ok(success(reservations, "Reservations retrieved"))
}

pub async fn create_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<NewReservation>,
) -> Result<Response, AppError> {
    let outcome = booking::create_reservation(state.store.as_ref(), &user, payload).await?;
    Ok(created(outcome, "Reservation created"))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(reservation_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let reservation =
        booking::get_reservation(state.store.as_ref(), &user, reservation_id).await?;
    Ok(success(reservation, "Reservation retrieved"))
}

pub async fn update_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(reservation_id): Path<Uuid>,
    Json(update): Json<ReservationUpdate>,
) -> Result<Response, AppError> {
    let outcome =
        booking::update_reservation(state.store.as_ref(), &user, reservation_id, update).await?;
    Ok(success(outcome, "Reservation updated"))
}

pub async fn destroy_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(reservation_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome =
        booking::destroy_reservation(state.store.as_ref(), &user, reservation_id).await?;
    Ok(success(outcome, "Reservation deleted"))
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(reservation_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let outcome =
        booking::cancel_reservation(state.store.as_ref(), &user, reservation_id).await?;
    Ok(success(outcome, "Reservation canceled"))
}
