use tracing::info;
use uuid::Uuid;

use super::LedgerOutcome;
use crate::ledger;
use crate::models::reservation::{normalize, validate_quantity};
use crate::models::{NewReservation, Reservation, ReservationUpdate, User};
use crate::store::{StoreTx, TicketStore};
use crate::utils::error::AppError;

fn ensure_owner(user: &User, reservation: &Reservation) -> Result<(), AppError> {
    if reservation.user_id != user.id {
        return Err(AppError::Forbidden(
            "You do not have access to this reservation".to_string(),
        ));
    }
    Ok(())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Reservation '{}' was not found", id))
}

async fn lock_owned(
    tx: &mut dyn StoreTx,
    user: &User,
    id: Uuid,
) -> Result<Reservation, AppError> {
    let reservation = tx.lock_reservation(id).await?.ok_or_else(|| not_found(id))?;
    ensure_owner(user, &reservation)?;
    Ok(reservation)
}

async fn lock_active(
    tx: &mut dyn StoreTx,
    user: &User,
    id: Uuid,
) -> Result<Reservation, AppError> {
    let reservation = lock_owned(tx, user, id).await?;
    if !reservation.is_active() {
        return Err(AppError::NotFound(format!(
            "Reservation '{}' has been canceled",
            id
        )));
    }
    Ok(reservation)
}

async fn current_balance(tx: &mut dyn StoreTx, event_id: Uuid) -> Result<Option<i32>, AppError> {
    Ok(tx
        .lock_event(event_id)
        .await?
        .and_then(|event| event.available_tickets))
}

pub async fn list_reservations(
    store: &dyn TicketStore,
    user: &User,
) -> Result<Vec<Reservation>, AppError> {
    store.list_active_reservations(user.id).await
}

pub async fn get_reservation(
    store: &dyn TicketStore,
    user: &User,
    id: Uuid,
) -> Result<Reservation, AppError> {
    let reservation = store.get_reservation(id).await?.ok_or_else(|| not_found(id))?;
    ensure_owner(user, &reservation)?;
    Ok(reservation)
}

pub async fn create_reservation(
    store: &dyn TicketStore,
    user: &User,
    payload: NewReservation,
) -> Result<LedgerOutcome, AppError> {
    let reservation = payload.into_reservation(user.id)?;

    let mut tx = store.begin().await?;
    let available = ledger::reserve(tx.as_mut(), reservation.event_id, reservation.quantity).await?;
    tx.insert_reservation(&reservation).await?;
    tx.commit().await?;

    info!(
        reservation_id = %reservation.id,
        event_id = %reservation.event_id,
        quantity = reservation.quantity,
        available,
        "Reservation created"
    );

    Ok(LedgerOutcome {
        reservation,
        available_tickets: Some(available),
    })
}

/// Applies a partial update. The quantity may only go down; the difference is
/// released back to the event in the same transaction.
pub async fn update_reservation(
    store: &dyn TicketStore,
    user: &User,
    id: Uuid,
    update: ReservationUpdate,
) -> Result<LedgerOutcome, AppError> {
    let mut tx = store.begin().await?;
    let mut reservation = lock_active(tx.as_mut(), user, id).await?;
    let previous = reservation.quantity;

    if let Some(quantity) = update.quantity {
        validate_quantity(quantity)?;
        if quantity > previous {
            return Err(AppError::QuantityIncreaseNotAllowed {
                current: previous,
                requested: quantity,
            });
        }
        if quantity < previous {
            ledger::release(tx.as_mut(), reservation.event_id, previous - quantity).await?;
            reservation.quantity = quantity;
        }
    }
    if let Some(name) = update.name {
        reservation.name = normalize(Some(name));
    }
    if let Some(surname) = update.surname {
        reservation.surname = normalize(Some(surname));
    }

    tx.update_reservation(&reservation).await?;
    let available = current_balance(tx.as_mut(), reservation.event_id).await?;
    tx.commit().await?;

    info!(
        reservation_id = %reservation.id,
        event_id = %reservation.event_id,
        previous,
        quantity = reservation.quantity,
        "Reservation updated"
    );

    Ok(LedgerOutcome {
        reservation,
        available_tickets: available,
    })
}

/// Deletes the reservation. Tickets of an already canceled reservation were
/// returned at cancel time and are not released twice.
pub async fn destroy_reservation(
    store: &dyn TicketStore,
    user: &User,
    id: Uuid,
) -> Result<LedgerOutcome, AppError> {
    let mut tx = store.begin().await?;
    let reservation = lock_owned(tx.as_mut(), user, id).await?;

    let available = if reservation.is_active() {
        Some(ledger::release(tx.as_mut(), reservation.event_id, reservation.quantity).await?)
    } else {
        current_balance(tx.as_mut(), reservation.event_id).await?
    };
    tx.delete_reservation(reservation.id).await?;
    tx.commit().await?;

    info!(
        reservation_id = %reservation.id,
        event_id = %reservation.event_id,
        quantity = reservation.quantity,
        "Reservation deleted"
    );

    Ok(LedgerOutcome {
        reservation,
        available_tickets: available,
    })
}

/// Marks the reservation canceled and returns its tickets. Same ledger effect
/// as deletion, but the row is kept.
pub async fn cancel_reservation(
    store: &dyn TicketStore,
    user: &User,
    id: Uuid,
) -> Result<LedgerOutcome, AppError> {
    let mut tx = store.begin().await?;
    let mut reservation = lock_active(tx.as_mut(), user, id).await?;

    let available = ledger::release(tx.as_mut(), reservation.event_id, reservation.quantity).await?;
    reservation.canceled = true;
    tx.update_reservation(&reservation).await?;
    tx.commit().await?;

    info!(
        reservation_id = %reservation.id,
        event_id = %reservation.event_id,
        quantity = reservation.quantity,
        "Reservation canceled"
    );

    Ok(LedgerOutcome {
        reservation,
        available_tickets: Some(available),
    })
}
