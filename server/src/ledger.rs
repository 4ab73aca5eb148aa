//! Inventory ledger.
//!
//! `available_tickets` is only ever changed through [`reserve`] and [`release`].
//! Both run against an event row locked by the surrounding [`StoreTx`], so the
//! check and the write are observed as one step by every other transaction.

use uuid::Uuid;

use crate::models::Event;
use crate::store::StoreTx;
use crate::utils::error::AppError;

/// Fails with `InsufficientInventory` when the event has no capacity set or
/// fewer than `quantity` tickets left.
pub fn ensure_available(event: &Event, quantity: i32) -> Result<i32, AppError> {
    match event.available_tickets {
        Some(available) if available >= quantity => Ok(available),
        available => Err(AppError::InsufficientInventory {
            requested: quantity,
            available,
        }),
    }
}

fn released_balance(event: &Event, quantity: i32) -> Result<i32, AppError> {
    let available = event.available_tickets.ok_or_else(|| {
        AppError::InternalServerError(format!(
            "Event '{}' has no ledger to release tickets into",
            event.id
        ))
    })?;
    let balance = available + quantity;

    match event.total_tickets {
        Some(total) if balance > total => Err(AppError::InternalServerError(format!(
            "Releasing {} tickets would raise event '{}' to {} of {}",
            quantity, event.id, balance, total
        ))),
        _ => Ok(balance),
    }
}

async fn locked_event(tx: &mut dyn StoreTx, event_id: Uuid) -> Result<Event, AppError> {
    tx.lock_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", event_id)))
}

/// Takes `quantity` tickets off the event's ledger and returns the new balance.
pub async fn reserve(tx: &mut dyn StoreTx, event_id: Uuid, quantity: i32) -> Result<i32, AppError> {
    let event = locked_event(tx, event_id).await?;
    let available = ensure_available(&event, quantity)?;
    let balance = available - quantity;

    tx.set_available_tickets(event_id, balance).await?;
    tracing::debug!(%event_id, quantity, available = balance, "Tickets reserved");
    Ok(balance)
}

/// Returns `quantity` previously reserved tickets to the event's ledger.
pub async fn release(tx: &mut dyn StoreTx, event_id: Uuid, quantity: i32) -> Result<i32, AppError> {
    let event = locked_event(tx, event_id).await?;
    let balance = released_balance(&event, quantity)?;

    tx.set_available_tickets(event_id, balance).await?;
    tracing::debug!(%event_id, quantity, available = balance, "Tickets released");
    Ok(balance)
}
