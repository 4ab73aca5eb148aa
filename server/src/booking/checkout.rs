use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ledger;
use crate::models::{NewReservation, Reservation, User};
use crate::payment::{CardDetails, Charge, PaymentProcessor};
use crate::store::TicketStore;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub event_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(flatten)]
    pub card: CardDetails,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub reservation: Reservation,
    pub available_tickets: Option<i32>,
    pub amount: Decimal,
    pub payment_reference: String,
}

/// Charges the buyer and books the tickets in one transaction.
///
/// The event row stays locked from the availability check until the
/// reservation is written, so a declined payment or any later failure leaves
/// both the ledger and the reservation set untouched.
pub async fn checkout(
    store: &dyn TicketStore,
    payments: &dyn PaymentProcessor,
    user: &User,
    request: CheckoutRequest,
) -> Result<CheckoutReceipt, AppError> {
    let CheckoutRequest {
        event_id,
        quantity,
        name,
        surname,
        card,
    } = request;
    let reservation = NewReservation {
        event_id,
        quantity,
        name,
        surname,
    }
    .into_reservation(user.id)?;

    let mut tx = store.begin().await?;
    let event = tx
        .lock_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", event_id)))?;
    ledger::ensure_available(&event, quantity)?;

    let amount = event
        .price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| {
            AppError::ValidationError(format!(
                "Order total for {} tickets at {} is out of range",
                quantity, event.price
            ))
        })?;
    let charge = Charge {
        event_id,
        user_id: user.id,
        amount,
        card: &card,
    };
    let payment = payments.process_payment(&charge).await.map_err(|e| {
        warn!(%event_id, user_id = %user.id, error = %e, "Checkout payment declined");
        AppError::PaymentFailed(e.to_string())
    })?;

    let available = ledger::reserve(tx.as_mut(), event_id, quantity).await?;
    tx.insert_reservation(&reservation).await?;
    // TODO: refund `payment.reference` if the commit fails once a real processor is wired in.
    tx.commit().await?;

    info!(
        reservation_id = %reservation.id,
        %event_id,
        quantity,
        amount = %payment.amount,
        available,
        "Checkout completed"
    );

    Ok(CheckoutReceipt {
        reservation,
        available_tickets: Some(available),
        amount: payment.amount,
        payment_reference: payment.reference,
    })
}
