//! Reservation lifecycle and checkout, both built on the inventory ledger.

use serde::Serialize;

use crate::models::Reservation;

pub mod checkout;
pub mod lifecycle;

pub use checkout::{checkout, CheckoutReceipt, CheckoutRequest};
pub use lifecycle::{
    cancel_reservation, create_reservation, destroy_reservation, get_reservation,
    list_reservations, update_reservation,
};

/// A reservation together with the event balance it left behind.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerOutcome {
    pub reservation: Reservation,
    pub available_tickets: Option<i32>,
}
