use std::sync::Arc;

use crate::payment::PaymentProcessor;
use crate::store::TicketStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TicketStore>,
    pub payments: Arc<dyn PaymentProcessor>,
}

impl AppState {
    pub fn new(store: Arc<dyn TicketStore>, payments: Arc<dyn PaymentProcessor>) -> Self {
        Self { store, payments }
    }
}
