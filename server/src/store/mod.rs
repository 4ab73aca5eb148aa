//! Persistence seam.
//!
//! Reads that do not touch the ledger go straight through [`TicketStore`].
//! Anything that moves tickets runs inside a [`StoreTx`]: the rows it locks stay
//! locked until [`StoreTx::commit`], and dropping the transaction without
//! committing discards every staged change.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Event, Reservation, User};
use crate::utils::error::AppError;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError>;

    async fn insert_event(&self, event: &Event) -> Result<(), AppError>;
    async fn list_events(&self) -> Result<Vec<Event>, AppError>;
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError>;

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError>;
    /// Non-canceled reservations held by `user_id`, newest first.
    async fn list_active_reservations(&self, user_id: Uuid) -> Result<Vec<Reservation>, AppError>;

    /// Fails with a validation error when the username is taken.
    async fn insert_user(&self, user: &User, token: &str) -> Result<(), AppError>;
    /// Binds another token to an existing user. Fails with a validation error
    /// when the token is already issued.
    async fn add_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError>;
    /// Drops every token of `user_id` except `keep`.
    async fn revoke_other_tokens(&self, user_id: Uuid, keep: &str) -> Result<(), AppError>;
    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait StoreTx: Send {
    /// Loads the event and holds its row lock until the transaction ends.
    async fn lock_event(&mut self, id: Uuid) -> Result<Option<Event>, AppError>;
    async fn set_available_tickets(&mut self, event_id: Uuid, available: i32)
        -> Result<(), AppError>;

    /// Loads the reservation and holds its row lock until the transaction ends.
    async fn lock_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError>;
    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError>;
    async fn update_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError>;
    async fn delete_reservation(&mut self, id: Uuid) -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
