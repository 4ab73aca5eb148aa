use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{StoreTx, TicketStore};
use crate::models::{Event, Reservation, User};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, Uuid>,
    events: HashMap<Uuid, Event>,
    reservations: HashMap<Uuid, Reservation>,
}

/// Process-local store for development and tests.
///
/// A transaction holds the single state mutex from `begin` until it is
/// committed or dropped, so ledger updates are serialized across all events and
/// every read waits behind an open transaction, including one that is waiting
/// on a payment. `begin` stages a full copy of the state, which makes each
/// transaction cost grow with the whole dataset. Use [`super::PgStore`] for
/// anything beyond a single small process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of quantities over the event's active reservations.
    #[cfg(test)]
    pub(crate) async fn active_quantity(&self, event_id: Uuid) -> i32 {
        self.state
            .lock()
            .await
            .reservations
            .values()
            .filter(|r| r.event_id == event_id && r.is_active())
            .map(|r| r.quantity)
            .sum()
    }

    #[cfg(test)]
    pub(crate) async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        state.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let state = self.state.lock().await;
        let mut events: Vec<Event> = state.events.values().cloned().collect();
        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        Ok(self.state.lock().await.reservations.get(&id).cloned())
    }

    async fn list_active_reservations(&self, user_id: Uuid) -> Result<Vec<Reservation>, AppError> {
        let state = self.state.lock().await;
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id && r.is_active())
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reservations)
    }

    async fn insert_user(&self, user: &User, token: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::ValidationError(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }
        if state.tokens.contains_key(token) {
            return Err(AppError::ValidationError("Token is already issued".to_string()));
        }
        state.users.insert(user.id, user.clone());
        state.tokens.insert(token.to_string(), user.id);
        Ok(())
    }

    async fn add_token(&self, user_id: Uuid, token: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("User '{}' was not found", user_id)));
        }
        if state.tokens.contains_key(token) {
            return Err(AppError::ValidationError("Token is already issued".to_string()));
        }
        state.tokens.insert(token.to_string(), user_id);
        Ok(())
    }

    async fn revoke_other_tokens(&self, user_id: Uuid, keep: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        state
            .tokens
            .retain(|token, owner| *owner != user_id || token == keep);
        Ok(())
    }

    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .tokens
            .get(token)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_event(&mut self, id: Uuid) -> Result<Option<Event>, AppError> {
        Ok(self.staged.events.get(&id).cloned())
    }

    async fn set_available_tickets(
        &mut self,
        event_id: Uuid,
        available: i32,
    ) -> Result<(), AppError> {
        let event = self
            .staged
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AppError::NotFound(format!("Event '{}' was not found", event_id)))?;
        event.available_tickets = Some(available);
        event.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn lock_reservation(&mut self, id: Uuid) -> Result<Option<Reservation>, AppError> {
        Ok(self.staged.reservations.get(&id).cloned())
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        if !self.staged.events.contains_key(&reservation.event_id) {
            return Err(AppError::NotFound(format!(
                "Event '{}' was not found",
                reservation.event_id
            )));
        }
        self.staged
            .reservations
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn update_reservation(&mut self, reservation: &Reservation) -> Result<(), AppError> {
        match self.staged.reservations.get_mut(&reservation.id) {
            Some(slot) => {
                *slot = reservation.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Reservation '{}' was not found",
                reservation.id
            ))),
        }
    }

    async fn delete_reservation(&mut self, id: Uuid) -> Result<(), AppError> {
        self.staged.reservations.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    fn event(total: i32) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            name: "Concert".to_string(),
            description: String::new(),
            location: "Florence".to_string(),
            start_time: now + Duration::days(1),
            end_time: now + Duration::days(1) + Duration::hours(3),
            price: Decimal::ZERO,
            total_tickets: Some(total),
            available_tickets: Some(total),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_changes() {
        let store = MemoryStore::new();
        let event = event(10);
        store.insert_event(&event).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.set_available_tickets(event.id, 3).await.unwrap();
        }

        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.available_tickets, Some(10));
    }

    #[tokio::test]
    async fn test_committed_transaction_is_visible() {
        let store = MemoryStore::new();
        let event = event(10);
        store.insert_event(&event).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.set_available_tickets(event.id, 7).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.get_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.available_tickets, Some(7));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store
            .insert_user(&User::new("alice", false), "token-a")
            .await
            .unwrap();

        let err = store
            .insert_user(&User::new("alice", false), "token-b")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(store.find_user_by_token("token-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_rotation_keeps_only_latest() {
        let store = MemoryStore::new();
        let alice = User::new("alice", false);
        let bob = User::new("bob", false);
        store.insert_user(&alice, "token-a").await.unwrap();
        store.insert_user(&bob, "token-b").await.unwrap();

        store.add_token(alice.id, "token-a2").await.unwrap();
        assert!(store.add_token(alice.id, "token-b").await.is_err());
        store.revoke_other_tokens(alice.id, "token-a2").await.unwrap();

        assert!(store.find_user_by_token("token-a").await.unwrap().is_none());
        let resolved = store.find_user_by_token("token-a2").await.unwrap().unwrap();
        assert_eq!(resolved.id, alice.id);
        assert!(store.find_user_by_token("token-b").await.unwrap().is_some());
    }
}
