use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Prices are stored as `NUMERIC(10, 2)`.
const PRICE_SCALE: u32 = 2;
const PRICE_LIMIT: i64 = 100_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub price: Decimal,
    pub total_tickets: Option<i32>,
    pub available_tickets: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trimmed view used by the event listing.
#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub price: Decimal,
    pub available_tickets: Option<i32>,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            name: event.name,
            start_time: event.start_time,
            end_time: event.end_time,
            location: event.location,
            price: event.price,
            available_tickets: event.available_tickets,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub total_tickets: Option<i32>,
}

impl NewEvent {
    /// Validates the payload and builds the event with its ledger opened at full capacity.
    pub fn into_event(self, organizer_id: Uuid) -> Result<Event, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::ValidationError("Event name is required".to_string()));
        }
        if self.location.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Event location is required".to_string(),
            ));
        }
        if self.end_time < self.start_time {
            return Err(AppError::ValidationError(
                "Event end_time must not precede start_time".to_string(),
            ));
        }
        if self.price.is_sign_negative() {
            return Err(AppError::ValidationError(
                "Event price must not be negative".to_string(),
            ));
        }
        let price_fits = self.price.normalize().scale() <= PRICE_SCALE
            && self.price < Decimal::from(PRICE_LIMIT);
        if !price_fits {
            return Err(AppError::ValidationError(format!(
                "Event price must be below {} with at most {} decimal places",
                PRICE_LIMIT, PRICE_SCALE
            )));
        }
        if matches!(self.total_tickets, Some(total) if total < 0) {
            return Err(AppError::ValidationError(
                "total_tickets must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Event {
            id: Uuid::new_v4(),
            organizer_id,
            name: self.name.trim().to_string(),
            description: self.description,
            location: self.location.trim().to_string(),
            start_time: self.start_time,
            end_time: self.end_time,
            price: self.price,
            total_tickets: self.total_tickets,
            available_tickets: self.total_tickets,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn concert(total_tickets: Option<i32>) -> NewEvent {
        let start_time = Utc::now() + Duration::days(1);
        NewEvent {
            name: "Concert".to_string(),
            description: "Live show".to_string(),
            location: "Florence".to_string(),
            start_time,
            end_time: start_time + Duration::hours(3),
            price: Decimal::new(3000, 2),
            total_tickets,
        }
    }

    #[test]
    fn test_new_event_opens_ledger_at_capacity() {
        let organizer = Uuid::new_v4();
        let event = concert(Some(100)).into_event(organizer).unwrap();

        assert_eq!(event.organizer_id, organizer);
        assert_eq!(event.total_tickets, Some(100));
        assert_eq!(event.available_tickets, Some(100));
    }

    #[test]
    fn test_new_event_without_capacity() {
        let event = concert(None).into_event(Uuid::new_v4()).unwrap();
        assert_eq!(event.available_tickets, None);
    }

    #[test]
    fn test_new_event_rejects_inverted_times() {
        let mut payload = concert(Some(10));
        payload.end_time = payload.start_time - Duration::hours(1);

        let err = payload.into_event(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_new_event_rejects_negative_capacity() {
        let err = concert(Some(-1)).into_event(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_new_event_rejects_unstorable_price() {
        let mut payload = concert(Some(10));
        payload.price = Decimal::MAX;
        let err = payload.into_event(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let mut payload = concert(Some(10));
        payload.price = Decimal::new(1999, 3);
        assert!(payload.into_event(Uuid::new_v4()).is_err());

        let mut payload = concert(Some(10));
        payload.price = Decimal::new(9_999_999_999, 2);
        assert!(payload.into_event(Uuid::new_v4()).is_ok());
    }
}
