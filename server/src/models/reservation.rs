use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub quantity: i32,
    pub canceled: bool,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        !self.canceled
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub event_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

impl NewReservation {
    pub fn into_reservation(self, user_id: Uuid) -> Result<Reservation, AppError> {
        validate_quantity(self.quantity)?;

        Ok(Reservation {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            user_id,
            name: normalize(self.name),
            surname: normalize(self.surname),
            quantity: self.quantity,
            canceled: false,
            created_at: Utc::now(),
        })
    }
}

/// Partial update. Omitted fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationUpdate {
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
}

pub(crate) fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::ValidationError(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reservation_defaults_to_one_ticket() {
        let payload: NewReservation =
            serde_json::from_value(serde_json::json!({ "event_id": Uuid::new_v4() })).unwrap();
        assert_eq!(payload.quantity, 1);
    }

    #[test]
    fn test_new_reservation_rejects_zero_quantity() {
        let payload = NewReservation {
            event_id: Uuid::new_v4(),
            quantity: 0,
            name: None,
            surname: None,
        };
        assert!(matches!(
            payload.into_reservation(Uuid::new_v4()),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_holder_names_are_trimmed() {
        let payload = NewReservation {
            event_id: Uuid::new_v4(),
            quantity: 2,
            name: Some("  Ada ".to_string()),
            surname: Some("   ".to_string()),
        };
        let reservation = payload.into_reservation(Uuid::new_v4()).unwrap();

        assert_eq!(reservation.name.as_deref(), Some("Ada"));
        assert_eq!(reservation.surname, None);
        assert!(reservation.is_active());
    }
}
