//! Payment capability used by checkout.
//!
//! No real gateway is integrated; [`SimulatedPayments`] stands in for one and
//! can be swapped for any other [`PaymentProcessor`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

/// Card fields as submitted by the checkout form. Never persisted.
#[derive(Clone, Default, Deserialize)]
pub struct CardDetails {
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvc: String,
}

impl CardDetails {
    fn last_four(&self) -> String {
        let digits: Vec<char> = self
            .card_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("card_number", &format_args!("****{}", self.last_four()))
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Charge<'a> {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub card: &'a CardDetails,
}

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub reference: String,
    pub amount: Decimal,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Card declined: {0}")]
    Declined(String),
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn process_payment(&self, charge: &Charge<'_>) -> Result<PaymentReceipt, PaymentError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentOutcome {
    #[default]
    Approve,
    Decline,
}

impl FromStr for PaymentOutcome {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "approve" => Ok(Self::Approve),
            "decline" => Ok(Self::Decline),
            other => Err(format!("unknown payment simulation outcome '{other}'")),
        }
    }
}

/// Answers every charge with the configured outcome.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPayments {
    outcome: PaymentOutcome,
}

impl SimulatedPayments {
    pub fn new(outcome: PaymentOutcome) -> Self {
        Self { outcome }
    }

    pub fn approving() -> Self {
        Self::new(PaymentOutcome::Approve)
    }

    pub fn declining() -> Self {
        Self::new(PaymentOutcome::Decline)
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedPayments {
    async fn process_payment(&self, charge: &Charge<'_>) -> Result<PaymentReceipt, PaymentError> {
        match self.outcome {
            PaymentOutcome::Approve => {
                let reference = format!("sim_{}", Uuid::new_v4().simple());
                tracing::info!(
                    event_id = %charge.event_id,
                    user_id = %charge.user_id,
                    amount = %charge.amount,
                    card = ?charge.card,
                    %reference,
                    "Simulated payment approved"
                );
                Ok(PaymentReceipt {
                    reference,
                    amount: charge.amount,
                })
            }
            PaymentOutcome::Decline => Err(PaymentError::Declined(
                "the simulated processor declined the charge".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str) -> CardDetails {
        CardDetails {
            card_number: number.to_string(),
            expiry: "12/30".to_string(),
            cvc: "123".to_string(),
        }
    }

    #[test]
    fn test_card_debug_masks_number() {
        let rendered = format!("{:?}", card("4242 4242 4242 4242"));
        assert!(rendered.contains("****4242"));
        assert!(!rendered.contains("4242 4242"));
        assert!(!rendered.contains("123"));
    }

    #[test]
    fn test_outcome_parsing() {
        assert_eq!("Approve".parse::<PaymentOutcome>(), Ok(PaymentOutcome::Approve));
        assert_eq!(" decline ".parse::<PaymentOutcome>(), Ok(PaymentOutcome::Decline));
        assert!("maybe".parse::<PaymentOutcome>().is_err());
    }

    #[tokio::test]
    async fn test_simulated_outcomes() {
        let card = card("4242424242424242");
        let charge = Charge {
            event_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: Decimal::new(6000, 2),
            card: &card,
        };

        let receipt = SimulatedPayments::approving()
            .process_payment(&charge)
            .await
            .unwrap();
        assert_eq!(receipt.amount, Decimal::new(6000, 2));
        assert!(receipt.reference.starts_with("sim_"));

        let err = SimulatedPayments::declining()
            .process_payment(&charge)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Declined(_)));
    }
}
