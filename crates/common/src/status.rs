//! Downstream resource status enums.
//!
//! Wire values are the SCREAMING_CASE strings the downstream services use.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a rental record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    /// Rental is active.
    InProgress,
    /// Rental finished normally.
    Finished,
    /// Rental was canceled.
    Canceled,
}

/// Status of a payment as reported by the payment service, plus the
/// `Unknown` placeholder the gateway synthesizes when the payment service
/// cannot be reached during a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Canceled,
    Unknown,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::InProgress => "IN_PROGRESS",
            RentalStatus::Finished => "FINISHED",
            RentalStatus::Canceled => "CANCELED",
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Canceled => "CANCELED",
            PaymentStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rental_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&RentalStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        let back: RentalStatus = serde_json::from_str("\"CANCELED\"").unwrap();
        assert_eq!(back, RentalStatus::Canceled);
    }

    #[test]
    fn payment_status_wire_format() {
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"PAID\"");
        let back: PaymentStatus = serde_json::from_str("\"UNKNOWN\"").unwrap();
        assert_eq!(back, PaymentStatus::Unknown);
    }

    #[test]
    fn display_matches_wire_value() {
        assert_eq!(RentalStatus::Finished.to_string(), "FINISHED");
        assert_eq!(PaymentStatus::Canceled.to_string(), "CANCELED");
    }
}
