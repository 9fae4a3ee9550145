use super::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        };
        f.write_str(name)
    }
}

/// A charge taken for an order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: u64,
    pub order_id: u64,
    /// Amount originally charged.
    pub amount: Money,
    /// Running total refunded so far, never above `amount`.
    pub refunded: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Money still held by the processor.
    pub fn net_amount(&self) -> Money {
        self.amount.saturating_sub(self.refunded)
    }

    /// Gives back up to `amount`. Over-refunds are clamped to what is still held;
    /// deciding whether a refund is allowed at all is up to the caller.
    pub fn record_refund(&mut self, amount: Money) {
        self.refunded = self
            .refunded
            .checked_add(amount)
            .map_or(self.amount, |refunded| refunded.min(self.amount));
        self.status = PaymentStatus::Refunded;
    }
}
