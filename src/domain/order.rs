use super::money::{Amount, Money};
use super::payment::Payment;
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of an order.
///
/// ```text
/// PENDING ──► PAID ──► CANCELLED
///    │  └───────────────►┘
///    └──► PAYMENT_FAILED
/// (any) ──► REFUNDED
/// ```
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    PaymentFailed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, PaymentFailed)
                | (Pending, Cancelled)
                | (Paid, Cancelled)
                | (_, Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::PaymentFailed => "PAYMENT_FAILED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        };
        f.write_str(name)
    }
}

/// A customer order.
///
/// `status`, `total` and `stock_consumed` are only reachable through their
/// getters. Status changes through the transition methods below, which enforce the
/// lifecycle, and the total is always derived from the order's lines.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: u64,
    pub user_id: u64,
    status: OrderStatus,
    /// Sum of the line items' snapshotted `price * quantity`.
    total: Money,
    /// Whether stock was decremented for this order and has not been restored.
    stock_consumed: bool,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<Money>,
}

impl Order {
    /// A `PENDING` order totalling `items`.
    pub fn new(
        id: u64,
        user_id: u64,
        items: &[OrderItem],
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id,
            user_id,
            status: OrderStatus::Pending,
            total: order_total(id, items)?,
            stock_consumed: false,
            created_at,
            cancelled_at: None,
            refunded_at: None,
            refund_amount: None,
        })
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn stock_consumed(&self) -> bool {
        self.stock_consumed
    }

    fn transition_to(&mut self, next: OrderStatus, action: &'static str) -> Result<()> {
        if self.status.can_transition_to(next) {
            self.status = next;
            Ok(())
        } else {
            Err(OrderError::InvalidState {
                order_id: self.id,
                status: self.status,
                action,
            })
        }
    }

    /// Payment settled and stock was taken.
    pub fn mark_paid(&mut self) -> Result<()> {
        self.transition_to(OrderStatus::Paid, "paid")?;
        self.stock_consumed = true;
        Ok(())
    }

    pub fn mark_payment_failed(&mut self) -> Result<()> {
        self.transition_to(OrderStatus::PaymentFailed, "failed")
    }

    /// Cancels the order. Returns `true` when stock had been consumed and must be
    /// given back by the caller.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<bool> {
        self.transition_to(OrderStatus::Cancelled, "cancelled")?;
        self.cancelled_at = Some(at);
        Ok(std::mem::take(&mut self.stock_consumed))
    }

    /// Money that can still be refunded administratively.
    pub fn refundable(&self) -> Money {
        self.total
            .saturating_sub(self.refund_amount.unwrap_or(Money::ZERO))
    }

    /// Records an administrative refund. Refunds accumulate and may never exceed
    /// the order total; on rejection the order is left untouched.
    pub fn record_refund(&mut self, amount: Amount, at: DateTime<Utc>) -> Result<()> {
        let requested = Money::from(amount);
        let refundable = self.refundable();
        if requested > refundable {
            return Err(OrderError::InvalidAmount {
                order_id: self.id,
                requested: requested.value(),
                refundable: refundable.value(),
            });
        }
        let refunded = self
            .refund_amount
            .unwrap_or(Money::ZERO)
            .checked_add(requested)
            .ok_or_else(|| OrderError::internal("refund total overflowed"))?;
        self.transition_to(OrderStatus::Refunded, "refunded")?;
        self.refunded_at = Some(at);
        self.refund_amount = Some(refunded);
        Ok(())
    }

    /// Swaps in a new set of lines for a `PENDING` order and retotals it. On error
    /// the order is left untouched.
    pub fn reprice(&mut self, items: &[OrderItem]) -> Result<()> {
        self.ensure_editable()?;
        self.total = order_total(self.id, items)?;
        Ok(())
    }

    /// Items and total may only change before payment settles.
    pub fn ensure_editable(&self) -> Result<()> {
        if self.status == OrderStatus::Pending {
            Ok(())
        } else {
            Err(OrderError::InvalidState {
                order_id: self.id,
                status: self.status,
                action: "modified",
            })
        }
    }
}

/// One line of an order, with the product price captured when the line was
/// written.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderItem {
    pub order_id: u64,
    pub product_id: u64,
    pub quantity: u32,
    pub price: Money,
}

impl OrderItem {
    /// `price * quantity`, or `None` if it does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

/// Sum of `price * quantity` over `items`. A total too large to represent is a
/// `ValidationError`.
pub fn order_total(order_id: u64, items: &[OrderItem]) -> Result<Money> {
    items
        .iter()
        .map(OrderItem::line_total)
        .try_fold(Money::ZERO, |total, line| total.checked_add(line?))
        .ok_or_else(|| {
            OrderError::ValidationError(format!("Total of order {order_id} is too large"))
        })
}

/// A requested `(product, quantity)` pair, before pricing.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct OrderLine {
    pub product_id: u64,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: u64, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Validates requested lines and merges repeated products into a single line.
pub fn normalize_lines(lines: impl IntoIterator<Item = OrderLine>) -> Result<Vec<OrderLine>> {
    let mut merged: BTreeMap<u64, u32> = BTreeMap::new();
    for line in lines {
        if line.quantity == 0 {
            return Err(OrderError::ValidationError(format!(
                "Quantity for product {} must be positive",
                line.product_id
            )));
        }
        let quantity = merged.entry(line.product_id).or_default();
        *quantity = quantity.checked_add(line.quantity).ok_or_else(|| {
            OrderError::ValidationError(format!(
                "Quantity for product {} is too large",
                line.product_id
            ))
        })?;
    }
    if merged.is_empty() {
        return Err(OrderError::ValidationError(
            "An order needs at least one item".to_string(),
        ));
    }
    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| OrderLine::new(product_id, quantity))
        .collect())
}

/// Read projection of an order with its lines and payment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

impl OrderDetails {
    pub fn items_total(&self) -> Result<Money> {
        order_total(self.order.id, &self.items)
    }
}
