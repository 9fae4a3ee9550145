use super::money::Money;
use super::order::{Order, OrderItem, order_total};
use super::payment::Payment;
use super::product::Product;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A set of writes that a store must apply all together or not at all.
///
/// Stock adjustments are signed deltas. A store rejects the whole unit with
/// `InsufficientStock` if any product would end below zero, and with `NotFound`
/// if an adjusted product does not exist.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnitOfWork {
    orders: Vec<Order>,
    items: Vec<(u64, Vec<OrderItem>)>,
    stock: BTreeMap<u64, i64>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites an order row.
    pub fn put_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Upserts `order` and replaces all of its lines with `items`. The lines must
    /// belong to the order and add up to its total.
    pub fn put_order_with_items(mut self, order: Order, items: Vec<OrderItem>) -> Result<Self> {
        if items.iter().any(|item| item.order_id != order.id)
            || order_total(order.id, &items)? != order.total()
        {
            return Err(OrderError::internal(format!(
                "lines do not match order {}",
                order.id
            )));
        }
        self.items.push((order.id, items));
        self.orders.push(order);
        Ok(self)
    }

    pub fn adjust_stock(mut self, product_id: u64, delta: i64) -> Self {
        if delta != 0 {
            *self.stock.entry(product_id).or_default() += delta;
        }
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn items(&self) -> &[(u64, Vec<OrderItem>)] {
        &self.items
    }

    /// Net adjustment per product, zero entries dropped.
    pub fn stock_adjustments(&self) -> impl Iterator<Item = (u64, i64)> + '_ {
        self.stock
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(id, delta)| (*id, *delta))
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts or replaces a catalog entry.
    async fn store(&self, product: Product) -> Result<()>;
    async fn get(&self, product_id: u64) -> Result<Option<Product>>;
    async fn get_all(&self) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Allocates a fresh order id.
    async fn next_id(&self) -> Result<u64>;
    async fn get(&self, order_id: u64) -> Result<Option<Order>>;
    async fn items(&self, order_id: u64) -> Result<Vec<OrderItem>>;
    async fn for_user(&self, user_id: u64) -> Result<Vec<Order>>;
    async fn get_all(&self) -> Result<Vec<Order>>;
    async fn commit(&self, work: UnitOfWork) -> Result<()>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn next_id(&self) -> Result<u64>;
    async fn store(&self, payment: Payment) -> Result<()>;
    async fn get(&self, payment_id: u64) -> Result<Option<Payment>>;
    async fn for_order(&self, order_id: u64) -> Result<Option<Payment>>;
}

/// The outside payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` for an order. A declined charge returns
    /// `OrderError::PaymentDeclined` and leaves no payment behind.
    async fn process_payment(
        &self,
        order_id: u64,
        amount: Money,
        currency: &str,
        payment_method: &str,
    ) -> Result<Payment>;

    async fn refund_payment(&self, payment_id: u64, amount: Money) -> Result<Payment>;
}

pub type ProductStoreBox = Box<dyn ProductStore>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
