use super::adjusted_products;
use crate::domain::order::{Order, OrderItem};
use crate::domain::payment::Payment;
use crate::domain::ports::{OrderStore, PaymentStore, ProductStore, UnitOfWork};
use crate::domain::product::Product;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    products: HashMap<u64, Product>,
    orders: HashMap<u64, Order>,
    items: HashMap<u64, Vec<OrderItem>>,
    payments: HashMap<u64, Payment>,
    payment_by_order: HashMap<u64, u64>,
    last_order_id: u64,
    last_payment_id: u64,
}

/// A thread-safe in-memory store for products, orders and payments.
///
/// All tables sit behind one `Arc<RwLock<_>>`, so a commit holds the write lock
/// across its check and its writes. Clones share the same tables, which is how
/// one store backs every port.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn store(&self, product: Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id, product);
        Ok(())
    }

    async fn get(&self, product_id: u64) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.get(&product_id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by_key(|p| p.id);
        Ok(products)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn next_id(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.last_order_id += 1;
        Ok(tables.last_order_id)
    }

    async fn get(&self, order_id: u64) -> Result<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.get(&order_id).cloned())
    }

    async fn items(&self, order_id: u64) -> Result<Vec<OrderItem>> {
        let tables = self.tables.read().await;
        Ok(tables.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn for_user(&self, user_id: u64) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn commit(&self, work: UnitOfWork) -> Result<()> {
        let mut tables = self.tables.write().await;
        let products = adjusted_products(&work, |id| Ok(tables.products.get(&id).cloned()))?;

        for product in products {
            tables.products.insert(product.id, product);
        }
        for order in work.orders() {
            tables.orders.insert(order.id, order.clone());
        }
        for (order_id, items) in work.items() {
            tables.items.insert(*order_id, items.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn next_id(&self) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.last_payment_id += 1;
        Ok(tables.last_payment_id)
    }

    async fn store(&self, payment: Payment) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.payment_by_order.insert(payment.order_id, payment.id);
        tables.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, payment_id: u64) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&payment_id).cloned())
    }

    async fn for_order(&self, order_id: u64) -> Result<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payment_by_order
            .get(&order_id)
            .and_then(|id| tables.payments.get(id))
            .cloned())
    }
}
