use super::locks::OrderLocks;
use crate::config::DEFAULT_CURRENCY;
use crate::domain::clock::{ClockRef, SystemClock};
use crate::domain::money::{Amount, Money};
use crate::domain::order::{Order, OrderDetails, OrderItem, OrderLine, normalize_lines};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{
    OrderStoreBox, PaymentGatewayBox, PaymentStoreBox, ProductStoreBox, UnitOfWork,
};
use crate::domain::product::Product;
use crate::error::{Entity, OrderError, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{Span, error, info, instrument, warn};

/// Orchestrates the order lifecycle: placement, payment, cancellation, refunds
/// and item edits.
///
/// Every mutating operation holds the order's lock from its first read to its
/// last write, and every group of writes goes to the store as one `UnitOfWork`.
/// Payment settlement is a separate commit from order placement, so a `PENDING`
/// order is visible to readers while its charge is in flight.
pub struct OrderEngine {
    products: ProductStoreBox,
    orders: OrderStoreBox,
    payments: PaymentStoreBox,
    gateway: PaymentGatewayBox,
    clock: ClockRef,
    locks: OrderLocks,
    currency: String,
}

impl OrderEngine {
    /// Creates a new `OrderEngine` charging in the default currency.
    ///
    /// # Arguments
    ///
    /// * `products` - Catalog and stock levels.
    /// * `orders` - Orders, their line items, and atomic commits.
    /// * `payments` - Read access to the payments the gateway records.
    /// * `gateway` - The payment processor.
    pub fn new(
        products: ProductStoreBox,
        orders: OrderStoreBox,
        payments: PaymentStoreBox,
        gateway: PaymentGatewayBox,
    ) -> Self {
        Self {
            products,
            orders,
            payments,
            gateway,
            clock: Arc::new(SystemClock),
            locks: OrderLocks::new(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Inserts or replaces a catalog product.
    pub async fn upsert_product(&self, product: Product) -> Result<()> {
        self.products.store(product).await
    }

    /// Places an order and charges for it.
    ///
    /// The order and its lines are written as `PENDING` first. A declined charge
    /// leaves the order in `PAYMENT_FAILED` and returns `PaymentFailed`; stock is
    /// only taken once the charge succeeds. If the stock ran out while the charge
    /// was in flight, the charge is refunded, the order cancelled, and
    /// `InsufficientStock` returned.
    #[instrument(skip(self, lines, payment_method), fields(order_id))]
    pub async fn create_order(
        &self,
        user_id: u64,
        lines: Vec<OrderLine>,
        payment_method: &str,
    ) -> Result<OrderDetails> {
        let lines = normalize_lines(lines)?;
        if payment_method.trim().is_empty() {
            return Err(OrderError::ValidationError(
                "A payment method is required".to_string(),
            ));
        }

        let products = self.load_products(&lines).await?;
        for (line, product) in lines.iter().zip(&products) {
            if !product.has_stock(line.quantity) {
                return Err(OrderError::InsufficientStock {
                    product_id: product.id,
                    requested: u64::from(line.quantity),
                    available: u64::from(product.stock),
                });
            }
        }

        let order_id = self.orders.next_id().await?;
        Span::current().record("order_id", order_id);
        let _guard = self.locks.acquire(order_id).await;

        let items = price_lines(order_id, &lines, &products);
        let mut order = Order::new(order_id, user_id, &items, self.clock.now())?;
        let total = order.total();
        self.orders
            .commit(UnitOfWork::new().put_order_with_items(order.clone(), items.clone())?)
            .await?;
        info!(user_id, %total, "Order placed, awaiting payment");

        let payment = match self
            .gateway
            .process_payment(order_id, total, &self.currency, payment_method)
            .await
        {
            Ok(payment) => payment,
            Err(err) => {
                warn!(error = %err, "Payment failed");
                order.mark_payment_failed()?;
                self.orders
                    .commit(UnitOfWork::new().put_order(order))
                    .await?;
                return Err(OrderError::PaymentFailed { order_id });
            }
        };

        let mut paid = order.clone();
        paid.mark_paid()?;
        let settle = items.iter().fold(
            UnitOfWork::new().put_order(paid.clone()),
            |work, item| work.adjust_stock(item.product_id, -i64::from(item.quantity)),
        );

        match self.orders.commit(settle).await {
            Ok(()) => {
                info!(payment_id = payment.id, "Order created and paid successfully");
                Ok(OrderDetails {
                    order: paid,
                    items,
                    payment: Some(payment),
                })
            }
            Err(err @ OrderError::InsufficientStock { .. }) => {
                warn!(error = %err, "Stock ran out while payment was in flight, reversing charge");
                if let Err(refund_err) = self
                    .gateway
                    .refund_payment(payment.id, payment.net_amount())
                    .await
                {
                    error!(
                        error = %refund_err,
                        payment_id = payment.id,
                        "Charge could not be reversed, order left PENDING with a completed payment"
                    );
                    return Err(refund_err);
                }
                order.cancel(self.clock.now())?;
                self.orders
                    .commit(UnitOfWork::new().put_order(order))
                    .await?;
                Err(err)
            }
            Err(err) => {
                error!(error = %err, payment_id = payment.id, "Paid order could not be settled");
                Err(err)
            }
        }
    }

    /// Cancels a `PENDING` or `PAID` order, refunding a completed payment in full
    /// and giving back stock if (and only if) the order consumed any.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: u64) -> Result<OrderDetails> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load_order(order_id).await?;
        let restore_stock = order.cancel(self.clock.now())?;
        let items = self.orders.items(order_id).await?;

        let payment = match self.payments.for_order(order_id).await? {
            Some(payment) if payment.status == PaymentStatus::Completed => Some(
                self.gateway
                    .refund_payment(payment.id, payment.net_amount())
                    .await?,
            ),
            other => other,
        };

        let mut work = UnitOfWork::new().put_order(order.clone());
        if restore_stock {
            for item in &items {
                work = work.adjust_stock(item.product_id, i64::from(item.quantity));
            }
        }
        self.orders.commit(work).await?;

        info!(restore_stock, "Order cancelled successfully");
        Ok(OrderDetails {
            order,
            items,
            payment,
        })
    }

    /// Administrative refund of part or all of an order's total. Refunds add up
    /// and may never exceed the total. Stock is left alone.
    #[instrument(skip(self))]
    pub async fn refund_order(&self, order_id: u64, amount: Decimal) -> Result<OrderDetails> {
        let amount = Amount::new(amount)?;
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load_order(order_id).await?;
        order.record_refund(amount, self.clock.now())?;

        let payment = match self.payments.for_order(order_id).await? {
            Some(payment) if payment.net_amount() > Money::ZERO => {
                let give_back = Money::from(amount).min(payment.net_amount());
                Some(self.gateway.refund_payment(payment.id, give_back).await?)
            }
            other => other,
        };

        self.orders
            .commit(UnitOfWork::new().put_order(order.clone()))
            .await?;
        let items = self.orders.items(order_id).await?;

        info!(amount = %amount.value(), "Order refunded");
        Ok(OrderDetails {
            order,
            items,
            payment,
        })
    }

    /// Replaces the lines of a `PENDING` order, repricing them at current prices.
    ///
    /// Stock moves by exactly `old - new` per product. A change that would take
    /// any product below zero is rejected as a whole.
    #[instrument(skip(self, lines))]
    pub async fn update_order_items(
        &self,
        order_id: u64,
        lines: Vec<OrderLine>,
    ) -> Result<OrderDetails> {
        let lines = normalize_lines(lines)?;
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load_order(order_id).await?;
        order.ensure_editable()?;

        let products = self.load_products(&lines).await?;
        let old_items = self.orders.items(order_id).await?;
        let items = price_lines(order_id, &lines, &products);
        order.reprice(&items)?;

        let mut deltas: BTreeMap<u64, i64> = BTreeMap::new();
        for item in &old_items {
            *deltas.entry(item.product_id).or_default() += i64::from(item.quantity);
        }
        for item in &items {
            *deltas.entry(item.product_id).or_default() -= i64::from(item.quantity);
        }
        let work = deltas.into_iter().fold(
            UnitOfWork::new().put_order_with_items(order.clone(), items.clone())?,
            |work, (product_id, delta)| work.adjust_stock(product_id, delta),
        );
        self.orders.commit(work).await?;

        let payment = self.payments.for_order(order_id).await?;
        info!(total = %order.total(), "Order items updated");
        Ok(OrderDetails {
            order,
            items,
            payment,
        })
    }

    pub async fn get_order_by_id(&self, order_id: u64) -> Result<OrderDetails> {
        let order = self.load_order(order_id).await?;
        self.details(order).await
    }

    /// A user's orders, newest first.
    pub async fn get_user_orders(&self, user_id: u64) -> Result<Vec<OrderDetails>> {
        let mut orders = self.orders.for_user(user_id).await?;
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            details.push(self.details(order).await?);
        }
        Ok(details)
    }

    /// Every order and product, ordered by id.
    pub async fn snapshot(&self) -> Result<(Vec<Order>, Vec<Product>)> {
        let mut orders = self.orders.get_all().await?;
        orders.sort_by_key(|o| o.id);
        let mut products = self.products.get_all().await?;
        products.sort_by_key(|p| p.id);
        Ok((orders, products))
    }

    async fn details(&self, order: Order) -> Result<OrderDetails> {
        let items = self.orders.items(order.id).await?;
        let payment = self.payments.for_order(order.id).await?;
        Ok(OrderDetails {
            order,
            items,
            payment,
        })
    }

    async fn load_order(&self, order_id: u64) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(OrderError::NotFound {
                entity: Entity::Order,
                id: order_id,
            })
    }

    async fn load_products(&self, lines: &[OrderLine]) -> Result<Vec<Product>> {
        let mut products = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self
                .products
                .get(line.product_id)
                .await?
                .ok_or(OrderError::NotFound {
                    entity: Entity::Product,
                    id: line.product_id,
                })?;
            products.push(product);
        }
        Ok(products)
    }
}

/// Snapshots each product's current price into an order line.
fn price_lines(order_id: u64, lines: &[OrderLine], products: &[Product]) -> Vec<OrderItem> {
    lines
        .iter()
        .zip(products)
        .map(|(line, product)| OrderItem {
            order_id,
            product_id: line.product_id,
            quantity: line.quantity,
            price: product.price,
        })
        .collect()
}
