use super::adjusted_products;
use crate::domain::order::{Order, OrderItem};
use crate::domain::payment::Payment;
use crate::domain::ports::{OrderStore, PaymentStore, ProductStore, UnitOfWork};
use crate::domain::product::Product;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for catalog products.
pub const CF_PRODUCTS: &str = "products";
/// Column Family for order rows.
pub const CF_ORDERS: &str = "orders";
/// Column Family for the line items of each order, keyed by order id.
pub const CF_ORDER_ITEMS: &str = "order_items";
/// Column Family for payments.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping order id to payment id.
pub const CF_PAYMENT_INDEX: &str = "payment_index";
/// Column Family for id sequences.
pub const CF_META: &str = "meta";

const ORDER_SEQ: &[u8] = b"order_seq";
const PAYMENT_SEQ: &[u8] = b"payment_seq";

/// A persistent store implementation using RocksDB.
///
/// Each table lives in its own Column Family. Units of work are written as a
/// single `WriteBatch`, and the read-check-write sequence of a commit runs under
/// `write_lock` so concurrent stock adjustments cannot interleave.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [
            CF_PRODUCTS,
            CF_ORDERS,
            CF_ORDER_ITEMS,
            CF_PAYMENTS,
            CF_PAYMENT_INDEX,
            CF_META,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| OrderError::internal(format!("{name} column family not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = entry?;
            values.push(decode(&value)?);
        }
        Ok(values)
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key, encode(value)?)?;
        Ok(())
    }

    async fn next_in_sequence(&self, key: &[u8]) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_META)?;
        let current = match self.db.get_cf(cf, key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| OrderError::internal("corrupt id sequence"))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(cf, key, next.to_be_bytes())?;
        Ok(next)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| OrderError::internal(format!("Serialization error: {e}")))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| OrderError::internal(format!("Deserialization error: {e}")))
}

#[async_trait]
impl ProductStore for RocksDBStore {
    async fn store(&self, product: Product) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put(CF_PRODUCTS, &product.id.to_be_bytes(), &product)
    }

    async fn get(&self, product_id: u64) -> Result<Option<Product>> {
        self.read(CF_PRODUCTS, &product_id.to_be_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Product>> {
        self.scan(CF_PRODUCTS)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn next_id(&self) -> Result<u64> {
        self.next_in_sequence(ORDER_SEQ).await
    }

    async fn get(&self, order_id: u64) -> Result<Option<Order>> {
        self.read(CF_ORDERS, &order_id.to_be_bytes())
    }

    async fn items(&self, order_id: u64) -> Result<Vec<OrderItem>> {
        Ok(self
            .read(CF_ORDER_ITEMS, &order_id.to_be_bytes())?
            .unwrap_or_default())
    }

    async fn for_user(&self, user_id: u64) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS)?;
        Ok(orders.into_iter().filter(|o| o.user_id == user_id).collect())
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS)
    }

    async fn commit(&self, work: UnitOfWork) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let products =
            adjusted_products(&work, |id| self.read(CF_PRODUCTS, &id.to_be_bytes()))?;

        let mut batch = WriteBatch::default();
        let cf_products = self.cf(CF_PRODUCTS)?;
        for product in &products {
            batch.put_cf(cf_products, product.id.to_be_bytes(), encode(product)?);
        }
        let cf_orders = self.cf(CF_ORDERS)?;
        for order in work.orders() {
            batch.put_cf(cf_orders, order.id.to_be_bytes(), encode(order)?);
        }
        let cf_items = self.cf(CF_ORDER_ITEMS)?;
        for (order_id, items) in work.items() {
            batch.put_cf(cf_items, order_id.to_be_bytes(), encode(items)?);
        }
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn next_id(&self) -> Result<u64> {
        self.next_in_sequence(PAYMENT_SEQ).await
    }

    async fn store(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_PAYMENTS)?,
            payment.id.to_be_bytes(),
            encode(&payment)?,
        );
        batch.put_cf(
            self.cf(CF_PAYMENT_INDEX)?,
            payment.order_id.to_be_bytes(),
            payment.id.to_be_bytes(),
        );
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, payment_id: u64) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, &payment_id.to_be_bytes())
    }

    async fn for_order(&self, order_id: u64) -> Result<Option<Payment>> {
        let cf = self.cf(CF_PAYMENT_INDEX)?;
        let Some(bytes) = self.db.get_cf(cf, order_id.to_be_bytes())? else {
            return Ok(None);
        };
        let raw: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| OrderError::internal("corrupt payment index"))?;
        self.read(CF_PAYMENTS, &raw)
    }
}
