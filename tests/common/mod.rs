#![allow(dead_code)]

use orderflow::application::engine::OrderEngine;
use orderflow::application::payment::PaymentSimulator;
use orderflow::config::SimulatorConfig;
use orderflow::domain::money::Money;
use orderflow::domain::order::{Order, OrderItem};
use orderflow::domain::ports::{OrderStore, PaymentGatewayBox, UnitOfWork};
use orderflow::domain::product::Product;
use orderflow::infrastructure::in_memory::InMemoryStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::time::Duration;

pub fn simulator_config(success_rate: f64, latency: Duration) -> SimulatorConfig {
    SimulatorConfig {
        latency,
        success_rate,
        seed: Some(7),
    }
}

pub fn simulator(store: &InMemoryStore, config: &SimulatorConfig) -> PaymentSimulator {
    PaymentSimulator::new(Box::new(store.clone()), config).unwrap()
}

/// An engine over one shared in-memory store, charging through `gateway`.
pub fn engine_with_gateway(store: &InMemoryStore, gateway: PaymentGatewayBox) -> OrderEngine {
    OrderEngine::new(
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(store.clone()),
        gateway,
    )
}

/// An engine whose simulated processor answers instantly.
pub fn engine(success_rate: f64) -> (OrderEngine, InMemoryStore) {
    let store = InMemoryStore::new();
    let gateway = simulator(&store, &simulator_config(success_rate, Duration::ZERO));
    (engine_with_gateway(&store, Box::new(gateway)), store)
}

pub async fn add_product(engine: &OrderEngine, id: u64, price: Decimal, stock: u32) {
    engine
        .upsert_product(Product::new(id, format!("Product {id}"), Money::new(price), stock))
        .await
        .unwrap();
}

pub async fn stock_of(engine: &OrderEngine, id: u64) -> u32 {
    let (_, products) = engine.snapshot().await.unwrap();
    products.into_iter().find(|p| p.id == id).unwrap().stock
}

/// Writes an order straight into the store as `PENDING`, without charging or
/// touching stock, the way it sits while its payment is still in flight.
pub async fn seed_pending_order(
    store: &InMemoryStore,
    user_id: u64,
    lines: &[(u64, u32, Decimal)],
) -> u64 {
    let order_id = OrderStore::next_id(store).await.unwrap();
    let items: Vec<OrderItem> = lines
        .iter()
        .map(|&(product_id, quantity, price)| OrderItem {
            order_id,
            product_id,
            quantity,
            price: Money::new(price),
        })
        .collect();
    let order = Order::new(order_id, user_id, &items, chrono::Utc::now()).unwrap();
    store
        .commit(UnitOfWork::new().put_order_with_items(order, items).unwrap())
        .await
        .unwrap();
    order_id
}

pub fn write_csv(path: &Path, header: &[&str], rows: &[&[&str]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(file);

    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(*row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub const CATALOG_HEADER: &[&str] = &["product", "name", "price", "stock"];
pub const COMMAND_HEADER: &[&str] = &["op", "user", "role", "order", "items", "amount", "method"];
