use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use orderflow::application::engine::OrderEngine;
use orderflow::application::payment::PaymentSimulator;
use orderflow::config::{DEFAULT_CURRENCY, DEFAULT_SUCCESS_RATE, EngineConfig, SimulatorConfig};
use orderflow::domain::ports::{
    OrderStore, OrderStoreBox, PaymentStore, PaymentStoreBox, ProductStore, ProductStoreBox,
};
use orderflow::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use orderflow::infrastructure::rocksdb::RocksDBStore;
use orderflow::interfaces::csv::catalog_reader::CatalogReader;
use orderflow::interfaces::csv::command_reader::CommandReader;
use orderflow::interfaces::csv::report_writer::ReportWriter;
use orderflow::interfaces::router::{Response, Router};
use orderflow::telemetry::setup_tracing;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Order commands CSV file
    commands: PathBuf,

    /// Product catalog CSV file, loaded before any command runs
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "ORDERFLOW_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Simulated payment processor latency in milliseconds
    #[arg(long, env = "ORDERFLOW_LATENCY_MS", default_value_t = 1000)]
    latency_ms: u64,

    /// Probability that a simulated charge succeeds
    #[arg(long, env = "ORDERFLOW_SUCCESS_RATE", default_value_t = DEFAULT_SUCCESS_RATE)]
    success_rate: f64,

    /// Seed for the simulated processor's random source
    #[arg(long, env = "ORDERFLOW_SEED")]
    seed: Option<u64>,

    /// Currency orders are charged in
    #[arg(long, env = "ORDERFLOW_CURRENCY", default_value = DEFAULT_CURRENCY)]
    currency: String,

    /// Report format written to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            currency: self.currency.clone(),
            payment: SimulatorConfig {
                latency: Duration::from_millis(self.latency_ms),
                success_rate: self.success_rate,
                seed: self.seed,
            },
        }
    }
}

/// One boxed handle per port, all backed by the same store.
struct Stores {
    products: ProductStoreBox,
    orders: OrderStoreBox,
    payments: PaymentStoreBox,
    gateway_payments: PaymentStoreBox,
}

impl Stores {
    fn from_store<S>(store: S) -> Self
    where
        S: ProductStore + OrderStore + PaymentStore + Clone + 'static,
    {
        Self {
            products: Box::new(store.clone()),
            orders: Box::new(store.clone()),
            payments: Box::new(store.clone()),
            gateway_payments: Box::new(store),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    match db_path {
        Some(path) => Ok(Stores::from_store(RocksDBStore::open(path)?)),
        None => Ok(Stores::from_store(InMemoryStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Stores::from_store(InMemoryStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing();

    let config = cli.engine_config();
    let stores = open_stores(cli.db_path.clone())?;
    let gateway = PaymentSimulator::new(stores.gateway_payments, &config.payment)?;
    let engine = Arc::new(
        OrderEngine::new(
            stores.products,
            stores.orders,
            stores.payments,
            Box::new(gateway),
        )
        .with_currency(config.currency),
    );

    if let Some(catalog) = &cli.catalog {
        let file = File::open(catalog).into_diagnostic()?;
        for product in CatalogReader::new(file).products() {
            match product {
                Ok(product) => engine.upsert_product(product).await?,
                Err(e) => warn!("Error reading product: {}", e),
            }
        }
    }

    let router = Router::new(engine.clone());
    let file = File::open(&cli.commands).into_diagnostic()?;
    for request in CommandReader::new(file).requests() {
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                warn!("Error reading command: {}", e);
                continue;
            }
        };
        match router.handle(request).await {
            Ok(Response::Order(details)) => {
                info!(order_id = details.order.id, status = %details.order.status(), "Command processed")
            }
            Ok(Response::Orders(orders)) => info!(count = orders.len(), "Command processed"),
            Err(e) if e.status_code() >= 500 => {
                error!(error = ?e, "Error processing command: {}", e.public_message())
            }
            Err(e) => warn!(status = e.status_code(), "Error processing command: {}", e),
        }
    }

    let (orders, products) = engine.snapshot().await?;
    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    match cli.format {
        OutputFormat::Csv => writer.write_csv(&orders, &products)?,
        OutputFormat::Json => writer.write_json(&orders, &products)?,
    }

    Ok(())
}
