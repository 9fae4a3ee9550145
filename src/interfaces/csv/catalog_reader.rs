use crate::domain::money::{Amount, Money};
use crate::domain::product::Product;
use crate::error::{OrderError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    product: u64,
    name: String,
    price: Decimal,
    stock: u32,
}

impl TryFrom<CatalogRecord> for Product {
    type Error = OrderError;

    fn try_from(record: CatalogRecord) -> Result<Self> {
        let price = Amount::new(record.price).map_err(|_| {
            OrderError::ValidationError(format!(
                "Price of product {} must be positive",
                record.product
            ))
        })?;
        Ok(Product::new(
            record.product,
            record.name,
            Money::from(price),
            record.stock,
        ))
    }
}

/// Reads catalog products (`product, name, price, stock`) from a CSV source.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn products(self) -> impl Iterator<Item = Result<Product>> {
        self.reader
            .into_deserialize::<CatalogRecord>()
            .map(|record| Product::try_from(record?))
    }
}
