use crate::domain::money::Money;
use crate::domain::order::Order;
use crate::domain::product::Product;
use crate::error::{OrderError, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct OrderRow {
    order: u64,
    user: u64,
    status: String,
    total: String,
    refunded: String,
}

#[derive(Serialize)]
struct ProductRow<'a> {
    product: u64,
    name: &'a str,
    price: String,
    stock: u32,
}

#[derive(Serialize)]
struct Report<'a> {
    orders: &'a [Order],
    products: &'a [Product],
}

/// Writes the final order and stock state.
pub struct ReportWriter<W: Write> {
    inner: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes the orders table, a blank line, then the products table.
    pub fn write_csv(&mut self, orders: &[Order], products: &[Product]) -> Result<()> {
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut self.inner);
            writer.write_record(["order", "user", "status", "total", "refunded"])?;
            for order in orders {
                writer.serialize(OrderRow {
                    order: order.id,
                    user: order.user_id,
                    status: order.status().to_string(),
                    total: order.total().to_string(),
                    refunded: order.refund_amount.unwrap_or(Money::ZERO).to_string(),
                })?;
            }
            writer.flush()?;
        }
        writeln!(self.inner)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut self.inner);
            writer.write_record(["product", "name", "price", "stock"])?;
            for product in products {
                writer.serialize(ProductRow {
                    product: product.id,
                    name: &product.name,
                    price: product.price.to_string(),
                    stock: product.stock,
                })?;
            }
            writer.flush()?;
        }
        Ok(())
    }

    pub fn write_json(&mut self, orders: &[Order], products: &[Product]) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.inner, &Report { orders, products })
            .map_err(|e| OrderError::internal(format!("JSON encoding error: {e}")))?;
        writeln!(self.inner)?;
        Ok(())
    }
}
