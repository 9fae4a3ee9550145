//! Store adapters for the domain ports.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::ports::UnitOfWork;
use crate::domain::product::Product;
use crate::error::{Entity, OrderError, Result};

/// Applies the stock adjustments of `work` to the products returned by `lookup`.
///
/// Every product is checked before anything is returned, so an error means no
/// adjustment may be written.
pub(crate) fn adjusted_products(
    work: &UnitOfWork,
    mut lookup: impl FnMut(u64) -> Result<Option<Product>>,
) -> Result<Vec<Product>> {
    let mut updated = Vec::new();
    for (product_id, delta) in work.stock_adjustments() {
        let mut product = lookup(product_id)?.ok_or(OrderError::NotFound {
            entity: Entity::Product,
            id: product_id,
        })?;
        product.stock =
            product
                .adjusted_stock(delta)
                .ok_or_else(|| OrderError::InsufficientStock {
                    product_id,
                    requested: delta.unsigned_abs(),
                    available: u64::from(product.stock),
                })?;
        updated.push(product);
    }
    Ok(updated)
}
