use super::money::Money;
use serde::{Deserialize, Serialize};

/// A catalog product and its available stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl Product {
    pub fn new(id: u64, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            stock,
        }
    }

    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Stock after applying a signed adjustment, or `None` if it would go negative
    /// or overflow.
    pub fn adjusted_stock(&self, delta: i64) -> Option<u32> {
        let next = i64::from(self.stock).checked_add(delta)?;
        u32::try_from(next).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_adjusted_stock() {
        let product = Product::new(1, "Widget", Money::new(dec!(10)), 5);
        assert_eq!(product.adjusted_stock(-5), Some(0));
        assert_eq!(product.adjusted_stock(3), Some(8));
        assert_eq!(product.adjusted_stock(-6), None);
        assert!(product.has_stock(5));
        assert!(!product.has_stock(6));
    }
}
