use crate::domain::order::OrderStatus;
use miette::Diagnostic;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Product,
    Order,
    Payment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Product => f.write_str("Product"),
            Entity::Order => f.write_str("Order"),
            Entity::Payment => f.write_str("Payment"),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum OrderError {
    #[error("{entity} with id {id} not found")]
    #[diagnostic(code(orderflow::not_found))]
    NotFound { entity: Entity, id: u64 },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    #[diagnostic(code(orderflow::insufficient_stock))]
    InsufficientStock {
        product_id: u64,
        requested: u64,
        available: u64,
    },

    #[error("Order {order_id} cannot be {action} while {status}")]
    #[diagnostic(code(orderflow::invalid_state))]
    InvalidState {
        order_id: u64,
        status: OrderStatus,
        action: &'static str,
    },

    #[error("Refund of {requested} exceeds the refundable {refundable} on order {order_id}")]
    #[diagnostic(code(orderflow::invalid_amount))]
    InvalidAmount {
        order_id: u64,
        requested: Decimal,
        refundable: Decimal,
    },

    #[error("Payment processing failed for order {order_id}")]
    #[diagnostic(code(orderflow::payment_failed))]
    PaymentFailed { order_id: u64 },

    #[error("Payment declined: {0}")]
    #[diagnostic(code(orderflow::payment_declined))]
    PaymentDeclined(String),

    #[error("Validation error: {0}")]
    #[diagnostic(code(orderflow::validation))]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    #[diagnostic(code(orderflow::auth))]
    AuthError(String),

    #[error("Forbidden: {0}")]
    #[diagnostic(code(orderflow::forbidden))]
    Forbidden(String),

    #[error("CSV error: {0}")]
    #[diagnostic(code(orderflow::csv))]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(orderflow::io))]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(orderflow::internal))]
    InternalError(Box<dyn std::error::Error + Send + Sync>),

    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    #[diagnostic(code(orderflow::storage))]
    StorageError(#[from] rocksdb::Error),
}

impl OrderError {
    /// HTTP-style status code the route layer reports for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            OrderError::NotFound { .. } => 404,
            OrderError::InsufficientStock { .. }
            | OrderError::InvalidState { .. }
            | OrderError::InvalidAmount { .. }
            | OrderError::PaymentFailed { .. }
            | OrderError::PaymentDeclined(_)
            | OrderError::ValidationError(_) => 400,
            OrderError::AuthError(_) => 401,
            OrderError::Forbidden(_) => 403,
            _ => 500,
        }
    }

    /// Message safe to hand back to a caller. Server-side failures are reported
    /// generically; their detail belongs in the logs.
    pub fn public_message(&self) -> String {
        if self.status_code() >= 500 {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        OrderError::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
