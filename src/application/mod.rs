//! Application layer containing the order workflow orchestration.
//!
//! `OrderEngine` is the entry point for placing, cancelling, refunding and editing
//! orders. `PaymentSimulator` stands in for the payment processor it calls.

pub mod engine;
pub mod locks;
pub mod payment;
