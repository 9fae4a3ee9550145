//! Domain model: value objects, entities, the order lifecycle and the ports the
//! application layer talks to.

pub mod auth;
pub mod clock;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod product;
