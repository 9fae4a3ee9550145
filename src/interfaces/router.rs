//! The route layer: authenticates the caller, applies role rules, and hands the
//! request to the engine.

use crate::application::engine::OrderEngine;
use crate::domain::auth::{Role, verify_identity};
use crate::domain::order::{OrderDetails, OrderLine};
use crate::error::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateOrder {
        lines: Vec<OrderLine>,
        payment_method: String,
    },
    CancelOrder {
        order_id: u64,
    },
    RefundOrder {
        order_id: u64,
        amount: Decimal,
    },
    UpdateOrderItems {
        order_id: u64,
        lines: Vec<OrderLine>,
    },
    GetOrder {
        order_id: u64,
    },
    ListOrders,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateOrder { .. } => "create",
            Command::CancelOrder { .. } => "cancel",
            Command::RefundOrder { .. } => "refund",
            Command::UpdateOrderItems { .. } => "update",
            Command::GetOrder { .. } => "get",
            Command::ListOrders => "list",
        }
    }
}

/// A command together with the caller's unverified credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub user: Option<u64>,
    pub role: Option<Role>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Order(OrderDetails),
    Orders(Vec<OrderDetails>),
}

pub struct Router {
    engine: Arc<OrderEngine>,
}

impl Router {
    pub fn new(engine: Arc<OrderEngine>) -> Self {
        Self { engine }
    }

    #[instrument(skip(self, request), fields(op = request.command.name(), user = request.user))]
    pub async fn handle(&self, request: Request) -> Result<Response> {
        let identity = verify_identity(request.user, request.role)?;

        match request.command {
            Command::CreateOrder {
                lines,
                payment_method,
            } => self
                .engine
                .create_order(identity.user_id, lines, &payment_method)
                .await
                .map(Response::Order),
            Command::ListOrders => self
                .engine
                .get_user_orders(identity.user_id)
                .await
                .map(Response::Orders),
            Command::GetOrder { order_id } => {
                let details = self.engine.get_order_by_id(order_id).await?;
                identity.ensure_can_view(&details.order)?;
                Ok(Response::Order(details))
            }
            Command::CancelOrder { order_id } => {
                let details = self.engine.get_order_by_id(order_id).await?;
                identity.ensure_can_modify(&details.order)?;
                self.engine
                    .cancel_order(order_id)
                    .await
                    .map(Response::Order)
            }
            Command::UpdateOrderItems { order_id, lines } => {
                let details = self.engine.get_order_by_id(order_id).await?;
                identity.ensure_can_modify(&details.order)?;
                self.engine
                    .update_order_items(order_id, lines)
                    .await
                    .map(Response::Order)
            }
            Command::RefundOrder { order_id, amount } => {
                identity.ensure_can_refund()?;
                self.engine
                    .refund_order(order_id, amount)
                    .await
                    .map(Response::Order)
            }
        }
    }
}
