use super::order::Order;
use crate::error::{OrderError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Manager,
    Support,
}

/// A verified caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: u64,
    pub role: Role,
}

/// Turns presented credentials into an [`Identity`]. A caller without a user id is
/// unauthenticated; a missing role defaults to [`Role::User`].
pub fn verify_identity(user_id: Option<u64>, role: Option<Role>) -> Result<Identity> {
    let user_id =
        user_id.ok_or_else(|| OrderError::AuthError("No credentials provided".to_string()))?;
    Ok(Identity {
        user_id,
        role: role.unwrap_or_default(),
    })
}

impl Identity {
    fn owns(&self, order: &Order) -> bool {
        order.user_id == self.user_id
    }

    /// Owner, or staff allowed to look at any order.
    pub fn ensure_can_view(&self, order: &Order) -> Result<()> {
        if self.owns(order) || matches!(self.role, Role::Admin | Role::Manager | Role::Support) {
            Ok(())
        } else {
            Err(self.forbidden(order))
        }
    }

    /// Cancelling or editing an order: owner or admin.
    pub fn ensure_can_modify(&self, order: &Order) -> Result<()> {
        if self.owns(order) || self.role == Role::Admin {
            Ok(())
        } else {
            Err(self.forbidden(order))
        }
    }

    /// Refunds are privileged.
    pub fn ensure_can_refund(&self) -> Result<()> {
        if matches!(self.role, Role::Admin | Role::Manager) {
            Ok(())
        } else {
            Err(OrderError::Forbidden(format!(
                "user {} may not issue refunds",
                self.user_id
            )))
        }
    }

    fn forbidden(&self, order: &Order) -> OrderError {
        OrderError::Forbidden(format!(
            "user {} may not access order {}",
            self.user_id, order.id
        ))
    }
}
