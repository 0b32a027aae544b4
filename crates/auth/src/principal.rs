use rma_core::UserId;

use crate::{Capability, Role};

/// An authenticated caller, resolved once per request from token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }

    /// Capability of this principal over an order owned by `owner`.
    ///
    /// Guest orders (`owner == None`) are owned by nobody.
    pub fn capability_over(&self, owner: Option<UserId>) -> Capability {
        Capability {
            is_admin: self.is_admin(),
            owns_order: owner == Some(self.user_id),
        }
    }
}
