//! Access rules for an order's return authorizations.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy check)

use serde::Serialize;
use thiserror::Error;

/// What the caller may do, computed once per request.
///
/// `owns_order` compares the caller with the order's owning user; it is never
/// true for guest orders.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub is_admin: bool,
    pub owns_order: bool,
}

/// Operations on an order's return authorizations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Index,
    Show,
    Create,
    Update,
    Destroy,
    Add,
    Receive,
    Cancel,
}

impl Action {
    pub fn is_read(self) -> bool {
        matches!(self, Action::Index | Action::Show)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Index => "index",
            Action::Show => "show",
            Action::Create => "create",
            Action::Update => "update",
            Action::Destroy => "destroy",
            Action::Add => "add",
            Action::Receive => "receive",
            Action::Cancel => "cancel",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("unauthorized")]
    Unauthorized,

    /// Reported to order owners attempting writes, so the response is the same
    /// whether or not the record exists.
    #[error("not found")]
    NotFound,
}

/// Decide whether `capability` permits `action`.
///
/// | caller | reads | writes |
/// |---|---|---|
/// | admin | allowed | allowed |
/// | order owner | `Unauthorized` | `NotFound` |
/// | anyone else | `Unauthorized` | `Unauthorized` |
pub fn authorize(capability: Capability, action: Action) -> Result<(), AccessDenied> {
    if capability.is_admin {
        return Ok(());
    }

    if capability.owns_order && !action.is_read() {
        return Err(AccessDenied::NotFound);
    }

    Err(AccessDenied::Unauthorized)
}
