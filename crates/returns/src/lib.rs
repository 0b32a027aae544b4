//! Return authorizations domain module.
//!
//! This crate contains the business rules for return authorizations and the
//! read-only order model they hang off, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod return_authorization;

pub use order::{
    InventoryUnit, InventoryUnitId, InventoryUnitState, Order, OrderId, Shipment, StockLocationId,
    VariantId,
};
pub use return_authorization::{
    AddVariant, Amend, Amended, AssociatedUnit, Authorize, Authorized, Cancel, Canceled, Receive,
    Received, ReturnAuthorization, ReturnAuthorizationCommand, ReturnAuthorizationEvent,
    ReturnAuthorizationId, ReturnAuthorizationState, Transition, UnitsAssociated, UnitsReleased,
};
