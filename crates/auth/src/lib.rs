//! `rma-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AccessDenied, Action, Capability};
pub use claims::{validate_claims, Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError};
pub use principal::Principal;
pub use roles::Role;
