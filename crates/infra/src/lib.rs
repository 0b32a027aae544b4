//! Infrastructure layer: storage, order lookup, query translation and the
//! return authorization use cases built on top of them.

pub mod orders;
pub mod query;
pub mod service;
pub mod store;

pub use orders::{InMemoryOrderDirectory, OrderDirectory};
pub use query::{Field, Filter, Page, PageLimits, Predicate, QueryTranslator, StoreQuery};
pub use service::{
    NewReturnAuthorization, ReturnAuthorizationChanges, ReturnAuthorizationService, ServiceError,
};
pub use store::{InMemoryReturnAuthorizationStore, ReturnAuthorizationStore, StoreError};
