//! Aggregates: decide with `handle`, evolve with `apply`.

use crate::error::{DomainError, DomainResult};

/// Identity and version of a persisted record.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied since creation.
    fn version(&self) -> u64;
}

/// Version a writer loaded; a save succeeds only if the stored record is
/// still at it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedVersion(u64);

impl ExpectedVersion {
    pub fn at(version: u64) -> Self {
        Self(version)
    }

    pub fn check(self, stored: u64) -> DomainResult<()> {
        if self.0 == stored {
            return Ok(());
        }
        Err(DomainError::conflict(format!(
            "stale write: loaded version {}, stored version {stored}",
            self.0
        )))
    }
}

/// A record whose changes are decided from commands and recorded as events.
///
/// `handle` must not touch state or perform IO; `apply` bumps the version by
/// one per event.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
