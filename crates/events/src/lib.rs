//! Domain events shared by the aggregates.

pub mod event;

pub use event::Event;
