use chrono::{DateTime, Utc};

/// Fact emitted by an aggregate's `handle` and folded in by `apply`.
///
/// `event_type` is the name logged when an event is committed; it must not
/// change once released. Payload changes bump `version` instead.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted `<module>.<aggregate>.<fact>` name, e.g. `returns.authorization.received`.
    fn event_type(&self) -> &'static str;

    /// Payload schema version, starting at 1.
    fn version(&self) -> u32;

    /// Business time of the fact.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// `event_type` with its schema version, e.g. `returns.authorization.received@1`.
    fn qualified_type(&self) -> String {
        format!("{}@{}", self.event_type(), self.version())
    }
}
