//! Store lifecycle events
//!
//! Observers registered with [`Store::observe`](crate::Store::observe) are
//! invoked synchronously, immediately after the underlying storage mutation
//! succeeds. There is no queue and no process-wide bus; delivery is scoped
//! to the store instance.

use crate::record::RecordRef;

/// An event fired by the store.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The backing database was opened
    Opened,
    /// The backing database was closed
    Closed,
    /// Any successful write (fired after the more specific event)
    Changed,
    /// A record was created and saved
    Created(RecordRef),
    /// A record's row was updated
    Updated(RecordRef),
    /// A record's row was deleted
    Deleted(RecordRef),
}

/// Observer callback registered on a store
pub type Observer = Box<dyn Fn(&StoreEvent)>;
