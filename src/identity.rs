//! Identity map - at most one live instance per (entity type, id)
//!
//! The map holds weak handles only; it never keeps a record alive. While any
//! caller still owns a strong reference, every fetch of the same row hands
//! back that same instance. Once the last strong reference drops, the stale
//! entry is evicted lazily on the next lookup and the caller reconstructs
//! from storage.

use crate::record::{Record, RecordRef};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Per-type cache of weak record handles keyed by primary key.
#[derive(Debug, Default)]
pub struct IdentityMap {
    map: HashMap<String, HashMap<i64, Weak<Record>>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly constructed instance under its (type, id)
    pub fn register(&mut self, record: &RecordRef) {
        self.map
            .entry(record.type_name().to_string())
            .or_default()
            .insert(record.id(), Rc::downgrade(record));
    }

    /// Offer the live instance for (type, id), if one still exists.
    ///
    /// An expired handle is evicted here; the caller reconstructs from
    /// storage and re-registers.
    pub fn lookup(&mut self, type_name: &str, id: i64) -> Option<RecordRef> {
        let per_type = self.map.get_mut(type_name)?;

        match per_type.get(&id).and_then(Weak::upgrade) {
            Some(record) => Some(record),
            None => {
                per_type.remove(&id);
                None
            }
        }
    }

    /// Drop the entry for (type, id), if present
    pub fn remove(&mut self, type_name: &str, id: i64) {
        if let Some(per_type) = self.map.get_mut(type_name) {
            per_type.remove(&id);
        }
    }

    /// Drop every entry (store open/close)
    pub fn clear(&mut self) {
        self.map.clear();
    }
}
