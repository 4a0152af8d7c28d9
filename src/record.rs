//! Record - a live in-memory entity instance
//!
//! A record pairs a compiled [`EntityType`] with an interior-mutable value
//! vector, one slot per declared field. Records are shared through
//! [`RecordRef`] (reference-counted); the identity map holds only weak
//! handles, so a record lives exactly as long as its strongest caller.
//!
//! Field access goes through the entity type's name->index table built at
//! registration; there is no string-keyed dispatch beyond that single lookup.

use crate::schema::EntityType;
use crate::value::{Color, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::cell::RefCell;
use std::rc::Rc;
use uuid::Uuid;

/// Shared handle to a live record
pub type RecordRef = Rc<Record>;

/// A live instance of one entity type.
///
/// Mutation is in place: setters update the shared instance every holder
/// sees, and `update` on the store persists the whole row.
#[derive(Debug)]
pub struct Record {
    entity: Rc<EntityType>,
    values: RefCell<Vec<Value>>,
}

impl Record {
    /// Construct a zero-valued instance (fk fields at the 0 sentinel)
    pub(crate) fn new(entity: Rc<EntityType>) -> RecordRef {
        let values = entity.fields().iter().map(|f| f.ty.zero()).collect();
        Rc::new(Self { entity, values: RefCell::new(values) })
    }

    pub fn entity(&self) -> &EntityType {
        &self.entity
    }

    pub fn type_name(&self) -> &str {
        self.entity.name()
    }

    /// Primary key; 0 until the record is first saved
    pub fn id(&self) -> i64 {
        self.values.borrow()[0].as_integer().unwrap_or(0)
    }

    pub(crate) fn set_id(&self, id: i64) {
        self.values.borrow_mut()[0] = Value::Integer(id);
    }

    /// Read a field by name
    pub fn get(&self, name: &str) -> Option<Value> {
        let index = self.entity.field_index(name)?;
        Some(self.values.borrow()[index].clone())
    }

    /// Write a field by name.
    ///
    /// Unknown names and values of the wrong semantic type are no-ops;
    /// returns whether the write happened.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let Some(index) = self.entity.field_index(name) else {
            return false;
        };
        if self.entity.fields()[index].ty != value.field_type() {
            return false;
        }

        self.values.borrow_mut()[index] = value;
        true
    }

    /// Overwrite a field slot with an already-converted value
    pub(crate) fn set_at(&self, index: usize, value: Value) {
        self.values.borrow_mut()[index] = value;
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name)?.as_integer()
    }

    pub fn unsigned(&self, name: &str) -> Option<u64> {
        self.get(name)?.as_unsigned()
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name)?.as_bool()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn character(&self, name: &str) -> Option<char> {
        match self.get(name)? {
            Value::Char(c) => Some(c),
            _ => None,
        }
    }

    pub fn uuid(&self, name: &str) -> Option<Uuid> {
        match self.get(name)? {
            Value::Uuid(u) => Some(u),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<Color> {
        match self.get(name)? {
            Value::Color(c) => Some(c),
            _ => None,
        }
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name)? {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn time(&self, name: &str) -> Option<NaiveTime> {
        match self.get(name)? {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn date_time(&self, name: &str) -> Option<NaiveDateTime> {
        match self.get(name)? {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn real(&self, name: &str) -> Option<f64> {
        self.get(name)?.as_real()
    }

    pub fn blob(&self, name: &str) -> Option<Vec<u8>> {
        match self.get(name)? {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::EntityDescriptor;
    use crate::schema::Schema;
    use crate::value::FieldType;

    fn sample_record() -> RecordRef {
        let descriptors = vec![
            EntityDescriptor::new("Widget")
                .field("label", FieldType::Text)
                .field("weight", FieldType::Real)
                .many_to_one("bin", "Bin", "widgets"),
            EntityDescriptor::new("Bin").one_to_many("widgets", "Widget", "bin"),
        ];
        let schema = Schema::new(&descriptors).unwrap();
        Record::new(schema.entity("Widget").unwrap().clone())
    }

    #[test]
    fn test_new_record_is_zero_valued() {
        let record = sample_record();

        assert_eq!(record.id(), 0);
        assert_eq!(record.text("label").unwrap(), "");
        assert_eq!(record.real("weight").unwrap(), 0.0);
        // fk starts at the unset sentinel
        assert_eq!(record.integer("bin").unwrap(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let record = sample_record();

        assert!(record.set("label", "crate"));
        assert!(record.set("weight", 1.25));
        assert_eq!(record.text("label").unwrap(), "crate");
        assert_eq!(record.real("weight").unwrap(), 1.25);
    }

    #[test]
    fn test_unknown_field_is_a_noop() {
        let record = sample_record();
        assert!(!record.set("nope", 1i64));
        assert_eq!(record.get("nope"), None);
    }

    #[test]
    fn test_type_mismatch_is_a_noop() {
        let record = sample_record();
        assert!(!record.set("label", 42i64));
        assert_eq!(record.text("label").unwrap(), "");
    }

    #[test]
    fn test_mutation_is_shared() {
        let record = sample_record();
        let alias = record.clone();

        record.set("label", "seen-by-all");
        assert_eq!(alias.text("label").unwrap(), "seen-by-all");
    }
}
