//! Entity descriptors - declarative registration of types and relationships
//!
//! A descriptor is the owner-supplied description of one entity type: its
//! name, ordered fields, and declared relationships. Descriptors are handed
//! to [`Store::new`](crate::Store::new) once at startup and compiled into
//! the schema model; nothing is introspected at runtime.
//!
//! Relationships are carried as small encoded specs, one per declared role:
//! - `-1:<Target>` - to-one (no inverse)
//! - `1-1:<Target>:<inverse>` - one-to-one
//! - `N-1:<Target>:<inverse>` - many-to-one
//! - `1-N:<Target>:<inverse>` - one-to-many
//! - `N-N:<Target>:<inverse>` - many-to-many
//!
//! Singular kinds (to-one, one-to-one, many-to-one) store the target's id in
//! an integer foreign-key field named after the role; the builder declares
//! that field automatically, exactly as the spec encoding implies.

use crate::value::FieldType;

/// Primary-key field name. Every entity owns it; it is always field 0.
pub const ID_FIELD: &str = "id";

/// Declarative description of one entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    name: String,
    fields: Vec<(String, FieldType)>,
    relationships: Vec<(String, String)>,
}

impl EntityDescriptor {
    /// Start a descriptor for the named entity type.
    ///
    /// The integer `id` primary-key field is declared implicitly.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![(ID_FIELD.to_string(), FieldType::Integer)],
            relationships: Vec::new(),
        }
    }

    /// Declare a data field
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Declare a relationship from its encoded spec form.
    ///
    /// The convenience methods below cover the five kinds; this is the raw
    /// surface for callers that already carry encoded specs.
    pub fn relationship(mut self, role: impl Into<String>, spec: impl Into<String>) -> Self {
        self.relationships.push((role.into(), spec.into()));
        self
    }

    /// Declare a loose to-one reference (no inverse, no cascade from this side)
    pub fn to_one(self, role: &str, target: &str) -> Self {
        self.field(role, FieldType::Integer)
            .relationship(role, format!("-1:{}", target))
    }

    /// Declare one side of a one-to-one pair
    pub fn one_to_one(self, role: &str, target: &str, inverse: &str) -> Self {
        self.field(role, FieldType::Integer)
            .relationship(role, format!("1-1:{}:{}", target, inverse))
    }

    /// Declare the many side of a many-to-one / one-to-many pair
    pub fn many_to_one(self, role: &str, target: &str, inverse: &str) -> Self {
        self.field(role, FieldType::Integer)
            .relationship(role, format!("N-1:{}:{}", target, inverse))
    }

    /// Declare the one side of a one-to-many / many-to-one pair
    pub fn one_to_many(self, role: &str, target: &str, inverse: &str) -> Self {
        self.relationship(role, format!("1-N:{}:{}", target, inverse))
    }

    /// Declare one side of a many-to-many pair
    pub fn many_to_many(self, role: &str, target: &str, inverse: &str) -> Self {
        self.relationship(role, format!("N-N:{}:{}", target, inverse))
    }

    /// Entity type name (unique across the registered set)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered field list, `id` first
    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    /// Declared `(role, encoded spec)` pairs in declaration order
    pub fn relationships(&self) -> &[(String, String)] {
        &self.relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_field_is_implicit_and_first() {
        let desc = EntityDescriptor::new("User").field("name", FieldType::Text);
        assert_eq!(desc.fields()[0], (ID_FIELD.to_string(), FieldType::Integer));
        assert_eq!(desc.fields()[1], ("name".to_string(), FieldType::Text));
    }

    #[test]
    fn test_singular_kinds_declare_foreign_key_field() {
        let desc = EntityDescriptor::new("Post")
            .field("title", FieldType::Text)
            .many_to_one("user", "User", "posts");

        let names: Vec<&str> = desc.fields().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id", "title", "user"]);
        assert_eq!(desc.fields()[2].1, FieldType::Integer);
    }

    #[test]
    fn test_collection_kinds_declare_no_field() {
        let desc = EntityDescriptor::new("User")
            .one_to_many("posts", "Post", "user")
            .many_to_many("followers", "User", "followees");

        assert_eq!(desc.fields().len(), 1);
        assert_eq!(
            desc.relationships(),
            &[
                ("posts".to_string(), "1-N:Post:user".to_string()),
                ("followers".to_string(), "N-N:User:followees".to_string()),
            ]
        );
    }

    #[test]
    fn test_encoded_specs() {
        let desc = EntityDescriptor::new("Tag")
            .to_one("user", "User")
            .one_to_one("detail", "TagDetail", "tag");

        assert_eq!(desc.relationships()[0], ("user".to_string(), "-1:User".to_string()));
        assert_eq!(
            desc.relationships()[1],
            ("detail".to_string(), "1-1:TagDetail:tag".to_string())
        );
    }
}
