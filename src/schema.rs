//! Schema model - descriptors compiled into a table/relationship graph
//!
//! [`Schema::new`] walks the registered entity descriptors exactly once and
//! produces the complete persistence graph:
//! - one entity table per descriptor
//! - relationship pairs with mutual inverse links
//! - an implicit join table per many-to-many pair
//! - cascade-delete dependency edges on every table
//!
//! Resolution is a pure function of the descriptor set and the graph is
//! read-only afterwards; the store never mutates it.

use crate::descriptor::{EntityDescriptor, ID_FIELD};
use crate::marshal::StorageClass;
use crate::value::FieldType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::str::FromStr;

/// Cardinality/direction pattern between two entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    /// Loose reference to another entity, declared without an inverse
    ToOne,
    /// Paired singular reference; both sides carry a foreign key
    OneToOne,
    /// The many side of a many-to-one / one-to-many pair (carries the fk)
    ManyToOne,
    /// The one side of a many-to-one / one-to-many pair
    OneToMany,
    /// Either side of a many-to-many pair, backed by a join table
    ManyToMany,
}

impl RelationshipKind {
    /// Get the string representation of the relationship kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::ToOne => "to-one",
            RelationshipKind::OneToOne => "one-to-one",
            RelationshipKind::ManyToOne => "many-to-one",
            RelationshipKind::OneToMany => "one-to-many",
            RelationshipKind::ManyToMany => "many-to-many",
        }
    }

    /// The wire code used in encoded relationship specs
    pub fn code(&self) -> &'static str {
        match self {
            RelationshipKind::ToOne => "-1",
            RelationshipKind::OneToOne => "1-1",
            RelationshipKind::ManyToOne => "N-1",
            RelationshipKind::OneToMany => "1-N",
            RelationshipKind::ManyToMany => "N-N",
        }
    }

    /// Get all relationship kinds
    pub fn all() -> &'static [RelationshipKind] {
        &[
            RelationshipKind::ToOne,
            RelationshipKind::OneToOne,
            RelationshipKind::ManyToOne,
            RelationshipKind::OneToMany,
            RelationshipKind::ManyToMany,
        ]
    }

    /// The kind materialized on the opposite side of a pair, if any
    pub fn inverse_kind(&self) -> Option<RelationshipKind> {
        match self {
            RelationshipKind::ToOne => None,
            RelationshipKind::OneToOne => Some(RelationshipKind::OneToOne),
            RelationshipKind::ManyToOne => Some(RelationshipKind::OneToMany),
            RelationshipKind::OneToMany => Some(RelationshipKind::ManyToOne),
            RelationshipKind::ManyToMany => Some(RelationshipKind::ManyToMany),
        }
    }

    /// Whether the declaring side stores an integer foreign-key column
    pub fn has_foreign_key(&self) -> bool {
        matches!(
            self,
            RelationshipKind::ToOne | RelationshipKind::OneToOne | RelationshipKind::ManyToOne
        )
    }
}

impl FromStr for RelationshipKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "-1" | "to-one" => Ok(RelationshipKind::ToOne),
            "1-1" | "one-to-one" => Ok(RelationshipKind::OneToOne),
            "N-1" | "many-to-one" => Ok(RelationshipKind::ManyToOne),
            "1-N" | "one-to-many" => Ok(RelationshipKind::OneToMany),
            "N-N" | "many-to-many" => Ok(RelationshipKind::ManyToMany),
            _ => Err(Error::InvalidRelationshipSpec(format!("Unknown relationship kind: {}", s))),
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One declared field of a compiled entity type
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

/// Compiled form of one entity type: ordered fields plus a name->index
/// accessor table built once at registration.
#[derive(Debug)]
pub struct EntityType {
    name: String,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
}

impl EntityType {
    fn from_descriptor(descriptor: &EntityDescriptor) -> Self {
        let fields: Vec<FieldDef> = descriptor
            .fields()
            .iter()
            .map(|(name, ty)| FieldDef { name: name.clone(), ty: *ty })
            .collect();

        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        Self { name: descriptor.name().to_string(), fields, index }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered field list, `id` first
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.field_index(name).map(|i| &self.fields[i])
    }
}

/// One direction of a resolved relationship.
///
/// Paired kinds reference their opposite by index into the schema's
/// relationship list; to-one relationships have no inverse.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// Entity type that declares this side
    pub owner: String,
    /// Role name on the owning side (also the fk column for singular kinds)
    pub name: String,
    /// Entity type on the other end
    pub target: String,
    /// Index of the inverse relationship, when the kind is paired
    pub inverse: Option<usize>,
}

/// What a table physically backs
#[derive(Debug, Clone)]
pub enum TableKind {
    /// Backs one entity type 1:1
    Entity(String),
    /// Backs a many-to-many pair; the two indices are the pair's relationships
    Join { role: usize, inverse: usize },
}

/// A physical table in the synthesized schema.
#[derive(Debug)]
pub struct Table {
    name: String,
    kind: TableKind,
    relationships: BTreeMap<String, usize>,
    dependents: Vec<(String, String)>,
}

impl Table {
    fn entity(type_name: &str) -> Self {
        Self {
            name: type_name.to_string(),
            kind: TableKind::Entity(type_name.to_string()),
            relationships: BTreeMap::new(),
            dependents: Vec::new(),
        }
    }

    fn join(name: &str, role: usize, inverse: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: TableKind::Join { role, inverse },
            relationships: BTreeMap::new(),
            dependents: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TableKind {
        &self.kind
    }

    /// Index of the relationship registered under `role`, if any
    pub fn relationship(&self, role: &str) -> Option<usize> {
        self.relationships.get(role).copied()
    }

    /// Registered relationship indices in role order
    pub fn relationships(&self) -> impl Iterator<Item = usize> + '_ {
        self.relationships.values().copied()
    }

    /// Cascade-delete dependents: `(dependent table, fk column)` pairs
    pub fn dependents(&self) -> &[(String, String)] {
        &self.dependents
    }
}

/// Deterministic join-table name for a many-to-many pair.
///
/// Both canonical halves are sorted lexicographically before joining, so the
/// name is independent of which side declared the relationship.
pub fn join_table_name(type1: &str, role1: &str, type2: &str, role2: &str) -> String {
    let part1 = format!("{}_{}", type1, role1);
    let part2 = format!("{}_{}", type2, role2);

    if part2 < part1 {
        format!("{}__{}", part2, part1)
    } else {
        format!("{}__{}", part1, part2)
    }
}

/// The compiled persistence graph: entity types, tables, relationships.
#[derive(Debug)]
pub struct Schema {
    entities: BTreeMap<String, Rc<EntityType>>,
    tables: BTreeMap<String, Table>,
    relationships: Vec<Relationship>,
}

impl Schema {
    /// Resolve the full descriptor set into the table/relationship graph.
    ///
    /// Duplicate type names, unknown relationship targets, and malformed
    /// encoded specs are registration errors; nothing is partially built.
    pub fn new(descriptors: &[EntityDescriptor]) -> Result<Self> {
        let mut entities: BTreeMap<String, Rc<EntityType>> = BTreeMap::new();
        let mut tables: BTreeMap<String, Table> = BTreeMap::new();

        for descriptor in descriptors {
            let name = descriptor.name();
            if entities.contains_key(name) {
                return Err(Error::DuplicateEntityType(name.to_string()));
            }
            entities.insert(name.to_string(), Rc::new(EntityType::from_descriptor(descriptor)));
            tables.insert(name.to_string(), Table::entity(name));
        }

        let mut relationships: Vec<Relationship> = Vec::new();

        for descriptor in descriptors {
            let owner = descriptor.name();

            for (role, spec) in descriptor.relationships() {
                // The inverse side may have been materialized already when the
                // opposite declaration was scanned first; each pair resolves
                // exactly once.
                if tables[owner].relationships.contains_key(role) {
                    continue;
                }

                let (kind, target, inverse_role) = parse_spec(spec)?;
                if !entities.contains_key(&target) {
                    return Err(Error::UnknownEntityType(target));
                }

                match kind {
                    RelationshipKind::ToOne => {
                        let idx = relationships.len();
                        relationships.push(Relationship {
                            kind,
                            owner: owner.to_string(),
                            name: role.clone(),
                            target: target.clone(),
                            inverse: None,
                        });

                        // Only the target side learns about the reference; the
                        // declaring side keeps a loose, non-cascading pointer.
                        table_mut(&mut tables, &target)
                            .dependents
                            .push((owner.to_string(), role.clone()));
                        table_mut(&mut tables, owner).relationships.insert(role.clone(), idx);
                    }
                    _ => {
                        let inverse_role = inverse_role.ok_or_else(|| {
                            Error::InvalidRelationshipSpec(format!(
                                "{} relationship {}.{} is missing its inverse role",
                                kind, owner, role
                            ))
                        })?;
                        let inverse_kind = kind.inverse_kind().expect("paired kind has an inverse");

                        let idx = relationships.len();
                        let inverse_idx = idx + 1;

                        relationships.push(Relationship {
                            kind,
                            owner: owner.to_string(),
                            name: role.clone(),
                            target: target.clone(),
                            inverse: Some(inverse_idx),
                        });
                        relationships.push(Relationship {
                            kind: inverse_kind,
                            owner: target.clone(),
                            name: inverse_role.clone(),
                            target: owner.to_string(),
                            inverse: Some(idx),
                        });

                        match kind {
                            RelationshipKind::OneToOne => {
                                table_mut(&mut tables, owner)
                                    .dependents
                                    .push((target.clone(), inverse_role.clone()));
                                table_mut(&mut tables, &target)
                                    .dependents
                                    .push((owner.to_string(), role.clone()));
                            }
                            RelationshipKind::ManyToOne => {
                                table_mut(&mut tables, &target)
                                    .dependents
                                    .push((owner.to_string(), role.clone()));
                            }
                            RelationshipKind::OneToMany => {
                                table_mut(&mut tables, owner)
                                    .dependents
                                    .push((target.clone(), inverse_role.clone()));
                            }
                            RelationshipKind::ManyToMany => {
                                let join = join_table_name(owner, role, &target, &inverse_role);
                                tables.insert(join.clone(), Table::join(&join, idx, inverse_idx));

                                table_mut(&mut tables, owner)
                                    .dependents
                                    .push((join.clone(), inverse_role.clone()));
                                table_mut(&mut tables, &target)
                                    .dependents
                                    .push((join, role.clone()));
                            }
                            RelationshipKind::ToOne => unreachable!(),
                        }

                        table_mut(&mut tables, owner).relationships.insert(role.clone(), idx);
                        table_mut(&mut tables, &target)
                            .relationships
                            .insert(inverse_role, inverse_idx);
                    }
                }
            }
        }

        Ok(Self { entities, tables, relationships })
    }

    pub fn entity(&self, type_name: &str) -> Option<&Rc<EntityType>> {
        self.entities.get(type_name)
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// All tables in deterministic (name) order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn relationship(&self, index: usize) -> &Relationship {
        &self.relationships[index]
    }

    /// Look up a relationship by owning type and role name
    pub fn find_relationship(&self, type_name: &str, role: &str) -> Option<&Relationship> {
        let idx = self.tables.get(type_name)?.relationship(role)?;
        Some(&self.relationships[idx])
    }

    /// DDL for the whole schema, one CREATE TABLE per table, in name order.
    pub fn create_statements(&self) -> Vec<String> {
        self.tables
            .values()
            .map(|table| match &table.kind {
                TableKind::Entity(type_name) => {
                    let entity = &self.entities[type_name];
                    let columns: Vec<String> = entity
                        .fields()
                        .iter()
                        .map(|f| {
                            if f.name == ID_FIELD {
                                format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", f.name)
                            } else {
                                format!("{} {}", f.name, column_type(f.ty))
                            }
                        })
                        .collect();

                    format!("CREATE TABLE IF NOT EXISTS {} ({})", table.name, columns.join(", "))
                }
                TableKind::Join { role, inverse } => {
                    format!(
                        "CREATE TABLE IF NOT EXISTS {} ({} INTEGER, {} INTEGER)",
                        table.name,
                        self.relationships[*role].name,
                        self.relationships[*inverse].name,
                    )
                }
            })
            .collect()
    }
}

fn column_type(ty: FieldType) -> &'static str {
    match ty.storage_class() {
        StorageClass::Integer => "INTEGER",
        StorageClass::Text => "TEXT",
        StorageClass::Real => "REAL",
        StorageClass::Blob => "BLOB",
    }
}

fn table_mut<'a>(tables: &'a mut BTreeMap<String, Table>, name: &str) -> &'a mut Table {
    tables.get_mut(name).expect("table registered in first pass")
}

fn parse_spec(spec: &str) -> Result<(RelationshipKind, String, Option<String>)> {
    let parts: Vec<&str> = spec.split(':').collect();

    match parts.as_slice() {
        [code, target] => {
            let kind: RelationshipKind = code.parse()?;
            if kind != RelationshipKind::ToOne {
                return Err(Error::InvalidRelationshipSpec(spec.to_string()));
            }
            Ok((kind, target.to_string(), None))
        }
        [code, target, inverse] => {
            let kind: RelationshipKind = code.parse()?;
            if kind == RelationshipKind::ToOne {
                return Err(Error::InvalidRelationshipSpec(spec.to_string()));
            }
            Ok((kind, target.to_string(), Some(inverse.to_string())))
        }
        _ => Err(Error::InvalidRelationshipSpec(spec.to_string())),
    }
}
