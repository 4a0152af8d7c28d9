//! Store - the persistence engine and relationship traversal API
//!
//! Every operation is synchronous and auto-committed; there is no batching
//! and no background work. Failed statements are logged and surface as
//! empty/absent results rather than errors - recovery is the caller's
//! responsibility, matching the documented contract:
//! - `create` returns the constructed record even when the insert failed
//! - `update`/`delete` log and leave memory/storage diverged on failure
//! - traversal with an unknown role or the wrong kind is a silent no-op

use crate::Result;
use crate::descriptor::EntityDescriptor;
use crate::event::{Observer, StoreEvent};
use crate::identity::IdentityMap;
use crate::marshal::{self, SqlValue};
use crate::record::{Record, RecordRef};
use crate::schema::{EntityType, RelationshipKind, Schema, join_table_name};
use crate::value::Value;
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, error};

/// Relationship-aware object store over SQLite.
///
/// Built once from the full set of entity descriptors; the compiled schema
/// graph is immutable for the lifetime of the store.
pub struct Store {
    schema: Schema,
    conn: Option<Connection>,
    identity: RefCell<IdentityMap>,
    observers: Vec<Observer>,
}

impl Store {
    /// Compile the descriptor set into a store. No database is touched
    /// until [`open`](Self::open).
    pub fn new(descriptors: &[EntityDescriptor]) -> Result<Self> {
        Ok(Self {
            schema: Schema::new(descriptors)?,
            conn: None,
            identity: RefCell::new(IdentityMap::new()),
            observers: Vec::new(),
        })
    }

    /// The compiled schema graph
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Register an observer for store lifecycle events
    pub fn observe(&mut self, observer: impl Fn(&StoreEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Open the backing database file, synthesizing the schema when the
    /// file did not previously exist. Returns false when the store is
    /// already open or the engine fails to open the file.
    pub fn open(&mut self, path: &Path) -> bool {
        if self.conn.is_some() {
            error!("open: store is already open");
            return false;
        }

        self.identity.borrow_mut().clear();

        let existed = path.exists();
        match Connection::open(path) {
            Ok(conn) => self.conn = Some(conn),
            Err(e) => {
                error!("open: unable to open {}: {}", path.display(), e);
                return false;
            }
        }

        if !existed {
            self.synthesize_schema();
        }

        self.emit(&StoreEvent::Opened);
        true
    }

    /// Open an in-memory database (for testing); always synthesizes
    pub fn open_in_memory(&mut self) -> bool {
        if self.conn.is_some() {
            error!("open: store is already open");
            return false;
        }

        self.identity.borrow_mut().clear();

        match Connection::open_in_memory() {
            Ok(conn) => self.conn = Some(conn),
            Err(e) => {
                error!("open: unable to open in-memory database: {}", e);
                return false;
            }
        }

        self.synthesize_schema();
        self.emit(&StoreEvent::Opened);
        true
    }

    /// Close the backing database and drop all cached identities
    pub fn close(&mut self) {
        self.identity.borrow_mut().clear();
        self.conn = None;
        self.emit(&StoreEvent::Closed);
    }

    /// Emit CREATE TABLE statements for the whole graph. A rejected
    /// statement is logged and does not abort the remaining tables.
    fn synthesize_schema(&self) {
        let Some(conn) = self.conn.as_ref() else {
            return;
        };

        for statement in self.schema.create_statements() {
            if let Err(e) = conn.execute(&statement, []) {
                error!("schema synthesis: `{}` rejected: {}", statement, e);
            }
        }
        debug!("schema synthesized ({} tables)", self.schema.tables().count());
    }

    // ========== CRUD ==========

    /// Construct a zero-valued record of the named type and insert its row.
    ///
    /// On insert success the generated primary key is set on the record and
    /// the record is registered in the identity map. On failure the
    /// constructed-but-unsaved record is still returned (id stays 0).
    /// Returns `None` only for an unknown type name.
    pub fn create(&self, type_name: &str) -> Option<RecordRef> {
        let entity = self.schema.entity(type_name)?.clone();
        let record = Record::new(entity.clone());

        let Some(conn) = self.connection("create") else {
            return Some(record);
        };

        let fields = &entity.fields()[1..];
        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", type_name)
        } else {
            let columns: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            let placeholders: Vec<String> =
                (1..=fields.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                type_name,
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        let values: Vec<SqlValue> = fields
            .iter()
            .map(|f| record.get(&f.name).map(|v| marshal::to_storage(&v)).unwrap_or(SqlValue::Null))
            .collect();

        match conn.execute(&sql, rusqlite::params_from_iter(values)) {
            Ok(_) => {
                record.set_id(conn.last_insert_rowid());
                self.identity.borrow_mut().register(&record);
                self.emit(&StoreEvent::Created(record.clone()));
                self.emit(&StoreEvent::Changed);
            }
            Err(e) => error!("create {}: insert failed: {}", type_name, e),
        }

        Some(record)
    }

    /// Re-fetch the record's row and overwrite its in-memory fields.
    ///
    /// Fields whose stored value does not convert to the declared type are
    /// left untouched; partial overwrite is allowed.
    pub fn read(&self, record: &RecordRef) {
        let Some(conn) = self.connection("read") else {
            return;
        };

        let entity = record.entity();
        let fields = &entity.fields()[1..];
        if fields.is_empty() {
            return;
        }

        let columns: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let sql =
            format!("SELECT {} FROM {} WHERE id = ?1", columns.join(", "), entity.name());

        let result = conn.query_row(&sql, [record.id()], |row| {
            let mut stored = Vec::with_capacity(fields.len());
            for i in 0..fields.len() {
                stored.push(SqlValue::from(row.get::<_, rusqlite::types::Value>(i)?));
            }
            Ok(stored)
        });

        match result {
            Ok(stored) => {
                for (offset, (field, value)) in fields.iter().zip(&stored).enumerate() {
                    if let Some(converted) = marshal::from_storage(field.ty, value) {
                        record.set_at(offset + 1, converted);
                    }
                }
            }
            Err(e) => error!("read {} id {}: {}", entity.name(), record.id(), e),
        }
    }

    /// Write every field except the primary key back to storage
    pub fn update(&self, record: &RecordRef) {
        let Some(conn) = self.connection("update") else {
            return;
        };

        let entity = record.entity();
        let fields = &entity.fields()[1..];
        if fields.is_empty() {
            return;
        }

        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", f.name, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            entity.name(),
            assignments.join(", "),
            fields.len() + 1
        );

        let mut values: Vec<SqlValue> = fields
            .iter()
            .map(|f| record.get(&f.name).map(|v| marshal::to_storage(&v)).unwrap_or(SqlValue::Null))
            .collect();
        values.push(SqlValue::Integer(record.id()));

        match conn.execute(&sql, rusqlite::params_from_iter(values)) {
            Ok(_) => {
                self.emit(&StoreEvent::Updated(record.clone()));
                self.emit(&StoreEvent::Changed);
            }
            Err(e) => error!("update {} id {}: {}", entity.name(), record.id(), e),
        }
    }

    /// Delete the record's row and evict it from the identity map.
    ///
    /// With `cascade`, every dependent table registered in the schema graph
    /// gets one direct delete of the rows whose fk column equals this id.
    /// Dependent deletes are not recursive and do not touch in-memory
    /// instances of the removed rows.
    pub fn delete(&self, record: &RecordRef, cascade: bool) {
        let Some(conn) = self.connection("delete") else {
            return;
        };

        let entity = record.entity();
        let id = record.id();

        self.identity.borrow_mut().remove(entity.name(), id);

        let sql = format!("DELETE FROM {} WHERE id = ?1", entity.name());
        match conn.execute(&sql, [id]) {
            Ok(_) => {
                self.emit(&StoreEvent::Deleted(record.clone()));
                self.emit(&StoreEvent::Changed);
            }
            Err(e) => error!("delete {} id {}: {}", entity.name(), id, e),
        }

        if !cascade {
            return;
        }

        if let Some(table) = self.schema.table(entity.name()) {
            for (dependent, column) in table.dependents() {
                let sql = format!("DELETE FROM {} WHERE {} = ?1", dependent, column);
                match conn.execute(&sql, [id]) {
                    Ok(affected) => {
                        if affected > 0 {
                            self.emit(&StoreEvent::Changed);
                        }
                    }
                    Err(e) => {
                        error!("cascade delete {} where {} = {}: {}", dependent, column, id, e)
                    }
                }
            }
        }
    }

    // ========== Queries ==========

    /// Fetch one record by primary key.
    ///
    /// An identity-map hit returns the cached instance without touching
    /// storage; otherwise the row is fetched, constructed and registered.
    pub fn find_by_id(&self, type_name: &str, id: i64) -> Option<RecordRef> {
        let entity = self.schema.entity(type_name)?.clone();

        if let Some(live) = self.identity.borrow_mut().lookup(type_name, id) {
            return Some(live);
        }

        let conn = self.connection("find_by_id")?;

        let fields = &entity.fields()[1..];
        let sql = if fields.is_empty() {
            format!("SELECT id FROM {} WHERE id = ?1", type_name)
        } else {
            let columns: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            format!("SELECT {} FROM {} WHERE id = ?1", columns.join(", "), type_name)
        };

        let result = conn.query_row(&sql, [id], |row| {
            let mut stored = Vec::with_capacity(fields.len());
            for i in 0..fields.len() {
                stored.push(SqlValue::from(row.get::<_, rusqlite::types::Value>(i)?));
            }
            Ok(stored)
        });

        match result {
            Ok(stored) => {
                let record = Record::new(entity.clone());
                record.set_id(id);
                self.identity.borrow_mut().register(&record);

                for (offset, (field, value)) in fields.iter().zip(&stored).enumerate() {
                    if let Some(converted) = marshal::from_storage(field.ty, value) {
                        record.set_at(offset + 1, converted);
                    }
                }
                Some(record)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                error!("find_by_id {} id {}: {}", type_name, id, e);
                None
            }
        }
    }

    /// Fetch every record of the named type, in storage order
    pub fn find_all(&self, type_name: &str) -> Vec<RecordRef> {
        let Some(entity) = self.schema.entity(type_name) else {
            debug!("find_all: unknown entity type {}", type_name);
            return Vec::new();
        };
        self.fetch_rows(&entity.clone(), None)
    }

    /// Fetch records matching an ANDed equality filter over named fields
    pub fn find(&self, type_name: &str, filter: &[(&str, Value)]) -> Vec<RecordRef> {
        let Some(entity) = self.schema.entity(type_name) else {
            debug!("find: unknown entity type {}", type_name);
            return Vec::new();
        };
        let entity = entity.clone();

        if filter.is_empty() {
            return self.fetch_rows(&entity, None);
        }

        for (name, _) in filter {
            if entity.field_index(name).is_none() {
                error!("find {}: no field named {}", type_name, name);
                return Vec::new();
            }
        }

        let clause = filter
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ?{}", name, i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let params: Vec<SqlValue> =
            filter.iter().map(|(_, value)| marshal::to_storage(value)).collect();

        self.fetch_rows(&entity, Some((clause, params)))
    }

    /// Shared select path for find_all/find: every row either reuses the
    /// live identity-map instance or constructs and registers a new one.
    fn fetch_rows(
        &self,
        entity: &Rc<EntityType>,
        filter: Option<(String, Vec<SqlValue>)>,
    ) -> Vec<RecordRef> {
        let Some(conn) = self.connection("find") else {
            return Vec::new();
        };

        let fields = entity.fields();
        let columns: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();

        let (sql, params) = match filter {
            Some((clause, params)) => (
                format!(
                    "SELECT {} FROM {} WHERE {}",
                    columns.join(", "),
                    entity.name(),
                    clause
                ),
                params,
            ),
            None => {
                (format!("SELECT {} FROM {}", columns.join(", "), entity.name()), Vec::new())
            }
        };

        let mut stmt = match conn.prepare(&sql) {
            Ok(stmt) => stmt,
            Err(e) => {
                error!("find {}: {}", entity.name(), e);
                return Vec::new();
            }
        };

        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            let mut stored = Vec::with_capacity(fields.len());
            for i in 0..fields.len() {
                stored.push(SqlValue::from(row.get::<_, rusqlite::types::Value>(i)?));
            }
            Ok(stored)
        });

        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                error!("find {}: {}", entity.name(), e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for stored in rows.filter_map(|r| r.ok()) {
            let &SqlValue::Integer(id) = &stored[0] else {
                continue;
            };

            let live = self.identity.borrow_mut().lookup(entity.name(), id);
            let record = match live {
                Some(record) => record,
                None => {
                    let record = Record::new(entity.clone());
                    record.set_id(id);
                    for (index, (field, value)) in
                        fields.iter().zip(&stored).enumerate().skip(1)
                    {
                        if let Some(converted) = marshal::from_storage(field.ty, value) {
                            record.set_at(index, converted);
                        }
                    }
                    self.identity.borrow_mut().register(&record);
                    record
                }
            };
            records.push(record);
        }

        records
    }

    // ========== Relationship traversal ==========

    /// Resolve a singular relationship (to-one, one-to-one, many-to-one).
    ///
    /// Returns `None` for unknown roles, collection kinds, and the 0
    /// (unset) foreign-key sentinel.
    pub fn one(&self, record: &RecordRef, role: &str) -> Option<RecordRef> {
        let rel = self.schema.find_relationship(record.type_name(), role)?;
        if !rel.kind.has_foreign_key() {
            return None;
        }

        let fk = record.integer(role)?;
        if fk == 0 {
            return None;
        }

        self.find_by_id(&rel.target, fk)
    }

    /// Point a singular relationship at `target`, in memory only.
    ///
    /// The caller persists the change with [`update`](Self::update).
    pub fn set_one(&self, record: &RecordRef, role: &str, target: &RecordRef) {
        if let Some(rel) = self.schema.find_relationship(record.type_name(), role) {
            if rel.kind.has_foreign_key() {
                record.set(role, Value::Integer(target.id()));
            }
        }
    }

    /// Resolve a collection relationship (one-to-many or many-to-many);
    /// any other kind yields an empty list.
    pub fn many(&self, record: &RecordRef, role: &str) -> Vec<RecordRef> {
        let Some(rel) = self.schema.find_relationship(record.type_name(), role) else {
            return Vec::new();
        };
        let Some(inverse_idx) = rel.inverse else {
            return Vec::new();
        };
        let inverse = self.schema.relationship(inverse_idx);

        match rel.kind {
            RelationshipKind::OneToMany => {
                self.find(&rel.target, &[(inverse.name.as_str(), Value::Integer(record.id()))])
            }
            RelationshipKind::ManyToMany => {
                let Some(conn) = self.connection("many") else {
                    return Vec::new();
                };

                let join = join_table_name(&rel.owner, &rel.name, &inverse.owner, &inverse.name);
                let sql =
                    format!("SELECT {} FROM {} WHERE {} = ?1", rel.name, join, inverse.name);

                let mut stmt = match conn.prepare(&sql) {
                    Ok(stmt) => stmt,
                    Err(e) => {
                        error!("many {}.{}: {}", record.type_name(), role, e);
                        return Vec::new();
                    }
                };

                let ids: Vec<i64> = match stmt.query_map([record.id()], |row| row.get::<_, i64>(0))
                {
                    Ok(rows) => rows.filter_map(|r| r.ok()).collect(),
                    Err(e) => {
                        error!("many {}.{}: {}", record.type_name(), role, e);
                        return Vec::new();
                    }
                };

                ids.into_iter().filter_map(|id| self.find_by_id(&rel.target, id)).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Link `target` into a many-to-many relationship (inserts a join row)
    pub fn add(&self, record: &RecordRef, role: &str, target: &RecordRef) {
        let Some((rel, inverse)) = self.many_to_many(record, role) else {
            return;
        };
        let Some(conn) = self.connection("add") else {
            return;
        };

        let join = join_table_name(&rel.owner, &rel.name, &inverse.owner, &inverse.name);
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            join, rel.name, inverse.name
        );

        match conn.execute(&sql, [target.id(), record.id()]) {
            Ok(_) => self.emit(&StoreEvent::Changed),
            Err(e) => error!("add {}.{}: {}", record.type_name(), role, e),
        }
    }

    /// Unlink `target` from a many-to-many relationship.
    ///
    /// Removing a pair that is not linked is a no-op.
    pub fn remove(&self, record: &RecordRef, role: &str, target: &RecordRef) {
        let Some((rel, inverse)) = self.many_to_many(record, role) else {
            return;
        };
        let Some(conn) = self.connection("remove") else {
            return;
        };

        let join = join_table_name(&rel.owner, &rel.name, &inverse.owner, &inverse.name);
        let sql =
            format!("DELETE FROM {} WHERE {} = ?1 AND {} = ?2", join, rel.name, inverse.name);

        match conn.execute(&sql, [target.id(), record.id()]) {
            Ok(affected) => {
                if affected > 0 {
                    self.emit(&StoreEvent::Changed);
                }
            }
            Err(e) => error!("remove {}.{}: {}", record.type_name(), role, e),
        }
    }

    /// Unlink every target from a many-to-many relationship
    pub fn remove_all(&self, record: &RecordRef, role: &str) {
        let Some((rel, inverse)) = self.many_to_many(record, role) else {
            return;
        };
        let Some(conn) = self.connection("remove_all") else {
            return;
        };

        let join = join_table_name(&rel.owner, &rel.name, &inverse.owner, &inverse.name);
        let sql = format!("DELETE FROM {} WHERE {} = ?1", join, inverse.name);

        match conn.execute(&sql, [record.id()]) {
            Ok(affected) => {
                if affected > 0 {
                    self.emit(&StoreEvent::Changed);
                }
            }
            Err(e) => error!("remove_all {}.{}: {}", record.type_name(), role, e),
        }
    }

    /// Resolve a role to its many-to-many pair, or `None` for anything else
    fn many_to_many(
        &self,
        record: &RecordRef,
        role: &str,
    ) -> Option<(&crate::schema::Relationship, &crate::schema::Relationship)> {
        let rel = self.schema.find_relationship(record.type_name(), role)?;
        if rel.kind != RelationshipKind::ManyToMany {
            return None;
        }
        let inverse = self.schema.relationship(rel.inverse?);
        Some((rel, inverse))
    }

    fn connection(&self, op: &str) -> Option<&Connection> {
        let conn = self.conn.as_ref();
        if conn.is_none() {
            error!("{}: store is not open", op);
        }
        conn
    }

    fn emit(&self, event: &StoreEvent) {
        for observer in &self.observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldType;
    use std::rc::Rc;

    fn social_model() -> Vec<EntityDescriptor> {
        vec![
            EntityDescriptor::new("User")
                .field("name", FieldType::Text)
                .field("email", FieldType::Text)
                .one_to_many("posts", "Post", "user")
                .one_to_many("comments", "Comment", "user")
                .many_to_many("followers", "User", "followees")
                .one_to_one("profile", "UserProfile", "user"),
            EntityDescriptor::new("Post")
                .field("title", FieldType::Text)
                .field("body", FieldType::Text)
                .many_to_one("user", "User", "posts")
                .one_to_many("comments", "Comment", "post")
                .many_to_many("tags", "Tag", "posts"),
            EntityDescriptor::new("Comment")
                .field("body", FieldType::Text)
                .many_to_one("user", "User", "comments")
                .many_to_one("post", "Post", "comments"),
            EntityDescriptor::new("Tag")
                .field("name", FieldType::Text)
                .many_to_many("posts", "Post", "tags")
                .to_one("user", "User"),
            EntityDescriptor::new("UserProfile")
                .field("address", FieldType::Text)
                .one_to_one("user", "User", "profile"),
        ]
    }

    fn open_store() -> Store {
        let mut store = Store::new(&social_model()).unwrap();
        assert!(store.open_in_memory());
        store
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let store = open_store();

        let a = store.create("User").unwrap();
        let b = store.create("User").unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn test_create_unknown_type_returns_none() {
        let store = open_store();
        assert!(store.create("Ghost").is_none());
    }

    #[test]
    fn test_identity_uniqueness() {
        let store = open_store();

        let user = store.create("User").unwrap();
        let id = user.id();

        let again = store.find_by_id("User", id).unwrap();
        assert!(Rc::ptr_eq(&user, &again));

        let from_all = store.find_all("User");
        assert!(Rc::ptr_eq(&user, &from_all[0]));
    }

    #[test]
    fn test_expired_identity_reconstructs_from_storage() {
        let store = open_store();

        let user = store.create("User").unwrap();
        user.set("name", "User1");
        store.update(&user);
        let id = user.id();
        drop(user);

        let fresh = store.find_by_id("User", id).unwrap();
        assert_eq!(fresh.text("name").unwrap(), "User1");
    }

    #[test]
    fn test_update_then_read_roundtrip() {
        let store = open_store();

        let user = store.create("User").unwrap();
        user.set("name", "User1");
        user.set("email", "user1@example.com");
        store.update(&user);

        // clobber in memory, then re-read from storage
        user.set("name", "scratch");
        store.read(&user);
        assert_eq!(user.text("name").unwrap(), "User1");
        assert_eq!(user.text("email").unwrap(), "user1@example.com");
    }

    #[test]
    fn test_find_with_equality_filter() {
        let store = open_store();

        for name in ["User1", "User2", "User1"] {
            let user = store.create("User").unwrap();
            user.set("name", name);
            store.update(&user);
        }

        let found = store.find("User", &[("name", Value::from("User1"))]);
        assert_eq!(found.len(), 2);

        let none = store.find("User", &[("name", Value::from("User3"))]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_find_rejects_unknown_field() {
        let store = open_store();
        assert!(store.find("User", &[("nope", Value::from(1i64))]).is_empty());
    }

    #[test]
    fn test_one_to_many_symmetry() {
        let store = open_store();

        let user = store.create("User").unwrap();
        let post = store.create("Post").unwrap();
        store.set_one(&post, "user", &user);
        store.update(&post);

        let posts = store.many(&user, "posts");
        assert_eq!(posts.len(), 1);
        assert!(Rc::ptr_eq(&posts[0], &post));

        let owner = store.one(&post, "user").unwrap();
        assert!(Rc::ptr_eq(&owner, &user));
    }

    #[test]
    fn test_one_returns_none_for_unset_fk() {
        let store = open_store();
        let post = store.create("Post").unwrap();
        assert!(store.one(&post, "user").is_none());
    }

    #[test]
    fn test_many_to_many_add_remove() {
        let store = open_store();

        let post = store.create("Post").unwrap();
        let tag1 = store.create("Tag").unwrap();
        let tag2 = store.create("Tag").unwrap();

        store.add(&post, "tags", &tag1);
        store.add(&post, "tags", &tag2);
        assert_eq!(store.many(&post, "tags").len(), 2);

        // symmetric from the tag side
        assert_eq!(store.many(&tag1, "posts").len(), 1);

        store.remove(&post, "tags", &tag1);
        assert_eq!(store.many(&post, "tags").len(), 1);

        // removing an unlinked pair is a no-op
        store.remove(&post, "tags", &tag1);
        assert_eq!(store.many(&post, "tags").len(), 1);

        store.remove_all(&post, "tags");
        assert!(store.many(&post, "tags").is_empty());
    }

    #[test]
    fn test_traversal_kind_mismatch_is_silent() {
        let store = open_store();

        let user = store.create("User").unwrap();
        let post = store.create("Post").unwrap();

        // posts is one-to-many: no fk to read, no join table to write
        assert!(store.one(&user, "posts").is_none());
        store.add(&user, "posts", &post);
        store.remove(&user, "posts", &post);
        store.remove_all(&user, "posts");
        assert!(store.many(&post, "user").is_empty());

        // unknown role
        assert!(store.one(&user, "bogus").is_none());
        assert!(store.many(&user, "bogus").is_empty());
    }

    #[test]
    fn test_cascade_delete_one_to_many() {
        let store = open_store();

        let user = store.create("User").unwrap();
        for _ in 0..2 {
            let post = store.create("Post").unwrap();
            store.set_one(&post, "user", &user);
            store.update(&post);
        }

        store.delete(&user, true);
        assert!(store.find_all("Post").is_empty());
        assert!(store.find_all("User").is_empty());
    }

    #[test]
    fn test_cascade_delete_spares_many_to_many_targets() {
        let store = open_store();

        let post = store.create("Post").unwrap();
        let tag = store.create("Tag").unwrap();
        store.add(&post, "tags", &tag);

        store.delete(&post, true);

        // the join row is gone but the tag itself survives
        assert!(store.many(&tag, "posts").is_empty());
        assert_eq!(store.find_all("Tag").len(), 1);
    }

    #[test]
    fn test_delete_without_cascade_keeps_dependents() {
        let store = open_store();

        let user = store.create("User").unwrap();
        let post = store.create("Post").unwrap();
        store.set_one(&post, "user", &user);
        store.update(&post);

        store.delete(&user, false);
        assert_eq!(store.find_all("Post").len(), 1);
    }

    #[test]
    fn test_events_fire_after_mutations() {
        use std::cell::RefCell;

        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();

        let mut store = Store::new(&social_model()).unwrap();
        store.observe(move |event| {
            let label = match event {
                StoreEvent::Opened => "opened",
                StoreEvent::Closed => "closed",
                StoreEvent::Changed => "changed",
                StoreEvent::Created(_) => "created",
                StoreEvent::Updated(_) => "updated",
                StoreEvent::Deleted(_) => "deleted",
            };
            sink.borrow_mut().push(label);
        });

        assert!(store.open_in_memory());
        let user = store.create("User").unwrap();
        store.update(&user);
        store.delete(&user, false);
        store.close();

        assert_eq!(
            log.borrow().as_slice(),
            &["opened", "created", "changed", "updated", "changed", "deleted", "changed", "closed"]
        );
    }

    #[test]
    fn test_operations_when_closed_are_logged_noops() {
        let store = Store::new(&social_model()).unwrap();

        let record = store.create("User").unwrap();
        assert_eq!(record.id(), 0);
        assert!(store.find_by_id("User", 1).is_none());
        assert!(store.find_all("User").is_empty());
    }

    #[test]
    fn test_open_twice_fails() {
        let mut store = open_store();
        assert!(!store.open_in_memory());
    }
}
