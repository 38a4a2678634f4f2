//! In-process [`Store`] used for dry runs and tests.
//!
//! It keeps the store-side guarantees the bootstrap relies on: validators
//! are evaluated on every insert, unique indexes reject duplicates, and a
//! batch insert is all-or-nothing.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};

use crate::{
    error::{Result, StoreError},
    IndexSpec, Principal, SchemaContract, Store,
};

const DEFAULT_DATABASE: &str = "test";
const CODE_INDEX_OPTIONS_CONFLICT: i32 = 85;

#[derive(Default)]
struct Catalog {
    databases: BTreeMap<String, DatabaseState>,
}

#[derive(Default)]
struct DatabaseState {
    principals: BTreeMap<String, Principal>,
    collections: BTreeMap<String, CollectionState>,
}

#[derive(Default)]
struct CollectionState {
    contract: SchemaContract,
    indexes: Vec<IndexSpec>,
    documents: Vec<Document>,
}

fn unique_key(document: &Document, field: &str) -> Bson {
    document.get(field).cloned().unwrap_or(Bson::Null)
}

/// Reject `batch` if it collides with `existing` or with itself on any
/// unique index. Missing fields index as null.
fn check_unique<'a>(
    collection: &str,
    indexes: impl IntoIterator<Item = &'a IndexSpec>,
    existing: &[Document],
    batch: &[Document],
) -> Result<()> {
    for index in indexes.into_iter().filter(|index| index.unique) {
        let mut seen: Vec<Bson> = existing
            .iter()
            .map(|document| unique_key(document, &index.field))
            .collect();

        for document in batch {
            let key = unique_key(document, &index.field);
            if seen.contains(&key) {
                return Err(StoreError::DuplicateKey {
                    collection: collection.to_string(),
                    message: format!(
                        "E11000 duplicate key error index: {} dup key: {{ {}: {} }}",
                        index.name(),
                        index.field,
                        key
                    ),
                });
            }
            seen.push(key);
        }
    }
    Ok(())
}

/// Shared in-memory catalog. Clones observe the same data, each with its
/// own selected database.
#[derive(Clone)]
pub struct MemoryStore {
    catalog: Arc<Mutex<Catalog>>,
    database: String,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(Mutex::new(Catalog::default())),
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Indexes defined on `collection` in the selected database.
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.catalog()
            .databases
            .get(&self.database)
            .and_then(|db| db.collections.get(collection))
            .map(|state| state.indexes.clone())
            .unwrap_or_default()
    }

    /// Validator attached to `collection` in the selected database.
    pub fn contract(&self, collection: &str) -> Option<SchemaContract> {
        self.catalog()
            .databases
            .get(&self.database)
            .and_then(|db| db.collections.get(collection))
            .map(|state| state.contract.clone())
    }

    /// Role grants held by `user` in the selected database.
    pub fn principal(&self, user: &str) -> Option<Principal> {
        self.catalog()
            .databases
            .get(&self.database)
            .and_then(|db| db.principals.get(user))
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn select_database(&mut self, name: &str) {
        self.database = name.to_string();
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn principal_exists(&self, user: &str) -> Result<bool> {
        Ok(self.principal(user).is_some())
    }

    async fn create_principal(&self, principal: &Principal) -> Result<()> {
        let mut catalog = self.catalog();
        let db = catalog.databases.entry(self.database.clone()).or_default();

        if db.principals.contains_key(&principal.user) {
            return Err(StoreError::DuplicatePrincipal {
                user: principal.user.clone(),
                database: self.database.clone(),
            });
        }

        db.principals.insert(principal.user.clone(), principal.clone());
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .catalog()
            .databases
            .get(&self.database)
            .is_some_and(|db| db.collections.contains_key(name)))
    }

    async fn create_collection(&self, name: &str, contract: &SchemaContract) -> Result<()> {
        let mut catalog = self.catalog();
        let db = catalog.databases.entry(self.database.clone()).or_default();

        if db.collections.contains_key(name) {
            return Err(StoreError::DuplicateCollection(name.to_string()));
        }

        db.collections.insert(
            name.to_string(),
            CollectionState {
                contract: contract.clone(),
                ..CollectionState::default()
            },
        );
        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String> {
        let mut catalog = self.catalog();
        let state = catalog
            .databases
            .entry(self.database.clone())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_default();

        let name = index.name();
        if let Some(existing) = state.indexes.iter().find(|existing| existing.name() == name) {
            if existing == index {
                return Ok(name);
            }
            return Err(StoreError::Command {
                code: CODE_INDEX_OPTIONS_CONFLICT,
                message: format!("index {name} already exists with different options"),
            });
        }

        check_unique(collection, [index], &[], &state.documents)?;

        state.indexes.push(index.clone());
        Ok(name)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        let mut catalog = self.catalog();
        let state = catalog
            .databases
            .entry(self.database.clone())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_default();

        let mut batch = Vec::with_capacity(documents.len());
        for mut document in documents {
            state
                .contract
                .validate(&document)
                .map_err(|message| StoreError::SchemaValidation {
                    collection: collection.to_string(),
                    message,
                })?;

            if !document.contains_key("_id") {
                document.insert("_id", ObjectId::new());
            }
            batch.push(document);
        }

        check_unique(collection, &state.indexes, &state.documents, &batch)?;

        let written = batch.len();
        state.documents.extend(batch);
        Ok(written)
    }

    async fn count_documents(&self, collection: &str) -> Result<u64> {
        let count = self
            .catalog()
            .databases
            .get(&self.database)
            .and_then(|db| db.collections.get(collection))
            .map_or(0, |state| state.documents.len());
        Ok(count as u64)
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
    ) -> Result<Option<Document>> {
        Ok(self
            .catalog()
            .databases
            .get(&self.database)
            .and_then(|db| db.collections.get(collection))
            .and_then(|state| {
                state
                    .documents
                    .iter()
                    .find(|document| document.get(field) == Some(&value))
                    .cloned()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BsonType, FieldRule};
    use mongodb::bson::doc;

    fn contract() -> SchemaContract {
        SchemaContract::new()
            .required(
                FieldRule::new("email", BsonType::String)
                    .pattern("^.+@.+$")
                    .unwrap(),
            )
            .required(FieldRule::new("active", BsonType::Bool))
    }

    async fn provisioned() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.select_database("app");
        store.create_collection("people", &contract()).await.unwrap();
        store
            .create_index("people", &IndexSpec::unique("email"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn duplicate_principal_is_rejected() {
        let mut store = MemoryStore::new();
        store.select_database("app");
        let principal = Principal::scoped("svc", "secret", "readWrite", "app");

        store.create_principal(&principal).await.unwrap();
        let err = store.create_principal(&principal).await.unwrap_err();

        assert!(err.is_duplicate_principal());
        assert!(store.principal_exists("svc").await.unwrap());
    }

    #[tokio::test]
    async fn principals_are_scoped_per_database() {
        let mut store = MemoryStore::new();
        store.select_database("one");
        let principal = Principal::scoped("svc", "secret", "readWrite", "one");
        store.create_principal(&principal).await.unwrap();

        store.select_database("two");
        assert!(!store.principal_exists("svc").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_collection_is_rejected() {
        let store = provisioned().await;
        let err = store.create_collection("people", &contract()).await.unwrap_err();
        assert!(err.is_duplicate_collection());
    }

    #[tokio::test]
    async fn batch_insert_is_all_or_nothing() {
        let store = provisioned().await;

        let err = store
            .insert_many(
                "people",
                vec![
                    doc! { "email": "a@example.com", "active": true },
                    doc! { "email": "b@example.com", "active": true },
                    doc! { "email": "a@example.com", "active": false },
                ],
            )
            .await
            .unwrap_err();

        assert!(err.is_duplicate_key());
        assert_eq!(store.count_documents("people").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_document_fails_whole_batch() {
        let store = provisioned().await;

        let err = store
            .insert_many(
                "people",
                vec![
                    doc! { "email": "a@example.com", "active": true },
                    doc! { "email": "not-an-email", "active": true },
                ],
            )
            .await
            .unwrap_err();

        assert!(err.is_schema_validation());
        assert_eq!(store.count_documents("people").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unique_index_on_existing_duplicates_fails() {
        let store = MemoryStore::new();
        store
            .insert_many(
                "loose",
                vec![doc! { "email": "x@example.com" }, doc! { "email": "x@example.com" }],
            )
            .await
            .unwrap();

        let err = store
            .create_index("loose", &IndexSpec::unique("email"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());
        assert!(store.indexes("loose").is_empty());
    }

    #[tokio::test]
    async fn repeated_identical_index_is_a_no_op() {
        let store = provisioned().await;
        let name = store
            .create_index("people", &IndexSpec::unique("email"))
            .await
            .unwrap();

        assert_eq!(name, "email_1");
        assert_eq!(store.indexes("people").len(), 1);
    }

    #[tokio::test]
    async fn find_one_matches_on_field_equality() {
        let store = provisioned().await;
        store
            .insert_many(
                "people",
                vec![doc! { "email": "a@example.com", "active": true }],
            )
            .await
            .unwrap();

        let found = store
            .find_one("people", "email", Bson::from("a@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert!(found.get_object_id("_id").is_ok());
        assert!(store
            .find_one("people", "email", Bson::from("z@example.com"))
            .await
            .unwrap()
            .is_none());
    }
}
