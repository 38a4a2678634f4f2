//! MongoDB implementation of [`Store`] on top of the official driver.
//!
//! Administrative steps are issued as database commands (`createUser`,
//! `create`, `insert`) so the server's own error codes can be mapped onto
//! [`StoreError`] without depending on driver-specific failure shapes.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, Bson, Document},
    options::ClientOptions,
    Client, Database,
};

use crate::{
    error::{server_code, Result, StoreError},
    IndexSpec, Principal, RoleGrant, SchemaContract, Store,
};

const ADMIN_DATABASE: &str = "admin";
const DEFAULT_DATABASE: &str = "test";

/// Store backed by a live MongoDB deployment.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    database: Database,
}

/// Interpret the reply to an ordered `insert` on `collection`. Write errors
/// and write concern errors arrive in an `ok: 1` reply rather than as a
/// failed command.
fn insert_outcome(collection: &str, reply: &Document) -> Result<usize> {
    if let Some(failure) = reply
        .get_array("writeErrors")
        .ok()
        .and_then(|errors| errors.first())
        .and_then(Bson::as_document)
    {
        let (code, message) = reply_error(failure);
        return Err(StoreError::from_write_code(collection, code, message));
    }

    if let Ok(failure) = reply.get_document("writeConcernError") {
        let (code, message) = reply_error(failure);
        return Err(StoreError::Command { code, message });
    }

    let written = reply.get("n").and_then(reply_int).unwrap_or_default();
    Ok(usize::try_from(written).unwrap_or_default())
}

fn reply_error(failure: &Document) -> (i32, String) {
    let code = failure
        .get("code")
        .and_then(reply_int)
        .and_then(|code| i32::try_from(code).ok())
        .unwrap_or_default();
    let message = failure.get_str("errmsg").unwrap_or_default().to_string();
    (code, message)
}

// Servers and proxies do not agree on integer widths in replies.
fn reply_int(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) => Some(*v as i64),
        _ => None,
    }
}

impl MongoStore {
    /// Parse `uri` and build a client. The driver connects lazily, so call
    /// [`Store::ping`] to confirm the server is reachable.
    pub async fn connect(uri: &str, app_name: &str, timeout: Duration) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        options.app_name = Some(app_name.to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);

        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;
        let database = client.database(DEFAULT_DATABASE);

        tracing::debug!(target: "ignite-db", app_name, "mongodb client created");

        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.database.collection::<Document>(name)
    }
}

#[async_trait]
impl Store for MongoStore {
    fn select_database(&mut self, name: &str) {
        self.database = self.client.database(name);
    }

    fn database_name(&self) -> &str {
        self.database.name()
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database(ADMIN_DATABASE)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn principal_exists(&self, user: &str) -> Result<bool> {
        let reply = self
            .database
            .run_command(doc! {
                "usersInfo": { "user": user, "db": self.database.name() }
            })
            .await?;

        Ok(reply
            .get_array("users")
            .map(|users| !users.is_empty())
            .unwrap_or(false))
    }

    async fn create_principal(&self, principal: &Principal) -> Result<()> {
        let roles: Vec<Document> = principal.roles.iter().map(RoleGrant::to_document).collect();
        let command = doc! {
            "createUser": principal.user.as_str(),
            "pwd": principal.password.as_str(),
            "roles": roles,
        };

        self.database
            .run_command(command)
            .await
            .map_err(|e| match server_code(&e) {
                Some(code) => StoreError::from_principal_code(
                    &principal.user,
                    self.database.name(),
                    code,
                    e.to_string(),
                ),
                None => StoreError::from(e),
            })?;

        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let names = self.database.list_collection_names().await?;
        Ok(names.iter().any(|existing| existing == name))
    }

    async fn create_collection(&self, name: &str, contract: &SchemaContract) -> Result<()> {
        let command = doc! {
            "create": name,
            "validator": contract.to_validator(),
        };

        self.database
            .run_command(command)
            .await
            .map_err(|e| match server_code(&e) {
                Some(code) => StoreError::from_collection_code(name, code, e.to_string()),
                None => StoreError::from(e),
            })?;

        Ok(())
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String> {
        let created = self
            .collection(collection)
            .create_index(index.to_model())
            .await
            .map_err(|e| match server_code(&e) {
                Some(code) => StoreError::from_write_code(collection, code, e.to_string()),
                None => StoreError::from(e),
            })?;

        Ok(created.index_name)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        let command = doc! {
            "insert": collection,
            "documents": documents,
            "ordered": true,
        };

        let reply = self.database.run_command(command).await?;
        insert_outcome(collection, &reply)
    }

    async fn count_documents(&self, collection: &str) -> Result<u64> {
        Ok(self.collection(collection).count_documents(doc! {}).await?)
    }

    async fn find_one(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
    ) -> Result<Option<Document>> {
        let mut filter = Document::new();
        filter.insert(field, value);
        Ok(self.collection(collection).find_one(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_insert_reply_reports_written_count() {
        let reply = doc! { "ok": 1, "n": 3 };
        assert_eq!(insert_outcome("users", &reply).unwrap(), 3);

        let reply = doc! { "ok": 1.0, "n": 3_i64 };
        assert_eq!(insert_outcome("users", &reply).unwrap(), 3);
    }

    #[test]
    fn duplicate_key_write_error_maps_to_duplicate_key() {
        let reply = doc! {
            "ok": 1,
            "n": 1,
            "writeErrors": [{
                "index": 1,
                "code": 11000,
                "errmsg": "E11000 duplicate key error collection: app.users index: email_1",
            }],
        };

        let err = insert_outcome("users", &reply).unwrap_err();
        assert!(err.is_duplicate_key());
        assert!(err.to_string().contains("E11000"));
        assert!(err.to_string().contains("'users'"));
    }

    #[test]
    fn validation_write_error_maps_to_schema_validation() {
        let reply = doc! {
            "ok": 1,
            "n": 0,
            "writeErrors": [{ "index": 0, "code": 121_i64, "errmsg": "Document failed validation" }],
        };

        let err = insert_outcome("users", &reply).unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[test]
    fn write_concern_error_fails_the_insert() {
        let reply = doc! {
            "ok": 1,
            "n": 3,
            "writeConcernError": { "code": 64, "errmsg": "waiting for replication timed out" },
        };

        let err = insert_outcome("users", &reply).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Command { code: 64, ref message } if message.contains("replication")
        ));
    }
}
