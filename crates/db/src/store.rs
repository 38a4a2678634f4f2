use async_trait::async_trait;
use mongodb::bson::{doc, Bson, Document};

use crate::{error::Result, IndexSpec, SchemaContract};

/// One `{role, db}` authorization grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub role: String,
    pub database: String,
}

impl RoleGrant {
    pub fn to_document(&self) -> Document {
        doc! { "role": self.role.as_str(), "db": self.database.as_str() }
    }
}

/// Authenticated identity to provision in the store's catalog.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: String,
    pub password: String,
    pub roles: Vec<RoleGrant>,
}

impl Principal {
    /// Principal holding a single `role` on `database`.
    pub fn scoped(
        user: impl Into<String>,
        password: impl Into<String>,
        role: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            roles: vec![RoleGrant {
                role: role.into(),
                database: database.into(),
            }],
        }
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Administrative API of a document store, bound to one selected database.
///
/// Every call blocks until the store acknowledges it and surfaces the
/// store's own error; nothing here retries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Switch the execution context to `name`. No storage side effect.
    fn select_database(&mut self, name: &str);

    /// Name of the currently selected database.
    fn database_name(&self) -> &str;

    /// Round-trip a `ping` to the server.
    async fn ping(&self) -> Result<()>;

    async fn principal_exists(&self, user: &str) -> Result<bool>;

    /// Fails with `DuplicatePrincipal` when the user already exists.
    async fn create_principal(&self, principal: &Principal) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Fails with `DuplicateCollection` when the collection already exists.
    async fn create_collection(&self, name: &str, contract: &SchemaContract) -> Result<()>;

    /// Returns the index name.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<String>;

    /// Ordered batch insert. Returns the number of documents written.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<usize>;

    async fn count_documents(&self, collection: &str) -> Result<u64>;

    /// First document whose `field` equals `value`.
    async fn find_one(&self, collection: &str, field: &str, value: Bson)
        -> Result<Option<Document>>;
}
