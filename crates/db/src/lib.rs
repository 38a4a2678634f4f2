//! Storage boundary for the bootstrap: the administrative [`Store`] API, its
//! MongoDB and in-memory implementations, and the collection contracts they
//! provision.

pub mod collection;
pub mod error;
pub mod index;
pub mod memory;
pub mod mongo;
pub mod schema;
pub mod store;

pub use collection::CollectionDef;
pub use error::{Result, StoreError};
pub use index::IndexSpec;
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use schema::{BsonType, FieldRule, Pattern, SchemaContract};
pub use store::{Principal, RoleGrant, Store};

/// Re-exported so dependants build documents against the same BSON version.
pub use mongodb::bson;
