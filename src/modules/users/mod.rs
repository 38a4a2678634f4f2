pub mod models;

use std::sync::Arc;

use anyhow::Context;
use ignite_db::{
    bson::{DateTime, Document},
    BsonType, CollectionDef, FieldRule, IndexSpec, SchemaContract,
};
use ignite_kernel::Module;

use models::User;

pub const COLLECTION: &str = "users";
pub const EMAIL_PATTERN: &str = "^.+@.+$";

/// Owns the `users` collection: its validator, indexes and sample records.
pub struct UsersModule;

impl UsersModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Module for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    fn collections(&self) -> anyhow::Result<Vec<CollectionDef>> {
        Ok(vec![collection(DateTime::now())?])
    }
}

/// Validator attached to the `users` collection.
pub fn contract() -> anyhow::Result<SchemaContract> {
    let contract = SchemaContract::new()
        .required(
            FieldRule::new("name", BsonType::String)
                .min_length(1)
                .describe("User name - required"),
        )
        .required(
            FieldRule::new("email", BsonType::String)
                .pattern(EMAIL_PATTERN)
                .context("invalid email pattern")?
                .describe("Valid email - required"),
        )
        .optional(FieldRule::new("phone", BsonType::String).describe("User phone number"))
        .required(
            FieldRule::new("active", BsonType::Bool)
                .describe("Whether the user is active - required"),
        )
        .optional(FieldRule::new("createdAt", BsonType::Date).describe("Creation time"))
        .optional(FieldRule::new("updatedAt", BsonType::Date).describe("Last update time"));

    Ok(contract)
}

/// Sample users, all active and stamped with `now`.
pub fn seed_users(now: DateTime) -> Vec<User> {
    vec![
        User::new("Juan Pérez", "juan@example.com", Some("1234567890"), now),
        User::new("María García", "maria@example.com", Some("0987654321"), now),
        User::new("Carlos López", "carlos@example.com", Some("5555555555"), now),
    ]
}

/// Full definition of the `users` collection with seed stamped at `now`.
pub fn collection(now: DateTime) -> anyhow::Result<CollectionDef> {
    let seed = seed_users(now).iter().map(Document::from).collect();

    Ok(CollectionDef::new(COLLECTION)
        .with_contract(contract()?)
        .with_index(IndexSpec::unique("email"))
        .with_index(IndexSpec::ascending("name"))
        .with_index(IndexSpec::ascending("active"))
        .with_index(IndexSpec::ascending("createdAt"))
        .with_seed(seed, "sample users"))
}

/// Create a new instance of the users module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(UsersModule::new())
}
