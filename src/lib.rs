//! Schema bootstrap for the user store.
//!
//! The library owns the collection definitions (see [`modules`]) and wires
//! them into the kernel's bootstrap procedure against a live MongoDB
//! deployment or an in-memory store.

pub mod modules;

use anyhow::Context;
use ignite_db::{MemoryStore, MongoStore, Store};
use ignite_kernel::{settings::Settings, Bootstrap, BootstrapReport, VerifyReport};

/// Connect to the configured deployment without touching it further.
pub async fn connect(settings: &Settings) -> anyhow::Result<MongoStore> {
    let database = &settings.database;
    MongoStore::connect(&database.uri, &database.app_name, database.connect_timeout())
        .await
        .with_context(|| "failed to create MongoDB client")
}

/// Confirm the configured deployment answers a ping.
pub async fn ping(settings: &Settings) -> anyhow::Result<()> {
    let store = connect(settings).await?;
    store.ping().await.context("MongoDB did not answer ping")?;
    Ok(())
}

/// Run the bootstrap against the configured deployment.
pub async fn bootstrap(settings: &Settings) -> anyhow::Result<BootstrapReport> {
    let registry = modules::registry();
    let mut store = connect(settings).await?;
    Bootstrap::new(settings, &registry).run(&mut store).await
}

/// Run the bootstrap against a fresh in-memory store. Nothing leaves the
/// process.
pub async fn plan(settings: &Settings) -> anyhow::Result<BootstrapReport> {
    let registry = modules::registry();
    let mut store = MemoryStore::new();
    Bootstrap::new(settings, &registry).run(&mut store).await
}

/// Check the configured deployment against the registered modules.
pub async fn verify(settings: &Settings) -> anyhow::Result<VerifyReport> {
    let registry = modules::registry();
    let mut store = connect(settings).await?;
    Bootstrap::new(settings, &registry).verify(&mut store).await
}
