//! One-shot provisioning of a fresh store: select the database, create the
//! application principal, create each collection with its validator, build
//! its indexes, insert its seed documents and report what was created.
//!
//! Every failing step aborts the run with the store's error wrapped in
//! context naming the step. Nothing is retried or rolled back.

use std::fmt;

use anyhow::Context;
use ignite_db::{CollectionDef, IndexSpec, Principal, Store};

use crate::{
    registry::ModuleRegistry,
    settings::{BootstrapMode, Settings},
};

/// What a bootstrap run created, rendered as the completion message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub database: String,
    pub principal_created: bool,
    pub collections: Vec<CollectionReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub name: String,
    pub created: bool,
    pub indexes: Vec<IndexSpec>,
    pub inserted: usize,
    pub seed_label: String,
}

impl BootstrapReport {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Database '{}' initialized successfully with sample data",
            self.database
        )];

        for collection in &self.collections {
            let indexes = collection
                .indexes
                .iter()
                .map(IndexSpec::to_string)
                .collect::<Vec<_>>()
                .join(", ");

            lines.push(format!("Collection: {}", collection.name));
            lines.push(format!("Indexes created: {indexes}"));
            lines.push(format!(
                "Documents inserted: {} {}",
                collection.inserted, collection.seed_label
            ));
        }

        lines
    }
}

impl fmt::Display for BootstrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join("\n"))
    }
}

/// Result of checking a store against the registered modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub collections: Vec<(String, u64)>,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// The bootstrap procedure bound to its settings and modules.
pub struct Bootstrap<'a> {
    settings: &'a Settings,
    registry: &'a ModuleRegistry,
}

impl<'a> Bootstrap<'a> {
    pub fn new(settings: &'a Settings, registry: &'a ModuleRegistry) -> Self {
        Self { settings, registry }
    }

    /// Principal described by the settings, scoped to the target database.
    pub fn principal(&self) -> Principal {
        let principal = &self.settings.principal;
        Principal::scoped(
            principal.user.as_str(),
            principal.password.as_str(),
            principal.role.as_str(),
            self.settings.database.name.as_str(),
        )
    }

    fn mode(&self) -> BootstrapMode {
        self.settings.bootstrap.mode
    }

    /// Run every step in order against `store`.
    pub async fn run(&self, store: &mut dyn Store) -> anyhow::Result<BootstrapReport> {
        let collections = self.registry.collect_collections()?;
        let database = self.settings.database.name.as_str();

        tracing::info!(mode = ?self.mode(), database, "bootstrap starting");

        store.ping().await.context("store is not reachable")?;

        store.select_database(database);
        tracing::info!(step = "select_database", database, "database selected");

        let principal = self.principal();
        let principal_created = self.create_principal(store, &principal).await?;

        let mut report = BootstrapReport {
            database: database.to_string(),
            principal_created,
            collections: Vec::with_capacity(collections.len()),
        };

        for (module, collection) in collections {
            let created = self.provision(store, module, collection).await?;
            report.collections.push(created);
        }

        tracing::info!(database, "bootstrap complete");
        Ok(report)
    }

    async fn create_principal(
        &self,
        store: &dyn Store,
        principal: &Principal,
    ) -> anyhow::Result<bool> {
        let database = store.database_name();
        let if_absent = self.mode() == BootstrapMode::IfAbsent;

        if if_absent && store.principal_exists(&principal.user).await? {
            tracing::warn!(
                step = "create_principal",
                user = %principal.user,
                database,
                "principal already exists; skipping"
            );
            return Ok(false);
        }

        store
            .create_principal(principal)
            .await
            .with_context(|| format!("failed to create principal '{}'", principal.user))?;

        tracing::info!(
            step = "create_principal",
            user = %principal.user,
            database,
            "principal created"
        );
        Ok(true)
    }

    async fn provision(
        &self,
        store: &dyn Store,
        module: &'static str,
        collection: CollectionDef,
    ) -> anyhow::Result<CollectionReport> {
        let name = collection.name.as_str();
        let if_absent = self.mode() == BootstrapMode::IfAbsent;

        let exists = if_absent && store.collection_exists(name).await?;
        if exists {
            tracing::warn!(
                step = "create_collection",
                module,
                collection = name,
                "collection already exists; skipping"
            );
        } else {
            store
                .create_collection(name, &collection.contract)
                .await
                .with_context(|| format!("failed to create collection '{name}'"))?;
            tracing::info!(
                step = "create_collection",
                module,
                collection = name,
                "collection created"
            );
        }

        for index in &collection.indexes {
            let index_name = store
                .create_index(name, index)
                .await
                .with_context(|| format!("failed to create index on '{name}.{}'", index.field))?;
            tracing::info!(
                step = "create_index",
                collection = name,
                index = %index_name,
                unique = index.unique,
                "index built"
            );
        }

        let inserted = if collection.seed.is_empty() {
            0
        } else if if_absent && store.count_documents(name).await? > 0 {
            tracing::warn!(
                step = "seed",
                collection = name,
                "collection already holds documents; skipping seed"
            );
            0
        } else {
            let inserted = store
                .insert_many(name, collection.seed.clone())
                .await
                .with_context(|| format!("failed to insert seed documents into '{name}'"))?;
            tracing::info!(
                step = "seed",
                collection = name,
                inserted,
                "seed documents inserted"
            );
            inserted
        };

        Ok(CollectionReport {
            name: collection.name.clone(),
            created: !exists,
            indexes: collection.indexes.clone(),
            inserted,
            seed_label: collection.seed_label.clone(),
        })
    }

    /// Check that the principal and every registered collection exist, that
    /// each collection holds at least its seed, and that every seed document
    /// is reachable through each of its unique fields.
    pub async fn verify(&self, store: &mut dyn Store) -> anyhow::Result<VerifyReport> {
        let collections = self.registry.collect_collections()?;

        store.ping().await.context("store is not reachable")?;
        store.select_database(&self.settings.database.name);

        let mut report = VerifyReport::default();

        let user = &self.settings.principal.user;
        if !store.principal_exists(user).await? {
            report.problems.push(format!("principal '{user}' is missing"));
        }

        for (_, collection) in collections {
            let name = collection.name.as_str();
            if !store.collection_exists(name).await? {
                report.problems.push(format!("collection '{name}' is missing"));
                continue;
            }

            let count = store.count_documents(name).await?;
            report.collections.push((name.to_string(), count));
            if count < collection.seed.len() as u64 {
                report.problems.push(format!(
                    "collection '{name}' holds {count} documents, expected at least {}",
                    collection.seed.len()
                ));
            }

            for document in &collection.seed {
                for field in collection.unique_fields() {
                    let Some(value) = document.get(field) else {
                        continue;
                    };
                    if store.find_one(name, field, value.clone()).await?.is_none() {
                        report
                            .problems
                            .push(format!("'{name}' has no document with {field} = {value}"));
                    }
                }
            }
        }

        for problem in &report.problems {
            tracing::warn!(problem = %problem, "verification failed");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::module::Module;
    use ignite_db::{bson::doc, BsonType, FieldRule, MemoryStore, SchemaContract};

    struct WidgetsModule;

    impl Module for WidgetsModule {
        fn name(&self) -> &'static str {
            "widgets"
        }

        fn collections(&self) -> anyhow::Result<Vec<CollectionDef>> {
            Ok(vec![CollectionDef::new("widgets")
                .with_contract(
                    SchemaContract::new().required(FieldRule::new("sku", BsonType::String)),
                )
                .with_index(IndexSpec::unique("sku"))
                .with_index(IndexSpec::ascending("color"))
                .with_seed(
                    vec![doc! { "sku": "w-1", "color": "red" }, doc! { "sku": "w-2" }],
                    "sample widgets",
                )])
        }
    }

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(WidgetsModule));
        registry
    }

    #[tokio::test]
    async fn run_provisions_everything_and_reports() {
        let settings = Settings::default();
        let registry = registry();
        let mut store = MemoryStore::new();

        let report = Bootstrap::new(&settings, &registry)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(store.database_name(), "reactive_api_db");
        assert!(report.principal_created);
        assert_eq!(
            report.lines(),
            [
                "Database 'reactive_api_db' initialized successfully with sample data",
                "Collection: widgets",
                "Indexes created: sku (unique), color",
                "Documents inserted: 2 sample widgets",
            ]
        );

        let principal = store.principal("app_user").unwrap();
        assert_eq!(principal.roles[0].role, "readWrite");
        assert_eq!(principal.roles[0].database, "reactive_api_db");
    }

    #[tokio::test]
    async fn strict_rerun_fails_at_principal() {
        let settings = Settings::default();
        let registry = registry();
        let mut store = MemoryStore::new();
        let bootstrap = Bootstrap::new(&settings, &registry);

        bootstrap.run(&mut store).await.unwrap();
        let err = bootstrap.run(&mut store).await.unwrap_err();

        let store_err = err.downcast_ref::<ignite_db::StoreError>().unwrap();
        assert!(store_err.is_duplicate_principal());
        assert_eq!(store.count_documents("widgets").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn if_absent_rerun_skips_existing_objects() {
        let mut settings = Settings::default();
        settings.bootstrap.mode = BootstrapMode::IfAbsent;
        let registry = registry();
        let mut store = MemoryStore::new();
        let bootstrap = Bootstrap::new(&settings, &registry);

        bootstrap.run(&mut store).await.unwrap();
        let report = bootstrap.run(&mut store).await.unwrap();

        assert!(!report.principal_created);
        assert!(!report.collections[0].created);
        assert_eq!(report.collections[0].inserted, 0);
        assert_eq!(store.count_documents("widgets").await.unwrap(), 2);
        assert_eq!(store.indexes("widgets").len(), 2);
    }

    #[tokio::test]
    async fn verify_flags_missing_collection() {
        let settings = Settings::default();
        let registry = registry();
        let mut store = MemoryStore::new();

        let report = Bootstrap::new(&settings, &registry)
            .verify(&mut store)
            .await
            .unwrap();

        assert!(!report.is_ok());
        assert_eq!(report.problems.len(), 2);
    }

    #[tokio::test]
    async fn verify_passes_after_run() {
        let settings = Settings::default();
        let registry = registry();
        let mut store = MemoryStore::new();
        let bootstrap = Bootstrap::new(&settings, &registry);

        bootstrap.run(&mut store).await.unwrap();
        let report = bootstrap.verify(&mut store).await.unwrap();

        assert!(report.is_ok(), "{:?}", report.problems);
        assert_eq!(report.collections, [("widgets".to_string(), 2)]);
    }
}
