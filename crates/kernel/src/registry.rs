use std::{collections::HashSet, sync::Arc};

use anyhow::{bail, Context};
use ignite_db::CollectionDef;

use crate::module::Module;

/// Module registry holding everything the bootstrap provisions
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Collect collection definitions from all modules, tagged with the
    /// owning module. Registration order is kept; a collection name claimed
    /// by two modules is an error.
    pub fn collect_collections(&self) -> anyhow::Result<Vec<(&'static str, CollectionDef)>> {
        let mut seen = HashSet::new();
        let mut collections = Vec::new();

        for module in &self.modules {
            let declared = module.collections().with_context(|| {
                format!("module '{}' failed to declare its collections", module.name())
            })?;
            for collection in declared {
                if !seen.insert(collection.name.clone()) {
                    bail!(
                        "collection '{}' from module '{}' is already defined by another module",
                        collection.name,
                        module.name()
                    );
                }
                collections.push((module.name(), collection));
            }
        }

        Ok(collections)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
