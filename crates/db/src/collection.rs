use mongodb::bson::Document;

use crate::{IndexSpec, SchemaContract};

/// Everything the bootstrap needs to provision one collection: its
/// validator, its secondary indexes and its seed documents.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDef {
    pub name: String,
    pub contract: SchemaContract,
    pub indexes: Vec<IndexSpec>,
    pub seed: Vec<Document>,
    /// Noun used in the completion report, e.g. "sample users".
    pub seed_label: String,
}

impl CollectionDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contract: SchemaContract::default(),
            indexes: Vec::new(),
            seed: Vec::new(),
            seed_label: "documents".to_string(),
        }
    }

    pub fn with_contract(mut self, contract: SchemaContract) -> Self {
        self.contract = contract;
        self
    }

    /// Indexes are built in the order they are added. Unique indexes go
    /// first so they exist before any seed write.
    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_seed(mut self, seed: Vec<Document>, label: impl Into<String>) -> Self {
        self.seed = seed;
        self.seed_label = label.into();
        self
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.indexes
            .iter()
            .filter(|index| index.unique)
            .map(|index| index.field.as_str())
    }
}
