use ignite_db::CollectionDef;

/// A unit of schema that the bootstrap provisions.
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Collections owned by this module, with validators, indexes and seed
    /// documents. Called once per bootstrap run, so seed timestamps reflect
    /// execution time.
    fn collections(&self) -> anyhow::Result<Vec<CollectionDef>> {
        Ok(vec![])
    }
}
