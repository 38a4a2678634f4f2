//! Settings, module registry and the bootstrap procedure.

pub mod bootstrap;
pub mod module;
pub mod registry;
pub mod settings;

pub use bootstrap::{Bootstrap, BootstrapReport, CollectionReport, VerifyReport};
pub use module::Module;
pub use registry::ModuleRegistry;
