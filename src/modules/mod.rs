pub mod users;

use ignite_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(users::create_module());
}

/// Registry populated with every module this application provisions.
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry);
    registry
}
