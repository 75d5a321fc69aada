//! One module per operation family (§4.7), each registering its operations
//! into the shared [`crate::operation::OperationRegistry`].

pub mod bundlelib;
pub mod code;
pub mod configlib;
pub mod module_conn;
pub mod module_instance;
pub mod module_lib;
pub mod module_ports;
pub mod module_storage;
pub mod project_ops;
pub mod simulation_ops;

use crate::operation::OperationRegistry;

/// Registers every built-in operation family. Called once by
/// [`crate::operation::OperationRegistry::with_builtins`].
pub fn register_all(registry: &mut OperationRegistry) {
    configlib::register(registry);
    bundlelib::register(registry);
    module_lib::register(registry);
    module_ports::register(registry);
    module_instance::register(registry);
    module_conn::register(registry);
    module_storage::register(registry);
    code::register(registry);
    project_ops::register(registry);
    simulation_ops::register(registry);
}
