mod set;
mod traits;

pub use set::{PluginRegistries, Registries, RegistrySet, ServerRegistries};
pub use traits::{ensure_owner, PluginRegistry, RegistryInfo, ServerRegistry};
