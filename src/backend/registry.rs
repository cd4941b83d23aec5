//! Process-wide backend registry

use super::descriptor::BackendDescriptor;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

static REGISTRY: LazyLock<RwLock<HashMap<&'static str, Arc<BackendDescriptor>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register a backend.
///
/// Registration is idempotent: if a backend of the same name is already
/// registered, the existing descriptor is kept and returned.
pub fn register(descriptor: BackendDescriptor) -> Arc<BackendDescriptor> {
    let mut registry = REGISTRY.write();
    if let Some(existing) = registry.get(descriptor.name()) {
        return Arc::clone(existing);
    }
    tracing::debug!(
        backend = descriptor.name(),
        operators = descriptor.table().len(),
        "registered backend"
    );
    let descriptor = Arc::new(descriptor);
    registry.insert(descriptor.name(), Arc::clone(&descriptor));
    descriptor
}

/// Registered descriptor by name
pub fn get(name: &str) -> Option<Arc<BackendDescriptor>> {
    REGISTRY.read().get(name).cloned()
}

/// Whether `name` is registered
pub fn is_registered(name: &str) -> bool {
    REGISTRY.read().contains_key(name)
}

/// Names of registered backends, sorted
pub fn registered() -> Vec<&'static str> {
    let mut names: Vec<_> = REGISTRY.read().keys().copied().collect();
    names.sort_unstable();
    names
}

/// Registered descriptor, registering a builtin backend on first use
pub fn load(name: &str) -> Result<Arc<BackendDescriptor>> {
    if let Some(descriptor) = get(name) {
        return Ok(descriptor);
    }
    match super::builtin(name) {
        Some(build) => Ok(register(build()?)),
        None => Err(Error::BackendNotRegistered {
            name: name.to_string(),
        }),
    }
}
