//! The active backend
//!
//! The current backend is a single published `Arc<BackendDescriptor>`.
//! Operator calls snapshot it on entry and finish against that snapshot;
//! activations are serialised by a writer lock and publish a new reference.
//!
//! ```ignore
//! {
//!     let _guard = scoped_activate("tensor-train")?;
//!     // calls here dispatch to tensor-train
//! }
//! // previous backend restored, even if the block panicked or returned early
//! ```

use super::descriptor::BackendDescriptor;
use super::registry;
use crate::config;
use crate::error::Result;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

type Slot = Option<Arc<BackendDescriptor>>;

static CURRENT: RwLock<Slot> = parking_lot::const_rwlock(None);

/// Writer lock; also holds the `set_backend` history
static WRITER: Mutex<Vec<Slot>> = parking_lot::const_mutex(Vec::new());

fn publish(slot: Slot) -> Slot {
    let mut current = CURRENT.write();
    std::mem::replace(&mut *current, slot)
}

fn name_of(slot: &Slot) -> &'static str {
    slot.as_ref().map_or("<unset>", |b| b.name())
}

/// Snapshot of the active backend.
///
/// When no backend is active, the configured backend is activated first.
pub fn current() -> Result<Arc<BackendDescriptor>> {
    if let Some(backend) = CURRENT.read().as_ref() {
        return Ok(Arc::clone(backend));
    }
    let _writer = WRITER.lock();
    if let Some(backend) = CURRENT.read().as_ref() {
        return Ok(Arc::clone(backend));
    }
    let backend = registry::load(&config::get().backend)?;
    tracing::debug!(backend = backend.name(), "activated configured backend");
    publish(Some(Arc::clone(&backend)));
    Ok(backend)
}

/// Name of the active backend without triggering activation
pub fn current_name() -> Option<&'static str> {
    CURRENT.read().as_ref().map(|b| b.name())
}

/// Make `name` the active backend
pub fn activate(name: &str) -> Result<Arc<BackendDescriptor>> {
    let backend = registry::load(name)?;
    let _writer = WRITER.lock();
    let previous = publish(Some(Arc::clone(&backend)));
    tracing::debug!(from = name_of(&previous), to = backend.name(), "activated backend");
    Ok(backend)
}

/// Activate `name`, remembering the current backend for `previous_backend`
pub fn set_backend(name: &str) -> Result<Arc<BackendDescriptor>> {
    let backend = registry::load(name)?;
    let mut history = WRITER.lock();
    let previous = publish(Some(Arc::clone(&backend)));
    tracing::debug!(from = name_of(&previous), to = backend.name(), "set backend");
    history.push(previous);
    Ok(backend)
}

/// Undo the most recent `set_backend`, returning the backend it deactivated
pub fn previous_backend() -> Option<Arc<BackendDescriptor>> {
    let mut history = WRITER.lock();
    let restored = history.pop()?;
    tracing::debug!(to = name_of(&restored), "restored previous backend");
    publish(restored)
}

/// Return to the unset state and forget the `set_backend` history
pub fn unload() {
    let mut history = WRITER.lock();
    history.clear();
    let previous = publish(None);
    tracing::debug!(from = name_of(&previous), "unset backend");
}

/// Guard returned by [`scoped_activate`]; restores the prior backend on drop
#[derive(Debug)]
#[must_use = "the previous backend is restored as soon as the guard is dropped"]
pub struct ScopedBackend {
    previous: Option<Slot>,
    active: &'static str,
}

impl ScopedBackend {
    /// Name of the backend activated by this guard
    pub fn name(&self) -> &'static str {
        self.active
    }
}

impl Drop for ScopedBackend {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let _writer = WRITER.lock();
            tracing::debug!(from = self.active, to = name_of(&previous), "scoped backend restored");
            publish(previous);
        }
    }
}

/// Activate `name` until the returned guard is dropped
pub fn scoped_activate(name: &str) -> Result<ScopedBackend> {
    let backend = registry::load(name)?;
    let _writer = WRITER.lock();
    let previous = publish(Some(Arc::clone(&backend)));
    tracing::debug!(from = name_of(&previous), to = backend.name(), "scoped backend activated");
    Ok(ScopedBackend {
        previous: Some(previous),
        active: backend.name(),
    })
}

/// Run `f` with `name` active
pub fn with_backend<R>(name: &str, f: impl FnOnce() -> R) -> Result<R> {
    let _guard = scoped_activate(name)?;
    Ok(f())
}
