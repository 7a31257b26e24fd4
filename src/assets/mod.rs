//! Shared resource handles
//!
//! Meshes, skeletons, and other immutable resources are shared between
//! scene nodes through cheap reference-counted handles. The handle id is
//! the identity used for deduplication (GPU buffer caches, draw batching).

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique resource IDs
static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A shared handle to an immutable resource of type `T`.
///
/// Cloning a handle is cheap and yields the *same* resource identity;
/// two handles compare equal exactly when they refer to the same
/// underlying resource. Handles never expose mutable access - mutable
/// per-frame state (materials) lives in dedicated arenas instead.
#[derive(Debug)]
pub struct Handle<T> {
    /// Unique identity of the resource
    id: u64,
    /// Reference-counted pointer to the resource
    inner: Arc<T>,
}

impl<T> Handle<T> {
    /// Wrap a resource in a new handle with a fresh identity
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            id: next_id(),
            inner: Arc::new(value),
        }
    }

    /// Get the unique id of this resource.
    ///
    /// Suitable as a key in backend-side caches (uploaded GPU buffers,
    /// batch grouping) because it is stable for the handle's lifetime.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get a reference to the underlying resource
    #[must_use]
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Number of live handles sharing this resource
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> std::ops::Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
