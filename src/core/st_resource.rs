use std::{
    rc::Rc,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// A single-threaded, reference-counted resource with interior mutability.
///
/// Busy-mode listeners are plain closures registered with the runner; when a
/// listener needs to touch engine state owned elsewhere (the engine timer,
/// for instance) it captures a clone of an `StResource`. The `Rc` keeps these
/// handles `!Send`, so foreground-only state cannot leak into a worker.
///
/// # Examples
///
/// ```
/// use busy_mode::core::StResource;
///
/// let resets = StResource::new(0u32);
/// let listener_side = resets.clone();
///
/// let mut on_busy_end = move || *listener_side.get_mut() += 1;
/// on_busy_end();
///
/// assert_eq!(*resets.get(), 1);
/// ```
///
/// # Panics
/// Acquiring a write guard while another guard on the same resource is alive
/// in the same thread deadlocks or panics; keep guards short-lived.
pub struct StResource<T> {
    pub resource: Rc<RwLock<T>>,
}

impl<T> StResource<T> {
    /// Creates a new `StResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Rc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard over the contained value.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns a mutable guard over the contained value.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Clone for StResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
