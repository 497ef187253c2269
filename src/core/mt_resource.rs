use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` is the only channel through which a busy worker publishes
/// state that the foreground thread polls while the worker is still running
/// (for example the progress value). Everything else crosses the thread
/// boundary exactly once, through the worker's completion channel.
///
/// # Examples
///
/// ```
/// # use std::thread;
/// use busy_mode::core::MtResource;
///
/// let progress = MtResource::new(0u32);
/// let worker_side = progress.clone();
///
/// let handle = thread::spawn(move || {
///     *worker_side.get_mut() = 120;
/// });
///
/// handle.join().unwrap();
/// assert_eq!(*progress.get(), 120);
/// ```
///
/// # Poisoning
/// A worker that panics while holding the write guard poisons the lock. The
/// value behind a progress counter stays meaningful after such a panic, so
/// the guards recover the inner value instead of propagating the poison.
pub struct MtResource<T: Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
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

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
