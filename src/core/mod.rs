//! # Core Module
//!
//! Shared-ownership containers used to pass state between the busy-mode
//! components without reaching for globals.
//!
//! ## Key Components
//! - `MtResource`: `Arc<RwLock<T>>` handle, used for state the worker thread
//!   writes and the foreground thread reads (task progress)
//! - `StResource`: `Rc<RwLock<T>>` handle, used for foreground-only state that
//!   several listeners share (engine timers, recorded notifications)
//!
//! ## Usage
//! ```rust
//! use busy_mode::core::{MtResource, StResource};
//!
//! let progress = MtResource::new(0u32);
//! *progress.get_mut() = 42;
//! assert_eq!(*progress.get(), 42);
//!
//! let seen = StResource::new(Vec::<&str>::new());
//! seen.get_mut().push("busy begin");
//! assert_eq!(seen.get().len(), 1);
//! ```

pub mod mt_resource;
pub mod st_resource;

pub use mt_resource::MtResource;
pub use st_resource::StResource;
