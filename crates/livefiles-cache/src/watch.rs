//! Directory watching
//!
//! A [`WatchService`] hands out one [`WatchHandle`] per subscribed directory
//! and delivers change notifications as [`WatchBatch`]es keyed by handle.
//! [`NotifyWatchService`] is the filesystem-backed implementation and
//! [`WatchRegistrar`] keeps the handle → directory map used by the
//! reconciliation loop.

mod notify_service;
mod registrar;
mod service;

pub use notify_service::NotifyWatchService;
pub use registrar::WatchRegistrar;
pub use service::{WatchBatch, WatchEvent, WatchEventKind, WatchHandle, WatchService};
