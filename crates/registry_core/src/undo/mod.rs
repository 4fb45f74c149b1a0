//! Optimistic delete with a timed undo window.
//!
//! # Responsibility
//! - Remove a record from the client snapshot immediately on delete.
//! - Commit the deletion to storage once the grace period elapses, or
//!   restore the record when the operator undoes first.
//!
//! # Invariants
//! - At most one deletion is pending per coordinator.
//! - Commit and undo are mutually exclusive for one pending deletion.
//! - Storage failures are reported as events and never roll back the
//!   snapshot.

pub mod coordinator;
pub mod scheduler;
pub mod store;

pub use coordinator::{
    DeletionError, DeletionEvent, SoftDeleteCoordinator, DEFAULT_GRACE_PERIOD,
};
pub use scheduler::{ManualScheduler, MonotonicScheduler, Scheduler, TimerHandle};
pub use store::RecordStore;
