//! Core domain logic for the resident registry.
//! This crate is the single source of truth for business invariants.

pub mod access;
pub mod analytics;
pub mod config;
pub mod csv;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod undo;
pub mod view;

pub use access::{ensure, AccessError, Permission};
pub use config::{ConfigError, RegistryConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::resident::{Resident, ResidentField, ResidentId, ResidentValidationError};
pub use model::user::{Role, User, UserId};
pub use repo::resident_repo::{ResidentRepository, SqliteResidentRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::resident_service::{
    qr_label, ImportReport, ResidentPatch, ResidentService, ResidentServiceError,
};
pub use service::user_service::{UserService, UserServiceError};
pub use undo::{
    DeletionError, DeletionEvent, ManualScheduler, MonotonicScheduler, RecordStore, Scheduler,
    SoftDeleteCoordinator, TimerHandle, DEFAULT_GRACE_PERIOD,
};
pub use view::{compute_view, AttributeSource, MatchMode, Record, ViewEngine, ViewLimit, ViewQuery};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
