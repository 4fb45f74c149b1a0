//! Owned admin session: resident snapshot plus soft-delete undo window.
//!
//! # Invariants
//! - One session owns one connection, one snapshot and one coordinator.
//! - The host drives expiry by calling `poll` periodically.

use registry_core::db::open_db;
use registry_core::{
    ensure, DeletionEvent, MonotonicScheduler, Permission, RecordStore, RegistryConfig, Resident,
    ResidentRepository, Role, SoftDeleteCoordinator, SqliteResidentRepository, ViewEngine,
    ViewQuery,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Resident store that owns its connection.
pub(crate) struct OwnedResidentStore {
    conn: Mutex<Connection>,
}

impl OwnedResidentStore {
    fn open(db_path: &Path) -> Result<Self, String> {
        let conn = open_db(db_path).map_err(|err| format!("session DB open failed: {err}"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_repo<T>(
        &self,
        f: impl FnOnce(&SqliteResidentRepository<'_>) -> registry_core::RepoResult<T>,
    ) -> Result<T, String> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| "session connection lock poisoned".to_string())?;
        let repo = SqliteResidentRepository::new(&conn);
        f(&repo).map_err(|err| err.to_string())
    }
}

impl RecordStore<Resident> for OwnedResidentStore {
    type Error = String;

    fn fetch_all(&self) -> Result<Vec<Resident>, String> {
        self.with_repo(|repo| repo.list_residents())
    }

    fn commit_delete(&self, id: &str) -> Result<(), String> {
        self.with_repo(|repo| repo.delete_resident(id))
    }

    fn restore(&self, record: &Resident) -> Result<(), String> {
        self.with_repo(|repo| repo.upsert_resident(record))
    }
}

type SessionCoordinator = SoftDeleteCoordinator<Resident, OwnedResidentStore, MonotonicScheduler>;

pub(crate) struct SessionCore {
    role: Role,
    engine: ViewEngine<Resident>,
    coordinator: SessionCoordinator,
}

impl SessionCore {
    /// Opens the database and loads the first snapshot.
    pub(crate) fn open(db_path: &Path, role: Role, grace_period: Duration) -> Result<Self, String> {
        ensure(role, Permission::ViewResidents).map_err(|err| err.to_string())?;
        let store = OwnedResidentStore::open(db_path)?;
        let mut core = Self {
            role,
            engine: ViewEngine::new(),
            coordinator: SoftDeleteCoordinator::with_grace_period(
                store,
                MonotonicScheduler::new(),
                grace_period,
            ),
        };
        core.refresh()?;
        Ok(core)
    }

    pub(crate) fn open_from_config(config: &RegistryConfig, role: Role) -> Result<Self, String> {
        Self::open(config.db_path.as_path(), role, config.grace_period)
    }

    pub(crate) fn refresh(&mut self) -> Result<usize, String> {
        self.coordinator
            .refresh(&mut self.engine)
            .map_err(|err| err.to_string())
    }

    pub(crate) fn view(&self, query: &ViewQuery) -> Vec<Resident> {
        self.engine.view(query).into_iter().cloned().collect()
    }

    pub(crate) fn delete(&mut self, id: &str) -> Result<(), String> {
        ensure(self.role, Permission::DeleteResident).map_err(|err| err.to_string())?;
        self.coordinator
            .initiate_delete(&mut self.engine, id)
            .map_err(|err| err.to_string())
    }

    pub(crate) fn undo(&mut self) -> Result<(), String> {
        self.coordinator
            .undo(&mut self.engine)
            .map_err(|err| err.to_string())
    }

    pub(crate) fn poll(&mut self) -> usize {
        self.coordinator.poll_timers()
    }

    pub(crate) fn pending_id(&self) -> Option<String> {
        self.coordinator.pending_id().map(str::to_string)
    }

    pub(crate) fn grace_period(&self) -> Duration {
        self.coordinator.grace_period()
    }

    pub(crate) fn drain_events(&mut self) -> Vec<DeletionEvent<Resident>> {
        self.coordinator.drain_events()
    }

    pub(crate) fn snapshot_len(&self) -> usize {
        self.engine.len()
    }
}
