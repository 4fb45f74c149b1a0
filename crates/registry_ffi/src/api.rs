//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level registry functions to Dart via FRB.
//! - Gate every call by the caller's role before touching storage.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported in response envelopes, never thrown.
//! - Role strings are parsed per call; unknown roles are rejected.

use crate::session::SessionCore;
use chrono::Local;
use log::warn;
use registry_core::analytics::analytics_report;
use registry_core::db::open_db;
use registry_core::model::resident::{format_birthday, parse_birthday};
use registry_core::{
    core_version as core_version_inner, ensure, init_logging as init_logging_inner,
    ping as ping_inner, qr_label, DeletionEvent, Permission, RegistryConfig, Resident,
    ResidentPatch, ResidentService, Role, SqliteResidentRepository, SqliteUserRepository, User,
    UserService, ViewLimit, ViewQuery,
};
use rusqlite::Connection;
use std::sync::OnceLock;

static REGISTRY_CONFIG: OnceLock<RegistryConfig> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Resident projection with string-typed dates for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentItem {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub contact: String,
    pub address: String,
    pub employment_status: String,
    pub house_number: String,
    pub health: String,
    /// `YYYY-MM-DD`.
    pub birthday: String,
    pub household_count: u32,
}

/// Partial resident update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidentPatchInput {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub employment_status: Option<String>,
    pub house_number: Option<String>,
    pub health: Option<String>,
    pub birthday: Option<String>,
    pub household_count: Option<u32>,
}

/// View inputs as chosen in the list header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub search_by: String,
    pub search_query: String,
    pub sort_key: String,
    /// Positive integer or `all`.
    pub limit: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the affected record, when there is one.
    pub record_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, record_id: Option<String>) -> Self {
        Self {
            ok: true,
            record_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            record_id: None,
            message: message.into(),
        }
    }
}

/// Resident list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidentListResponse {
    pub ok: bool,
    pub items: Vec<ResidentItem>,
    pub message: String,
}

impl ResidentListResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            items: Vec::new(),
            message: message.into(),
        }
    }
}

/// Text payload response envelope (QR data, CSV, JSON).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub ok: bool,
    pub text: String,
    /// Secondary text, e.g. the QR label.
    pub detail: String,
    pub message: String,
}

impl TextResponse {
    fn success(text: String, detail: String) -> Self {
        Self {
            ok: true,
            text,
            detail,
            message: "OK".to_string(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: String::new(),
            detail: String::new(),
            message: message.into(),
        }
    }
}

/// Account projection without credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserItem {
    pub user_id: String,
    pub username: String,
    pub role: String,
}

/// Login response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub ok: bool,
    pub user: Option<UserItem>,
    pub message: String,
}

/// One soft-delete notification for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// `deleted|committed|restored|commit_failed|restore_failed`.
    pub kind: String,
    pub record_id: String,
    pub message: String,
}

/// Creates the schema and the default accounts when missing.
///
/// Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn registry_bootstrap() -> String {
    let result = with_connection(|conn| {
        UserService::new(SqliteUserRepository::new(conn))
            .seed_default_users()
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(_) => String::new(),
        Err(err) => format!("registry_bootstrap failed: {err}"),
    }
}

/// Verifies operator credentials.
#[flutter_rust_bridge::frb(sync)]
pub fn auth_login(username: String, password: String) -> LoginResponse {
    let result = with_connection(|conn| {
        UserService::new(SqliteUserRepository::new(conn))
            .login(username.as_str(), password.as_str())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(user) => LoginResponse {
            ok: true,
            user: Some(to_user_item(user)),
            message: "Login successful.".to_string(),
        },
        Err(err) => LoginResponse {
            ok: false,
            user: None,
            message: err,
        },
    }
}

/// Computes one resident view straight from storage.
#[flutter_rust_bridge::frb(sync)]
pub fn residents_view(role: String, request: ViewRequest) -> ResidentListResponse {
    let result = authorize(&role, Permission::ViewResidents).and_then(|_| {
        let query = to_view_query(request)?;
        let residents = with_resident_service(|service| {
            service.list().map_err(|err| err.to_string())
        })?;
        let items = registry_core::compute_view(&residents, &query)
            .into_iter()
            .cloned()
            .map(to_resident_item)
            .collect::<Vec<_>>();
        Ok(items)
    });
    match result {
        Ok(items) => ResidentListResponse {
            message: format!("{} resident(s).", items.len()),
            ok: true,
            items,
        },
        Err(err) => ResidentListResponse::failure(format!("residents_view failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn resident_create(role: String, item: ResidentItem) -> ActionResponse {
    let result = authorize(&role, Permission::CreateResident).and_then(|_| {
        let resident = to_resident(item)?;
        with_resident_service(|service| service.create(&resident).map_err(|err| err.to_string()))
    });
    match result {
        Ok(resident) => ActionResponse::success("Resident created.", Some(resident.id)),
        Err(err) => ActionResponse::failure(format!("resident_create failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn resident_update(role: String, id: String, patch: ResidentPatchInput) -> ActionResponse {
    let result = authorize(&role, Permission::UpdateResident).and_then(|_| {
        let patch = to_resident_patch(patch)?;
        with_resident_service(|service| {
            service
                .update(id.as_str(), patch)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(resident) => ActionResponse::success("Resident updated.", Some(resident.id)),
        Err(err) => ActionResponse::failure(format!("resident_update failed: {err}")),
    }
}

/// Returns the QR payload in `text` and the printable label in `detail`.
#[flutter_rust_bridge::frb(sync)]
pub fn resident_qr(role: String, id: String) -> TextResponse {
    let result = authorize(&role, Permission::GenerateQr).and_then(|_| {
        with_resident_service(|service| {
            let payload = service
                .qr_payload(id.as_str())
                .map_err(|err| err.to_string())?;
            let label = service
                .get(id.as_str())
                .map_err(|err| err.to_string())?
                .map(|resident| qr_label(&resident))
                .unwrap_or_default();
            Ok((payload, label))
        })
    });
    match result {
        Ok((payload, label)) => TextResponse::success(payload, label),
        Err(err) => TextResponse::failure(format!("resident_qr failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn residents_export_csv(role: String) -> TextResponse {
    let result = authorize(&role, Permission::ExportCsv).and_then(|_| {
        with_resident_service(|service| service.export_csv().map_err(|err| err.to_string()))
    });
    match result {
        Ok(csv) => TextResponse::success(csv, String::new()),
        Err(err) => TextResponse::failure(format!("residents_export_csv failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn residents_import_csv(role: String, text: String) -> ActionResponse {
    let result = authorize(&role, Permission::ImportCsv).and_then(|_| {
        with_resident_service(|service| {
            service
                .import_csv(text.as_str())
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(report) => ActionResponse::success(
            format!("Imported {} resident(s).", report.created.len()),
            None,
        ),
        Err(err) => ActionResponse::failure(format!("residents_import_csv failed: {err}")),
    }
}

/// Returns every analytics series as one JSON document in `text`.
#[flutter_rust_bridge::frb(sync)]
pub fn analytics_json(role: String) -> TextResponse {
    let result = authorize(&role, Permission::ViewAnalytics).and_then(|_| {
        let residents =
            with_resident_service(|service| service.list().map_err(|err| err.to_string()))?;
        let report = analytics_report(&residents, Local::now().date_naive());
        serde_json::to_string(&report).map_err(|err| err.to_string())
    });
    match result {
        Ok(json) => TextResponse::success(json, String::new()),
        Err(err) => TextResponse::failure(format!("analytics_json failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn users_list(role: String) -> Vec<UserItem> {
    let result = authorize(&role, Permission::ManageUsers).and_then(|_| {
        with_connection(|conn| {
            UserService::new(SqliteUserRepository::new(conn))
                .list()
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(users) => users.into_iter().map(to_user_item).collect(),
        Err(err) => {
            warn!("event=users_list module=ffi status=error error={err}");
            Vec::new()
        }
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn user_register(
    role: String,
    username: String,
    password: String,
    new_role: String,
) -> ActionResponse {
    let result = authorize(&role, Permission::ManageUsers).and_then(|_| {
        let new_role = Role::parse(new_role.as_str()).map_err(|err| err.to_string())?;
        with_connection(|conn| {
            UserService::new(SqliteUserRepository::new(conn))
                .register(username.as_str(), password.as_str(), new_role)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(user) => ActionResponse::success("User registered.", Some(user.id.to_string())),
        Err(err) => ActionResponse::failure(format!("user_register failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn user_update_role(role: String, user_id: String, new_role: String) -> ActionResponse {
    let result = authorize(&role, Permission::ManageUsers).and_then(|_| {
        let id = parse_user_id(&user_id)?;
        let new_role = Role::parse(new_role.as_str()).map_err(|err| err.to_string())?;
        with_connection(|conn| {
            UserService::new(SqliteUserRepository::new(conn))
                .update_role(id, new_role)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(user) => ActionResponse::success("Role updated.", Some(user.id.to_string())),
        Err(err) => ActionResponse::failure(format!("user_update_role failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn user_delete(role: String, user_id: String) -> ActionResponse {
    let result = authorize(&role, Permission::ManageUsers).and_then(|_| {
        let id = parse_user_id(&user_id)?;
        with_connection(|conn| {
            UserService::new(SqliteUserRepository::new(conn))
                .delete(id)
                .map_err(|err| err.to_string())
        })
    });
    match result {
        Ok(()) => ActionResponse::success("User deleted.", Some(user_id)),
        Err(err) => ActionResponse::failure(format!("user_delete failed: {err}")),
    }
}

/// Resident list page state: snapshot, view and soft delete with undo.
///
/// # FFI contract
/// - Owned by the Dart side; dropping it abandons any pending deletion
///   without committing it.
/// - Expiry is only observed when the host calls [`AdminSession::poll`].
#[flutter_rust_bridge::frb(opaque)]
pub struct AdminSession {
    core: SessionCore,
}

impl AdminSession {
    /// Opens a session on the configured database for `role`.
    #[flutter_rust_bridge::frb(sync)]
    pub fn open(role: String) -> Result<AdminSession, String> {
        let role = Role::parse(role.as_str()).map_err(|err| err.to_string())?;
        let core = SessionCore::open_from_config(registry_config(), role)?;
        Ok(Self { core })
    }

    /// Re-reads the snapshot from storage. Returns the new snapshot size.
    #[flutter_rust_bridge::frb(sync)]
    pub fn refresh(&mut self) -> ActionResponse {
        match self.core.refresh() {
            Ok(count) => ActionResponse::success(format!("{count} resident(s) loaded."), None),
            Err(err) => ActionResponse::failure(format!("refresh failed: {err}")),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn view(&self, request: ViewRequest) -> ResidentListResponse {
        match to_view_query(request) {
            Ok(query) => {
                let items = self
                    .core
                    .view(&query)
                    .into_iter()
                    .map(to_resident_item)
                    .collect::<Vec<_>>();
                ResidentListResponse {
                    message: format!("{} resident(s).", items.len()),
                    ok: true,
                    items,
                }
            }
            Err(err) => ResidentListResponse::failure(format!("view failed: {err}")),
        }
    }

    /// Hides `id` immediately and opens the undo window.
    #[flutter_rust_bridge::frb(sync)]
    pub fn delete(&mut self, id: String) -> ActionResponse {
        match self.core.delete(id.as_str()) {
            Ok(()) => ActionResponse::success(
                format!(
                    "Resident deleted. Undo available for {} ms.",
                    self.core.grace_period().as_millis()
                ),
                Some(id),
            ),
            Err(err) => ActionResponse::failure(format!("delete failed: {err}")),
        }
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn undo(&mut self) -> ActionResponse {
        let pending = self.core.pending_id();
        match self.core.undo() {
            Ok(()) => ActionResponse::success("Resident restored.", pending),
            Err(err) => ActionResponse::failure(format!("undo failed: {err}")),
        }
    }

    /// Commits expired deletions. Returns how many were committed.
    #[flutter_rust_bridge::frb(sync)]
    pub fn poll(&mut self) -> u32 {
        u32::try_from(self.core.poll()).unwrap_or(u32::MAX)
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn pending_id(&self) -> Option<String> {
        self.core.pending_id()
    }

    #[flutter_rust_bridge::frb(sync)]
    pub fn snapshot_len(&self) -> u32 {
        u32::try_from(self.core.snapshot_len()).unwrap_or(u32::MAX)
    }

    /// Removes and returns queued soft-delete notifications.
    #[flutter_rust_bridge::frb(sync)]
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.core
            .drain_events()
            .into_iter()
            .map(to_session_event)
            .collect()
    }
}

fn registry_config() -> &'static RegistryConfig {
    REGISTRY_CONFIG.get_or_init(|| {
        RegistryConfig::from_env().unwrap_or_else(|err| {
            warn!("event=config_load module=ffi status=error error={err}");
            RegistryConfig::default()
        })
    })
}

fn authorize(role: &str, permission: Permission) -> Result<(), String> {
    let role = Role::parse(role).map_err(|err| err.to_string())?;
    ensure(role, permission).map_err(|err| err.to_string())
}

fn with_connection<T>(f: impl FnOnce(&Connection) -> Result<T, String>) -> Result<T, String> {
    let conn = open_db(&registry_config().db_path)
        .map_err(|err| format!("registry DB open failed: {err}"))?;
    f(&conn)
}

fn with_resident_service<T>(
    f: impl FnOnce(&ResidentService<SqliteResidentRepository<'_>>) -> Result<T, String>,
) -> Result<T, String> {
    with_connection(|conn| f(&ResidentService::new(SqliteResidentRepository::new(conn))))
}

fn parse_user_id(value: &str) -> Result<registry_core::UserId, String> {
    registry_core::UserId::parse_str(value.trim())
        .map_err(|_| format!("invalid user id `{value}`"))
}

fn parse_item_birthday(value: &str) -> Result<chrono::NaiveDate, String> {
    parse_birthday(value).ok_or_else(|| format!("birthday must be YYYY-MM-DD, got `{value}`"))
}

fn to_view_query(request: ViewRequest) -> Result<ViewQuery, String> {
    let limit = if request.limit.trim().is_empty() {
        ViewLimit::bounded(registry_config().default_view_limit).unwrap_or_default()
    } else {
        ViewLimit::parse(request.limit.as_str())
            .ok_or_else(|| format!("invalid limit `{}`", request.limit))?
    };
    Ok(ViewQuery {
        search_by: request.search_by,
        search_query: request.search_query,
        sort_key: request.sort_key,
        limit,
    })
}

fn to_resident(item: ResidentItem) -> Result<Resident, String> {
    Ok(Resident {
        birthday: parse_item_birthday(&item.birthday)?,
        id: item.id.trim().to_string(),
        name: item.name,
        gender: item.gender,
        contact: item.contact,
        address: item.address,
        employment_status: item.employment_status,
        house_number: item.house_number,
        health: item.health,
        household_count: item.household_count,
    })
}

fn to_resident_patch(input: ResidentPatchInput) -> Result<ResidentPatch, String> {
    let birthday = input
        .birthday
        .as_deref()
        .map(parse_item_birthday)
        .transpose()?;
    Ok(ResidentPatch {
        name: input.name,
        gender: input.gender,
        contact: input.contact,
        address: input.address,
        employment_status: input.employment_status,
        house_number: input.house_number,
        health: input.health,
        birthday,
        household_count: input.household_count,
    })
}

fn to_resident_item(resident: Resident) -> ResidentItem {
    ResidentItem {
        birthday: format_birthday(resident.birthday),
        id: resident.id,
        name: resident.name,
        gender: resident.gender,
        contact: resident.contact,
        address: resident.address,
        employment_status: resident.employment_status,
        house_number: resident.house_number,
        health: resident.health,
        household_count: resident.household_count,
    }
}

fn to_user_item(user: User) -> UserItem {
    UserItem {
        user_id: user.id.to_string(),
        username: user.username,
        role: user.role.as_str().to_string(),
    }
}

fn to_session_event(event: DeletionEvent<Resident>) -> SessionEvent {
    let record_id = event.record_id().to_string();
    let (kind, message) = match &event {
        DeletionEvent::Deleted { .. } => ("deleted", "Resident deleted.".to_string()),
        DeletionEvent::Committed { .. } => ("committed", "Deletion committed.".to_string()),
        DeletionEvent::Restored { .. } => ("restored", "Resident restored.".to_string()),
        DeletionEvent::CommitFailed { reason, .. } => {
            ("commit_failed", format!("Failed to delete resident: {reason}"))
        }
        DeletionEvent::RestoreFailed { reason, .. } => {
            ("restore_failed", format!("Failed to restore resident: {reason}"))
        }
    };
    SessionEvent {
        kind: kind.to_string(),
        record_id,
        message,
    }
}
