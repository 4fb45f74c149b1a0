//! Permission declarations and the role → permission table.

use crate::model::user::Role;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One gated registry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    ViewResidents,
    CreateResident,
    UpdateResident,
    DeleteResident,
    ImportCsv,
    ExportCsv,
    GenerateQr,
    ViewAnalytics,
    ManageUsers,
}

/// Permission string id for viewing resident lists.
pub const PERMISSION_VIEW_RESIDENTS: &str = "residents.view";
pub const PERMISSION_CREATE_RESIDENT: &str = "residents.create";
pub const PERMISSION_UPDATE_RESIDENT: &str = "residents.update";
pub const PERMISSION_DELETE_RESIDENT: &str = "residents.delete";
pub const PERMISSION_IMPORT_CSV: &str = "residents.import";
pub const PERMISSION_EXPORT_CSV: &str = "residents.export";
pub const PERMISSION_GENERATE_QR: &str = "residents.qr";
pub const PERMISSION_VIEW_ANALYTICS: &str = "analytics.view";
pub const PERMISSION_MANAGE_USERS: &str = "users.manage";

const VIEWER_PERMISSIONS: &[Permission] =
    &[Permission::ViewResidents, Permission::ViewAnalytics];

const EDITOR_PERMISSIONS: &[Permission] = &[
    Permission::ViewResidents,
    Permission::ViewAnalytics,
    Permission::CreateResident,
    Permission::UpdateResident,
];

impl Permission {
    /// Stable string id.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewResidents => PERMISSION_VIEW_RESIDENTS,
            Self::CreateResident => PERMISSION_CREATE_RESIDENT,
            Self::UpdateResident => PERMISSION_UPDATE_RESIDENT,
            Self::DeleteResident => PERMISSION_DELETE_RESIDENT,
            Self::ImportCsv => PERMISSION_IMPORT_CSV,
            Self::ExportCsv => PERMISSION_EXPORT_CSV,
            Self::GenerateQr => PERMISSION_GENERATE_QR,
            Self::ViewAnalytics => PERMISSION_VIEW_ANALYTICS,
            Self::ManageUsers => PERMISSION_MANAGE_USERS,
        }
    }

    /// Returns whether `role` holds this permission.
    pub fn granted_to(self, role: Role) -> bool {
        match role {
            Role::Admin => true,
            Role::Editor => EDITOR_PERMISSIONS.contains(&self),
            Role::Viewer => VIEWER_PERMISSIONS.contains(&self),
        }
    }
}

/// Parses one permission from its string id.
pub fn parse_permission(value: &str) -> Result<Permission, AccessError> {
    match value.trim() {
        PERMISSION_VIEW_RESIDENTS => Ok(Permission::ViewResidents),
        PERMISSION_CREATE_RESIDENT => Ok(Permission::CreateResident),
        PERMISSION_UPDATE_RESIDENT => Ok(Permission::UpdateResident),
        PERMISSION_DELETE_RESIDENT => Ok(Permission::DeleteResident),
        PERMISSION_IMPORT_CSV => Ok(Permission::ImportCsv),
        PERMISSION_EXPORT_CSV => Ok(Permission::ExportCsv),
        PERMISSION_GENERATE_QR => Ok(Permission::GenerateQr),
        PERMISSION_VIEW_ANALYTICS => Ok(Permission::ViewAnalytics),
        PERMISSION_MANAGE_USERS => Ok(Permission::ManageUsers),
        other => Err(AccessError::UnsupportedPermission(other.to_string())),
    }
}

/// Checks that `role` may perform `permission`.
///
/// # Errors
/// - `Denied` when the role lacks the permission.
pub fn ensure(role: Role, permission: Permission) -> Result<(), AccessError> {
    if permission.granted_to(role) {
        return Ok(());
    }
    warn!(
        "event=access_denied module=access status=error role={} permission={}",
        role.as_str(),
        permission.as_str()
    );
    Err(AccessError::Denied { role, permission })
}

/// Access gate errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    Denied { role: Role, permission: Permission },
    UnsupportedPermission(String),
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied { role, permission } => write!(
                f,
                "role `{}` is not allowed to perform `{}`",
                role.as_str(),
                permission.as_str()
            ),
            Self::UnsupportedPermission(value) => write!(f, "permission is unsupported: {value}"),
        }
    }
}

impl Error for AccessError {}
