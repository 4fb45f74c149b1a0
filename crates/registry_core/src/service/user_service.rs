//! Operator account use-cases.
//!
//! # Responsibility
//! - Register, authenticate and administer operator accounts.
//! - Seed the default admin/editor/viewer accounts on first start.
//!
//! # Invariants
//! - Unknown usernames and wrong passwords produce the same error.
//! - Seeding never overwrites an existing account.

use crate::model::user::{Role, User, UserId};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Accounts created by [`UserService::seed_default_users`].
pub const DEFAULT_USERS: [(&str, &str, Role); 3] = [
    ("admin", "admin123", Role::Admin),
    ("editor", "editor123", Role::Editor),
    ("viewer", "viewer123", Role::Viewer),
];

/// Service error for account use-cases.
#[derive(Debug)]
pub enum UserServiceError {
    /// A required registration field is blank.
    MissingField(&'static str),
    /// Username already taken.
    AlreadyExists(String),
    InvalidCredentials,
    NotFound(UserId),
    Repo(RepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::AlreadyExists(username) => write!(f, "username already exists: {username}"),
            Self::InvalidCredentials => write!(f, "invalid username or password"),
            Self::NotFound(id) => write!(f, "user not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Duplicate(username) => Self::AlreadyExists(username),
            other => Self::Repo(other),
        }
    }
}

/// Account service facade over repository implementations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a new account.
    ///
    /// # Errors
    /// - `MissingField` for a blank username or password.
    /// - `AlreadyExists` when the username is taken.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, UserServiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(UserServiceError::MissingField("username"));
        }
        if password.is_empty() {
            return Err(UserServiceError::MissingField("password"));
        }

        let user = User::new(username, password, role);
        self.repo.create_user(&user)?;
        info!(
            "event=user_register module=service status=ok user_id={} role={}",
            user.id, user.role
        );
        Ok(user)
    }

    /// Verifies credentials and returns the account.
    pub fn login(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        match self.repo.find_by_username(username.trim())? {
            Some(user) if user.verify_password(password) => {
                info!(
                    "event=user_login module=service status=ok user_id={} role={}",
                    user.id, user.role
                );
                Ok(user)
            }
            _ => {
                warn!("event=user_login module=service status=error reason=invalid_credentials");
                Err(UserServiceError::InvalidCredentials)
            }
        }
    }

    pub fn list(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repo.list_users()?)
    }

    pub fn update_role(&self, id: UserId, role: Role) -> Result<User, UserServiceError> {
        self.repo.update_role(id, role).map_err(|err| match err {
            RepoError::NotFound(_) => UserServiceError::NotFound(id),
            other => other.into(),
        })?;
        self.repo
            .get_user(id)?
            .ok_or(UserServiceError::NotFound(id))
    }

    pub fn delete(&self, id: UserId) -> Result<(), UserServiceError> {
        self.repo.delete_user(id).map_err(|err| match err {
            RepoError::NotFound(_) => UserServiceError::NotFound(id),
            other => other.into(),
        })?;
        info!("event=user_delete module=service status=ok user_id={id}");
        Ok(())
    }

    /// Creates any missing [`DEFAULT_USERS`] and returns how many were added.
    pub fn seed_default_users(&self) -> Result<usize, UserServiceError> {
        let mut created = 0;
        for (username, password, role) in DEFAULT_USERS {
            if self.repo.find_by_username(username)?.is_some() {
                continue;
            }
            self.register(username, password, role)?;
            created += 1;
        }
        info!("event=user_seed module=service status=ok created={created}");
        Ok(created)
    }
}
