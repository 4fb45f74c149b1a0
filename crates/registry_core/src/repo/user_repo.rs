//! Operator account repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `username` uniqueness is enforced by storage and surfaced as
//!   `RepoError::Duplicate`.
//! - Stored roles must parse; unknown values are rejected as invalid data.

use crate::model::user::{Role, User, UserId};
use crate::repo::{is_unique_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT id, username, password_hash, role FROM users";

/// Repository interface for operator accounts.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Lists accounts ordered by username.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn update_role(&self, id: UserId, role: Role) -> RepoResult<()>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
}

/// SQLite-backed account repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        let result = self.conn.execute(
            "INSERT INTO users (id, username, password_hash, role) VALUES (?1, ?2, ?3, ?4);",
            params![
                user.id.to_string(),
                user.username.as_str(),
                user.password_hash.as_str(),
                user.role.as_str(),
            ],
        );
        match result {
            Ok(_) => Ok(user.id),
            Err(err) if is_unique_violation(&err) => {
                Err(RepoError::Duplicate(user.username.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_user_columns,
            )
            .optional()?;
        row.map(parse_user_columns).transpose()
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
                [username],
                read_user_columns,
            )
            .optional()?;
        row.map(parse_user_columns).transpose()
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY username ASC;"))?;
        let rows = stmt.query_map([], read_user_columns)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(parse_user_columns(row?)?);
        }
        Ok(users)
    }

    fn update_role(&self, id: UserId, role: Role) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users SET role = ?1 WHERE id = ?2;",
            params![role.as_str(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

type UserColumns = (String, String, String, String);

fn read_user_columns(row: &Row<'_>) -> rusqlite::Result<UserColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn parse_user_columns(columns: UserColumns) -> RepoResult<User> {
    let (id_text, username, password_hash, role_text) = columns;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in users.id"))
    })?;
    let role = Role::parse(&role_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in users.role"))
    })?;
    Ok(User {
        id,
        username,
        password_hash,
        role,
    })
}
