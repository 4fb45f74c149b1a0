//! Resident repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and upsert over the `residents` table.
//! - Serve as the [`RecordStore`] behind the soft-delete coordinator.
//!
//! # Invariants
//! - Write paths call `Resident::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Lists are ordered by `id ASC`.

use crate::model::resident::{format_birthday, parse_birthday, Resident};
use crate::repo::{is_unique_violation, RepoError, RepoResult};
use crate::undo::store::RecordStore;
use rusqlite::{params, Connection, Row};

const RESIDENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    gender,
    contact,
    address,
    employmentstatus,
    housenum,
    health,
    birthday,
    householdcount
FROM residents";

/// Repository interface for resident persistence.
pub trait ResidentRepository {
    /// Inserts a new resident. Fails with `Duplicate` when the id exists.
    fn create_resident(&self, resident: &Resident) -> RepoResult<()>;
    /// Replaces every attribute of an existing resident.
    fn update_resident(&self, resident: &Resident) -> RepoResult<()>;
    /// Inserts or fully replaces a resident.
    fn upsert_resident(&self, resident: &Resident) -> RepoResult<()>;
    fn get_resident(&self, id: &str) -> RepoResult<Option<Resident>>;
    fn list_residents(&self) -> RepoResult<Vec<Resident>>;
    /// Permanently deletes a resident. Fails with `NotFound` when absent.
    fn delete_resident(&self, id: &str) -> RepoResult<()>;
}

/// SQLite-backed resident repository.
pub struct SqliteResidentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteResidentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ResidentRepository for SqliteResidentRepository<'_> {
    fn create_resident(&self, resident: &Resident) -> RepoResult<()> {
        resident.validate()?;

        let result = self.conn.execute(
            "INSERT INTO residents (
                id,
                name,
                gender,
                contact,
                address,
                employmentstatus,
                housenum,
                health,
                birthday,
                householdcount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                resident.id.as_str(),
                resident.name.as_str(),
                resident.gender.as_str(),
                resident.contact.as_str(),
                resident.address.as_str(),
                resident.employment_status.as_str(),
                resident.house_number.as_str(),
                resident.health.as_str(),
                format_birthday(resident.birthday),
                resident.household_count,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Duplicate(resident.id.clone())),
            Err(err) => Err(err.into()),
        }
    }

    fn update_resident(&self, resident: &Resident) -> RepoResult<()> {
        resident.validate()?;

        let changed = self.conn.execute(
            "UPDATE residents
             SET
                name = ?1,
                gender = ?2,
                contact = ?3,
                address = ?4,
                employmentstatus = ?5,
                housenum = ?6,
                health = ?7,
                birthday = ?8,
                householdcount = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?10;",
            params![
                resident.name.as_str(),
                resident.gender.as_str(),
                resident.contact.as_str(),
                resident.address.as_str(),
                resident.employment_status.as_str(),
                resident.house_number.as_str(),
                resident.health.as_str(),
                format_birthday(resident.birthday),
                resident.household_count,
                resident.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(resident.id.clone()));
        }

        Ok(())
    }

    fn upsert_resident(&self, resident: &Resident) -> RepoResult<()> {
        resident.validate()?;

        self.conn.execute(
            "INSERT INTO residents (
                id,
                name,
                gender,
                contact,
                address,
                employmentstatus,
                housenum,
                health,
                birthday,
                householdcount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                gender = excluded.gender,
                contact = excluded.contact,
                address = excluded.address,
                employmentstatus = excluded.employmentstatus,
                housenum = excluded.housenum,
                health = excluded.health,
                birthday = excluded.birthday,
                householdcount = excluded.householdcount,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                resident.id.as_str(),
                resident.name.as_str(),
                resident.gender.as_str(),
                resident.contact.as_str(),
                resident.address.as_str(),
                resident.employment_status.as_str(),
                resident.house_number.as_str(),
                resident.health.as_str(),
                format_birthday(resident.birthday),
                resident.household_count,
            ],
        )?;

        Ok(())
    }

    fn get_resident(&self, id: &str) -> RepoResult<Option<Resident>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RESIDENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_resident_row(row)?));
        }
        Ok(None)
    }

    fn list_residents(&self) -> RepoResult<Vec<Resident>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RESIDENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut residents = Vec::new();
        while let Some(row) = rows.next()? {
            residents.push(parse_resident_row(row)?);
        }
        Ok(residents)
    }

    fn delete_resident(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM residents WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

impl RecordStore<Resident> for SqliteResidentRepository<'_> {
    type Error = RepoError;

    fn fetch_all(&self) -> Result<Vec<Resident>, RepoError> {
        self.list_residents()
    }

    fn commit_delete(&self, id: &str) -> Result<(), RepoError> {
        self.delete_resident(id)
    }

    fn restore(&self, record: &Resident) -> Result<(), RepoError> {
        self.upsert_resident(record)
    }
}

fn parse_resident_row(row: &Row<'_>) -> RepoResult<Resident> {
    let id: String = row.get("id")?;

    let birthday_text: String = row.get("birthday")?;
    let birthday = parse_birthday(&birthday_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid birthday `{birthday_text}` in residents.birthday for {id}"
        ))
    })?;

    let household_count = match row.get::<_, i64>("householdcount")? {
        value if value >= 0 => u32::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!(
                "householdcount `{value}` out of range for {id}"
            ))
        })?,
        other => {
            return Err(RepoError::InvalidData(format!(
                "negative householdcount `{other}` for {id}"
            )));
        }
    };

    let resident = Resident {
        id,
        name: row.get("name")?,
        gender: row.get("gender")?,
        contact: row.get("contact")?,
        address: row.get("address")?,
        employment_status: row.get("employmentstatus")?,
        house_number: row.get("housenum")?,
        health: row.get("health")?,
        birthday,
        household_count,
    };
    resident.validate()?;
    Ok(resident)
}
