//! Resident use-case service.
//!
//! # Responsibility
//! - Provide create/get/list/update/delete/upsert over residents.
//! - Build QR payloads and labels for stored residents.
//! - Move residents in and out of CSV text.
//!
//! # Invariants
//! - `id` is immutable; `update` never changes it.
//! - Every write is validated before it reaches storage.
//! - CSV import stops at the first failing row; earlier rows stay created.

use crate::csv::{encode_residents, parse_rows, resident_from_row, CsvError};
use crate::model::resident::{Resident, ResidentId, ResidentValidationError};
use crate::repo::resident_repo::ResidentRepository;
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for resident use-cases.
#[derive(Debug)]
pub enum ResidentServiceError {
    Validation(ResidentValidationError),
    /// Another resident already holds this id.
    AlreadyExists(ResidentId),
    NotFound(ResidentId),
    Csv(CsvError),
    /// A CSV data row was decoded but could not be stored.
    ImportRowFailed {
        line: usize,
        source: Box<ResidentServiceError>,
    },
    Payload(serde_json::Error),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ResidentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::AlreadyExists(id) => write!(f, "resident already exists: {id}"),
            Self::NotFound(id) => write!(f, "resident not found: {id}"),
            Self::Csv(err) => write!(f, "{err}"),
            Self::ImportRowFailed { line, source } => write!(f, "line {line}: {source}"),
            Self::Payload(err) => write!(f, "failed to encode QR payload: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent resident state: {details}")
            }
        }
    }
}

impl Error for ResidentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Csv(err) => Some(err),
            Self::ImportRowFailed { source, .. } => Some(source.as_ref()),
            Self::Payload(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::AlreadyExists(_) | Self::NotFound(_) | Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for ResidentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Duplicate(id) => Self::AlreadyExists(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ResidentValidationError> for ResidentServiceError {
    fn from(value: ResidentValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<CsvError> for ResidentServiceError {
    fn from(value: CsvError) -> Self {
        Self::Csv(value)
    }
}

/// Partial resident update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidentPatch {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub employment_status: Option<String>,
    pub house_number: Option<String>,
    pub health: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub household_count: Option<u32>,
}

impl ResidentPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply(self, resident: &mut Resident) {
        let replace = |slot: &mut String, value: Option<String>| {
            if let Some(value) = value {
                *slot = value;
            }
        };
        replace(&mut resident.name, self.name);
        replace(&mut resident.gender, self.gender);
        replace(&mut resident.contact, self.contact);
        replace(&mut resident.address, self.address);
        replace(&mut resident.employment_status, self.employment_status);
        replace(&mut resident.house_number, self.house_number);
        replace(&mut resident.health, self.health);
        if let Some(birthday) = self.birthday {
            resident.birthday = birthday;
        }
        if let Some(count) = self.household_count {
            resident.household_count = count;
        }
    }
}

/// Outcome of a successful CSV import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Ids created, in file order.
    pub created: Vec<ResidentId>,
    /// Blank data rows that were skipped.
    pub skipped_blank: usize,
}

/// Data encoded into a resident QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QrPayload<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub address: &'a str,
    pub housenum: &'a str,
}

impl<'a> From<&'a Resident> for QrPayload<'a> {
    fn from(resident: &'a Resident) -> Self {
        Self {
            id: resident.id.as_str(),
            name: resident.name.as_str(),
            address: resident.address.as_str(),
            housenum: resident.house_number.as_str(),
        }
    }
}

/// Human-readable label shown next to a QR code.
pub fn qr_label(resident: &Resident) -> String {
    format!(
        "Resident Details\n ID: {}\n Name: {}\n Address: {}",
        resident.id, resident.name, resident.address
    )
}

/// Resident service facade over repository implementations.
pub struct ResidentService<R: ResidentRepository> {
    repo: R,
}

impl<R: ResidentRepository> ResidentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Stores a new resident.
    ///
    /// # Errors
    /// - `Validation` when a required attribute is blank.
    /// - `AlreadyExists` when the id is taken.
    pub fn create(&self, resident: &Resident) -> Result<Resident, ResidentServiceError> {
        self.repo.create_resident(resident)?;
        info!(
            "event=resident_create module=service status=ok id={}",
            resident.id
        );
        self.read_back(&resident.id, "created resident not found in read-back")
    }

    pub fn get(&self, id: &str) -> Result<Option<Resident>, ResidentServiceError> {
        Ok(self.repo.get_resident(id)?)
    }

    /// Lists every resident ordered by id.
    pub fn list(&self) -> Result<Vec<Resident>, ResidentServiceError> {
        Ok(self.repo.list_residents()?)
    }

    /// Applies `patch` to the stored resident and returns the result.
    pub fn update(
        &self,
        id: &str,
        patch: ResidentPatch,
    ) -> Result<Resident, ResidentServiceError> {
        let mut resident = self
            .repo
            .get_resident(id)?
            .ok_or_else(|| ResidentServiceError::NotFound(id.to_string()))?;
        if patch.is_empty() {
            return Ok(resident);
        }

        patch.apply(&mut resident);
        resident.validate()?;
        self.repo.update_resident(&resident)?;
        info!("event=resident_update module=service status=ok id={id}");
        self.read_back(id, "updated resident not found in read-back")
    }

    /// Permanently deletes one resident.
    pub fn delete(&self, id: &str) -> Result<(), ResidentServiceError> {
        self.repo.delete_resident(id)?;
        info!("event=resident_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Inserts or fully replaces one resident.
    pub fn upsert(&self, resident: &Resident) -> Result<Resident, ResidentServiceError> {
        self.repo.upsert_resident(resident)?;
        self.read_back(&resident.id, "upserted resident not found in read-back")
    }

    /// JSON document `{id, name, address, housenum}` for the QR encoder.
    pub fn qr_payload(&self, id: &str) -> Result<String, ResidentServiceError> {
        let resident = self
            .repo
            .get_resident(id)?
            .ok_or_else(|| ResidentServiceError::NotFound(id.to_string()))?;
        serde_json::to_string(&QrPayload::from(&resident)).map_err(ResidentServiceError::Payload)
    }

    /// Exports every resident as CSV text with a header row.
    pub fn export_csv(&self) -> Result<String, ResidentServiceError> {
        let residents = self.repo.list_residents()?;
        let text = encode_residents(&residents)?;
        info!(
            "event=csv_export module=service status=ok rows={}",
            residents.len()
        );
        Ok(text)
    }

    /// Creates one resident per CSV data row.
    ///
    /// The first row is a header. Blank rows are skipped.
    ///
    /// # Errors
    /// - `Csv(EmptyInput)` when the text holds no rows.
    /// - `Csv(..)` for a malformed row, carrying its line.
    /// - `ImportRowFailed` when a decoded row cannot be created.
    pub fn import_csv(&self, text: &str) -> Result<ImportReport, ResidentServiceError> {
        let rows = parse_rows(text)?;
        if rows.iter().all(|row| row.is_blank()) {
            return Err(CsvError::EmptyInput.into());
        }

        let mut report = ImportReport::default();
        for row in rows.iter().skip(1) {
            if row.is_blank() {
                report.skipped_blank += 1;
                continue;
            }

            let resident = resident_from_row(row).inspect_err(|err| {
                warn!(
                    "event=csv_import module=service status=error line={} reason={err}",
                    row.line
                );
            })?;
            if let Err(err) = self.repo.create_resident(&resident) {
                warn!(
                    "event=csv_import module=service status=error line={} created={}",
                    row.line,
                    report.created.len()
                );
                return Err(ResidentServiceError::ImportRowFailed {
                    line: row.line,
                    source: Box::new(err.into()),
                });
            }
            report.created.push(resident.id);
        }

        info!(
            "event=csv_import module=service status=ok created={} skipped_blank={}",
            report.created.len(),
            report.skipped_blank
        );
        Ok(report)
    }

    fn read_back(
        &self,
        id: &str,
        missing: &'static str,
    ) -> Result<Resident, ResidentServiceError> {
        self.repo
            .get_resident(id)?
            .ok_or(ResidentServiceError::InconsistentState(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::{qr_label, ResidentPatch, ResidentService, ResidentServiceError};
    use crate::csv::CsvError;
    use crate::db::open_db_in_memory;
    use crate::model::resident::{Resident, ResidentField, ResidentValidationError};
    use crate::repo::resident_repo::SqliteResidentRepository;
    use chrono::NaiveDate;

    fn resident(id: &str, name: &str) -> Resident {
        Resident {
            id: id.to_string(),
            name: name.to_string(),
            gender: "Female".to_string(),
            contact: "0917-000-0000".to_string(),
            address: "Purok 1".to_string(),
            employment_status: "Employed".to_string(),
            house_number: "12".to_string(),
            health: "Healthy".to_string(),
            birthday: NaiveDate::from_ymd_opt(1990, 4, 2).expect("valid date"),
            household_count: 4,
        }
    }

    #[test]
    fn update_applies_only_present_fields() {
        let conn = open_db_in_memory().expect("open db");
        let service = ResidentService::new(SqliteResidentRepository::new(&conn));
        service.create(&resident("R-1", "Ana")).expect("create");

        let updated = service
            .update(
                "R-1",
                ResidentPatch {
                    health: Some("Hypertension".to_string()),
                    household_count: Some(6),
                    ..ResidentPatch::default()
                },
            )
            .expect("update");

        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.health, "Hypertension");
        assert_eq!(updated.household_count, 6);
    }

    #[test]
    fn update_rejects_blanking_a_required_field() {
        let conn = open_db_in_memory().expect("open db");
        let service = ResidentService::new(SqliteResidentRepository::new(&conn));
        service.create(&resident("R-1", "Ana")).expect("create");

        let err = service
            .update(
                "R-1",
                ResidentPatch {
                    name: Some("  ".to_string()),
                    ..ResidentPatch::default()
                },
            )
            .expect_err("blank name must fail");
        assert!(matches!(
            err,
            ResidentServiceError::Validation(ResidentValidationError::BlankField(
                ResidentField::Name
            ))
        ));
        let stored = service.get("R-1").expect("get").expect("exists");
        assert_eq!(stored.name, "Ana");
    }

    #[test]
    fn qr_payload_carries_wire_names() {
        let conn = open_db_in_memory().expect("open db");
        let service = ResidentService::new(SqliteResidentRepository::new(&conn));
        service.create(&resident("R-1", "Ana")).expect("create");

        let payload = service.qr_payload("R-1").expect("payload");
        let value: serde_json::Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(value["id"], "R-1");
        assert_eq!(value["name"], "Ana");
        assert_eq!(value["address"], "Purok 1");
        assert_eq!(value["housenum"], "12");
        assert_eq!(value.as_object().map(|map| map.len()), Some(4));

        assert!(matches!(
            service.qr_payload("R-9"),
            Err(ResidentServiceError::NotFound(id)) if id == "R-9"
        ));
    }

    #[test]
    fn qr_label_lists_id_name_and_address() {
        let label = qr_label(&resident("R-1", "Ana"));
        assert!(label.starts_with("Resident Details\n"));
        assert!(label.contains("ID: R-1"));
        assert!(label.contains("Name: Ana"));
        assert!(label.contains("Address: Purok 1"));
    }

    #[test]
    fn import_reports_line_of_duplicate_row() {
        let conn = open_db_in_memory().expect("open db");
        let service = ResidentService::new(SqliteResidentRepository::new(&conn));
        let csv = "ID,Name,Gender,Contact,Address,Employment Status,House Number,Health,Birthday,Household Count\n\
R-1,Ana,Female,1,Purok 1,Employed,12,Healthy,1990-04-02,4\n\
\n\
R-1,Ben,Male,2,Purok 2,Student,13,Healthy,2001-01-01,2\n";

        let err = service.import_csv(csv).expect_err("duplicate must abort");
        match err {
            ResidentServiceError::ImportRowFailed { line, source } => {
                assert_eq!(line, 4);
                assert!(matches!(*source, ResidentServiceError::AlreadyExists(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(service.list().expect("list").len(), 1);
    }

    #[test]
    fn import_of_empty_text_is_rejected() {
        let conn = open_db_in_memory().expect("open db");
        let service = ResidentService::new(SqliteResidentRepository::new(&conn));
        assert!(matches!(
            service.import_csv(""),
            Err(ResidentServiceError::Csv(CsvError::EmptyInput))
        ));
    }
}
