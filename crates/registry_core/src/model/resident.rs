//! Resident domain model.
//!
//! # Responsibility
//! - Define the canonical resident record and its wire shape.
//! - Provide name-based attribute lookup used by list views.
//!
//! # Invariants
//! - `id` is stable and never reassigned to another resident.
//! - Every text attribute is non-blank once validated.
//! - Wire names follow the stored schema (`employmentstatus`, `housenum`,
//!   `householdcount`); camelCase aliases are accepted on input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable identifier of a resident, assigned by the registry operator.
pub type ResidentId = String;

/// Date format used for `birthday` in storage, CSV and list views.
pub const BIRTHDAY_FORMAT: &str = "%Y-%m-%d";

/// Fixed attribute set of a resident record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResidentField {
    Id,
    Name,
    Gender,
    Contact,
    Address,
    EmploymentStatus,
    HouseNumber,
    Health,
    Birthday,
    HouseholdCount,
}

impl ResidentField {
    /// All attributes in CSV column order.
    pub const ALL: [ResidentField; 10] = [
        Self::Id,
        Self::Name,
        Self::Gender,
        Self::Contact,
        Self::Address,
        Self::EmploymentStatus,
        Self::HouseNumber,
        Self::Health,
        Self::Birthday,
        Self::HouseholdCount,
    ];

    /// Stable wire/column name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Gender => "gender",
            Self::Contact => "contact",
            Self::Address => "address",
            Self::EmploymentStatus => "employmentstatus",
            Self::HouseNumber => "housenum",
            Self::Health => "health",
            Self::Birthday => "birthday",
            Self::HouseholdCount => "householdcount",
        }
    }

    /// Human-readable column label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "Name",
            Self::Gender => "Gender",
            Self::Contact => "Contact",
            Self::Address => "Address",
            Self::EmploymentStatus => "Employment Status",
            Self::HouseNumber => "House Number",
            Self::Health => "Health",
            Self::Birthday => "Birthday",
            Self::HouseholdCount => "Household Count",
        }
    }

    /// Parses an attribute name.
    ///
    /// Matching ignores ASCII case and `_`, so `employmentStatus`,
    /// `employment_status` and `employmentstatus` all resolve to the same
    /// field. `houseNumber` and `householdCount` are accepted alongside the
    /// wire names. Returns `None` for names outside the fixed set.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|ch| *ch != '_')
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "gender" => Some(Self::Gender),
            "contact" => Some(Self::Contact),
            "address" => Some(Self::Address),
            "employmentstatus" => Some(Self::EmploymentStatus),
            "housenum" | "housenumber" => Some(Self::HouseNumber),
            "health" => Some(Self::Health),
            "birthday" => Some(Self::Birthday),
            "householdcount" => Some(Self::HouseholdCount),
            _ => None,
        }
    }
}

impl Display for ResidentField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation failures for resident write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidentValidationError {
    /// A required text attribute is empty or whitespace only.
    BlankField(ResidentField),
}

impl Display for ResidentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "resident field `{field}` is required"),
        }
    }
}

impl Error for ResidentValidationError {}

/// Canonical resident record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub id: ResidentId,
    pub name: String,
    pub gender: String,
    pub contact: String,
    pub address: String,
    #[serde(rename = "employmentstatus", alias = "employmentStatus")]
    pub employment_status: String,
    #[serde(rename = "housenum", alias = "houseNumber")]
    pub house_number: String,
    pub health: String,
    /// Serialized as `YYYY-MM-DD`.
    pub birthday: NaiveDate,
    #[serde(rename = "householdcount", alias = "householdCount")]
    pub household_count: u32,
}

impl Resident {
    /// Checks write-path invariants.
    ///
    /// # Errors
    /// - Returns the first blank text attribute in column order.
    pub fn validate(&self) -> Result<(), ResidentValidationError> {
        let text_fields = [
            (ResidentField::Id, &self.id),
            (ResidentField::Name, &self.name),
            (ResidentField::Gender, &self.gender),
            (ResidentField::Contact, &self.contact),
            (ResidentField::Address, &self.address),
            (ResidentField::EmploymentStatus, &self.employment_status),
            (ResidentField::HouseNumber, &self.house_number),
            (ResidentField::Health, &self.health),
        ];
        for (field, value) in text_fields {
            if value.trim().is_empty() {
                return Err(ResidentValidationError::BlankField(field));
            }
        }
        Ok(())
    }

    /// Returns the stringified value of one attribute.
    pub fn field_value(&self, field: ResidentField) -> Cow<'_, str> {
        match field {
            ResidentField::Id => Cow::Borrowed(self.id.as_str()),
            ResidentField::Name => Cow::Borrowed(self.name.as_str()),
            ResidentField::Gender => Cow::Borrowed(self.gender.as_str()),
            ResidentField::Contact => Cow::Borrowed(self.contact.as_str()),
            ResidentField::Address => Cow::Borrowed(self.address.as_str()),
            ResidentField::EmploymentStatus => Cow::Borrowed(self.employment_status.as_str()),
            ResidentField::HouseNumber => Cow::Borrowed(self.house_number.as_str()),
            ResidentField::Health => Cow::Borrowed(self.health.as_str()),
            ResidentField::Birthday => Cow::Owned(format_birthday(self.birthday)),
            ResidentField::HouseholdCount => Cow::Owned(self.household_count.to_string()),
        }
    }
}

/// Formats a birthday using [`BIRTHDAY_FORMAT`].
pub fn format_birthday(date: NaiveDate) -> String {
    date.format(BIRTHDAY_FORMAT).to_string()
}

/// Parses a birthday using [`BIRTHDAY_FORMAT`].
pub fn parse_birthday(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), BIRTHDAY_FORMAT).ok()
}
