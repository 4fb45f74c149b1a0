//! Name-based attribute access for viewable records.

use crate::model::resident::{Resident, ResidentField};
use crate::model::user::User;
use std::borrow::Cow;

/// How a search query is matched against one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Lower-cased value must contain the lower-cased query.
    Contains,
    /// Lower-cased value must equal the lower-cased query. An empty query
    /// matches nothing.
    Exact,
}

/// Read access to record attributes by name.
pub trait AttributeSource {
    /// Returns the stringified attribute value, or `None` when `name` is not
    /// an attribute of this record type.
    fn attribute(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Match mode used when filtering on `name`.
    fn match_mode(_name: &str) -> MatchMode
    where
        Self: Sized,
    {
        MatchMode::Contains
    }
}

/// A record with stable identity inside a snapshot.
pub trait Record: AttributeSource {
    fn record_id(&self) -> &str;
}

impl AttributeSource for Resident {
    fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        ResidentField::parse(name).map(|field| self.field_value(field))
    }

    fn match_mode(name: &str) -> MatchMode {
        match ResidentField::parse(name) {
            Some(ResidentField::Gender) => MatchMode::Exact,
            _ => MatchMode::Contains,
        }
    }
}

impl Record for Resident {
    fn record_id(&self) -> &str {
        self.id.as_str()
    }
}

impl AttributeSource for User {
    fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
        match name.trim().to_ascii_lowercase().as_str() {
            "id" => Some(Cow::Owned(self.id.to_string())),
            "username" => Some(Cow::Borrowed(self.username.as_str())),
            "role" => Some(Cow::Borrowed(self.role.as_str())),
            _ => None,
        }
    }

    fn match_mode(name: &str) -> MatchMode {
        if name.trim().eq_ignore_ascii_case("role") {
            MatchMode::Exact
        } else {
            MatchMode::Contains
        }
    }
}
