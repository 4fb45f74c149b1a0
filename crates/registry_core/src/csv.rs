//! CSV codec for resident import/export.
//!
//! # Responsibility
//! - Encode residents into the registry's ten-column CSV layout.
//! - Decode CSV text into typed rows with line numbers for diagnostics.
//!
//! # Invariants
//! - Column order always follows `ResidentField::ALL`.
//! - Fields containing `,`, `"`, CR or LF are quoted with `"` doubled.
//! - Decoding never panics on malformed input.
//! - A `"` is only legal as the first character of a field or doubled inside
//!   a quoted field. A closing quote must be followed by `,` or a line end.

use crate::model::resident::{parse_birthday, Resident, ResidentField};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Birthday layout written by older exports (`M/D/YYYY`).
const LEGACY_BIRTHDAY_FORMAT: &str = "%m/%d/%Y";

/// CSV codec errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvError {
    /// Input holds no rows at all.
    EmptyInput,
    /// There are no residents to export.
    NothingToExport,
    UnterminatedQuote { line: usize },
    /// Stray `"` in an unquoted field, or text after a closing quote.
    MisplacedQuote { line: usize },
    WrongColumnCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    InvalidBirthday { line: usize, value: String },
    InvalidHouseholdCount { line: usize, value: String },
}

impl Display for CsvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "CSV input is empty"),
            Self::NothingToExport => write!(f, "no residents available to export"),
            Self::UnterminatedQuote { line } => {
                write!(f, "line {line}: quoted field is not terminated")
            }
            Self::MisplacedQuote { line } => {
                write!(f, "line {line}: quote character in unexpected position")
            }
            Self::WrongColumnCount {
                line,
                expected,
                found,
            } => write!(f, "line {line}: expected {expected} columns, found {found}"),
            Self::InvalidBirthday { line, value } => {
                write!(f, "line {line}: invalid birthday `{value}`")
            }
            Self::InvalidHouseholdCount { line, value } => {
                write!(f, "line {line}: invalid household count `{value}`")
            }
        }
    }
}

impl Error for CsvError {}

/// One decoded CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line where the row starts.
    pub line: usize,
    pub fields: Vec<String>,
}

impl CsvRow {
    /// Whether every field is empty (e.g. a trailing newline).
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|field| field.trim().is_empty())
    }
}

/// Encodes residents with a header row. Rows are joined by `\n`.
///
/// # Errors
/// - `NothingToExport` when `residents` is empty.
pub fn encode_residents(residents: &[Resident]) -> Result<String, CsvError> {
    if residents.is_empty() {
        return Err(CsvError::NothingToExport);
    }

    let header = ResidentField::ALL
        .iter()
        .map(|field| escape_field(field.label()))
        .collect::<Vec<_>>()
        .join(",");
    let mut lines = Vec::with_capacity(residents.len() + 1);
    lines.push(header);
    for resident in residents {
        let row = ResidentField::ALL
            .iter()
            .map(|field| escape_field(&resident.field_value(*field)))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }
    Ok(lines.join("\n"))
}

/// Splits CSV text into rows.
///
/// # Errors
/// - `EmptyInput` when `text` is empty or whitespace only.
/// - `UnterminatedQuote` when a quoted field runs to end of input.
/// - `MisplacedQuote` for `a"b` style fields and for `"a"b` where text
///   follows the closing quote.
pub fn parse_rows(text: &str) -> Result<Vec<CsvRow>, CsvError> {
    if text.trim().is_empty() {
        return Err(CsvError::EmptyInput);
    }

    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut quote_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            ',' => {
                fields.push(std::mem::take(&mut field));
                after_quote = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                after_quote = false;
                fields.push(std::mem::take(&mut field));
                rows.push(CsvRow {
                    line: row_line,
                    fields: std::mem::take(&mut fields),
                });
                line += 1;
                row_line = line;
            }
            _ if after_quote => return Err(CsvError::MisplacedQuote { line }),
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            '"' => return Err(CsvError::MisplacedQuote { line }),
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote { line: quote_line });
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        rows.push(CsvRow {
            line: row_line,
            fields,
        });
    }
    Ok(rows)
}

/// Converts one data row into a resident.
///
/// Text attributes are trimmed; blank values are left for
/// `Resident::validate()` to reject. Birthdays accept `YYYY-MM-DD` and the
/// legacy `M/D/YYYY` layout.
pub fn resident_from_row(row: &CsvRow) -> Result<Resident, CsvError> {
    let expected = ResidentField::ALL.len();
    if row.fields.len() != expected {
        return Err(CsvError::WrongColumnCount {
            line: row.line,
            expected,
            found: row.fields.len(),
        });
    }

    let text = |index: usize| row.fields[index].trim().to_string();
    let birthday_raw = text(8);
    let birthday = parse_csv_birthday(&birthday_raw).ok_or(CsvError::InvalidBirthday {
        line: row.line,
        value: birthday_raw.clone(),
    })?;
    let count_raw = text(9);
    let household_count = count_raw
        .parse::<u32>()
        .map_err(|_| CsvError::InvalidHouseholdCount {
            line: row.line,
            value: count_raw.clone(),
        })?;

    Ok(Resident {
        id: text(0),
        name: text(1),
        gender: text(2),
        contact: text(3),
        address: text(4),
        employment_status: text(5),
        house_number: text(6),
        health: text(7),
        birthday,
        household_count,
    })
}

fn parse_csv_birthday(value: &str) -> Option<NaiveDate> {
    parse_birthday(value).or_else(|| NaiveDate::parse_from_str(value, LEGACY_BIRTHDAY_FORMAT).ok())
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
