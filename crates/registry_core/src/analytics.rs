//! Chart-ready aggregates over resident snapshots.
//!
//! # Responsibility
//! - Compute dashboard totals and per-chart series from a resident list.
//! - Keep label order deterministic: first-seen order unless noted.
//!
//! # Invariants
//! - Every function is pure over its input slice.
//! - Categorical matching (gender, employment) ignores ASCII case and
//!   surrounding whitespace.

use crate::model::resident::Resident;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Headline numbers shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DashboardTotals {
    pub residents: usize,
    /// Distinct house numbers.
    pub households: usize,
    pub male: usize,
    pub female: usize,
}

/// Residents per employment category. Other values are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EmploymentBreakdown {
    pub employed: usize,
    pub unemployed: usize,
    pub student: usize,
    pub retiree: usize,
}

/// One labelled count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Household size of one `address`/`house_number` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressHousehold {
    pub address: String,
    pub house_number: String,
    pub household_count: u32,
}

/// Mean household count of residents sharing a house number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseAverage {
    pub house_number: String,
    pub average_household_count: f64,
}

/// One point of the age trend line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgePoint {
    pub birthday: NaiveDate,
    pub age: u32,
}

/// Household size bucket labels, smallest first.
pub const HOUSEHOLD_SIZE_BUCKETS: [&str; 4] = ["1-2", "3-4", "5-6", "7+"];

pub fn dashboard_totals(residents: &[Resident]) -> DashboardTotals {
    let households: HashSet<&str> = residents
        .iter()
        .map(|resident| resident.house_number.as_str())
        .collect();
    DashboardTotals {
        residents: residents.len(),
        households: households.len(),
        male: count_matching(residents, |resident| is_category(&resident.gender, "male")),
        female: count_matching(residents, |resident| is_category(&resident.gender, "female")),
    }
}

pub fn employment_breakdown(residents: &[Resident]) -> EmploymentBreakdown {
    let mut breakdown = EmploymentBreakdown::default();
    for resident in residents {
        match resident.employment_status.trim().to_ascii_lowercase().as_str() {
            "employed" => breakdown.employed += 1,
            "unemployed" => breakdown.unemployed += 1,
            "student" => breakdown.student += 1,
            "retiree" => breakdown.retiree += 1,
            _ => {}
        }
    }
    breakdown
}

/// Residents per health status, in first-seen order.
pub fn health_distribution(residents: &[Resident]) -> Vec<LabelCount> {
    distribution(residents.iter().map(|resident| resident.health.as_str()))
}

/// Residents per gender value, in first-seen order.
pub fn gender_distribution(residents: &[Resident]) -> Vec<LabelCount> {
    distribution(residents.iter().map(|resident| resident.gender.as_str()))
}

/// Residents per household size bucket, always in
/// [`HOUSEHOLD_SIZE_BUCKETS`] order.
pub fn household_size_buckets(residents: &[Resident]) -> Vec<LabelCount> {
    let mut counts = [0usize; 4];
    for resident in residents {
        let bucket = match resident.household_count {
            0..=2 => 0,
            3..=4 => 1,
            5..=6 => 2,
            _ => 3,
        };
        counts[bucket] += 1;
    }
    HOUSEHOLD_SIZE_BUCKETS
        .iter()
        .zip(counts)
        .map(|(label, count)| LabelCount {
            label: (*label).to_string(),
            count,
        })
        .collect()
}

/// Household count per address/house number; the first resident seen for a
/// pair decides its count.
pub fn household_per_address(residents: &[Resident]) -> Vec<AddressHousehold> {
    let mut seen = HashSet::new();
    residents
        .iter()
        .filter(|resident| seen.insert((resident.address.as_str(), resident.house_number.as_str())))
        .map(|resident| AddressHousehold {
            address: resident.address.clone(),
            house_number: resident.house_number.clone(),
            household_count: resident.household_count,
        })
        .collect()
}

/// Average household count per house number, in first-seen order.
pub fn average_household_by_house(residents: &[Resident]) -> Vec<HouseAverage> {
    let mut order: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, (u64, u64)> = HashMap::new();
    for resident in residents {
        let key = resident.house_number.as_str();
        let entry = totals.entry(key).or_insert_with(|| {
            order.push(key);
            (0, 0)
        });
        entry.0 += u64::from(resident.household_count);
        entry.1 += 1;
    }
    order
        .into_iter()
        .filter_map(|key| {
            let (sum, members) = totals.get(key)?;
            Some(HouseAverage {
                house_number: key.to_string(),
                average_household_count: *sum as f64 / *members as f64,
            })
        })
        .collect()
}

/// Every dashboard and chart series computed from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub totals: DashboardTotals,
    pub employment: EmploymentBreakdown,
    pub health: Vec<LabelCount>,
    pub gender: Vec<LabelCount>,
    pub household_sizes: Vec<LabelCount>,
    pub household_per_address: Vec<AddressHousehold>,
    pub average_household_by_house: Vec<HouseAverage>,
    pub ages: Vec<AgePoint>,
}

pub fn analytics_report(residents: &[Resident], today: NaiveDate) -> AnalyticsReport {
    AnalyticsReport {
        totals: dashboard_totals(residents),
        employment: employment_breakdown(residents),
        health: health_distribution(residents),
        gender: gender_distribution(residents),
        household_sizes: household_size_buckets(residents),
        household_per_address: household_per_address(residents),
        average_household_by_house: average_household_by_house(residents),
        ages: age_series(residents, today),
    }
}

/// Ages at `today`, ordered by birthday (oldest first). Birthdays after
/// `today` count as age zero.
pub fn age_series(residents: &[Resident], today: NaiveDate) -> Vec<AgePoint> {
    let mut points: Vec<AgePoint> = residents
        .iter()
        .map(|resident| AgePoint {
            birthday: resident.birthday,
            age: today.years_since(resident.birthday).unwrap_or(0),
        })
        .collect();
    points.sort_by_key(|point| point.birthday);
    points
}

fn distribution<'a>(values: impl Iterator<Item = &'a str>) -> Vec<LabelCount> {
    let mut result: Vec<LabelCount> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for value in values {
        match index.get(value) {
            Some(position) => result[*position].count += 1,
            None => {
                index.insert(value, result.len());
                result.push(LabelCount {
                    label: value.to_string(),
                    count: 1,
                });
            }
        }
    }
    result
}

fn count_matching(residents: &[Resident], predicate: impl Fn(&Resident) -> bool) -> usize {
    residents.iter().filter(|resident| predicate(resident)).count()
}

fn is_category(value: &str, category: &str) -> bool {
    value.trim().eq_ignore_ascii_case(category)
}
