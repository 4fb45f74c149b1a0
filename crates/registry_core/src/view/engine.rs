//! Snapshot ownership and filter/sort/limit view computation.
//!
//! # Responsibility
//! - Hold the authoritative client-side record snapshot.
//! - Compute views: filter by one attribute, stable ascending sort by
//!   another, truncate to a limit.
//!
//! # Invariants
//! - `compute_view` is pure: same inputs, same output, snapshot untouched.
//! - Equal sort keys keep their snapshot order.
//! - Unknown attribute names never fail: they filter as `""` and sort as
//!   text.

use crate::view::record::{AttributeSource, MatchMode, Record};
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::num::NonZeroUsize;

/// Page size used when none is chosen.
pub const DEFAULT_VIEW_LIMIT: usize = 10;

/// Maximum number of records a view returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewLimit {
    Bounded(NonZeroUsize),
    Unbounded,
}

impl ViewLimit {
    /// Bounded limit; `None` when `count` is zero.
    pub fn bounded(count: usize) -> Option<Self> {
        NonZeroUsize::new(count).map(Self::Bounded)
    }

    /// Parses `all` (unbounded) or a positive integer.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Some(Self::Unbounded);
        }
        trimmed.parse::<usize>().ok().and_then(Self::bounded)
    }

    fn apply(self, len: usize) -> usize {
        match self {
            Self::Bounded(limit) => len.min(limit.get()),
            Self::Unbounded => len,
        }
    }
}

impl Default for ViewLimit {
    fn default() -> Self {
        NonZeroUsize::new(DEFAULT_VIEW_LIMIT).map_or(Self::Unbounded, Self::Bounded)
    }
}

/// View inputs chosen by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    /// Attribute the search query is matched against.
    pub search_by: String,
    /// Raw search text; matched case-insensitively.
    pub search_query: String,
    /// Attribute used for ascending ordering.
    pub sort_key: String,
    pub limit: ViewLimit,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search_by: "name".to_string(),
            search_query: String::new(),
            sort_key: "id".to_string(),
            limit: ViewLimit::default(),
        }
    }
}

/// Computes the display view over `snapshot`.
///
/// Returns references into `snapshot` in view order.
pub fn compute_view<'a, R>(snapshot: &'a [R], query: &ViewQuery) -> Vec<&'a R>
where
    R: AttributeSource,
{
    let needle = query.search_query.to_lowercase();
    let mode = R::match_mode(query.search_by.as_str());

    let keyed: Vec<(SortKey, &R)> = snapshot
        .iter()
        .filter(|record| {
            let value = record
                .attribute(query.search_by.as_str())
                .map(|value| value.to_lowercase())
                .unwrap_or_default();
            match mode {
                MatchMode::Exact => !needle.is_empty() && value == needle,
                MatchMode::Contains => value.contains(needle.as_str()),
            }
        })
        .map(|record| {
            let key = SortKey::new(record.attribute(query.sort_key.as_str()).as_deref());
            (key, record)
        })
        .collect();

    let sorted = stable_merge_sort(keyed, |left, right| left.0.compare(&right.0));
    let take = query.limit.apply(sorted.len());
    sorted.into_iter().take(take).map(|(_, record)| record).collect()
}

#[derive(Debug)]
struct SortKey {
    text: String,
    number: Option<f64>,
}

impl SortKey {
    fn new(raw: Option<&str>) -> Self {
        match raw {
            Some(value) => Self {
                text: value.to_lowercase(),
                number: parse_number(value),
            },
            None => Self {
                text: String::new(),
                number: None,
            },
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            _ => self.text.cmp(&other.text),
        }
    }
}

fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}

// Mixed numeric/text keys do not form a total order, which `slice::sort_by`
// may reject at runtime. Merge sort only needs a consistent `compare` call
// per pair and is stable.
fn stable_merge_sort<T, F>(items: Vec<T>, mut compare: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    fn sort_run<T, F>(mut items: Vec<T>, compare: &mut F) -> Vec<T>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if items.len() <= 1 {
            return items;
        }
        let right = items.split_off(items.len() / 2);
        let left = sort_run(items, compare);
        let right = sort_run(right, compare);

        let mut merged = Vec::with_capacity(left.len() + right.len());
        let mut left = left.into_iter().peekable();
        let mut right = right.into_iter().peekable();
        loop {
            let take_left = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => compare(l, r) != Ordering::Greater,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { left.next() } else { right.next() };
            if let Some(item) = next {
                merged.push(item);
            }
        }
        merged
    }

    sort_run(items, &mut compare)
}

/// Owner of the client-side record snapshot.
#[derive(Debug, Clone)]
pub struct ViewEngine<R> {
    records: Vec<R>,
}

impl<R> Default for ViewEngine<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<R: Record> ViewEngine<R> {
    /// Creates an engine with an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine from an initial snapshot.
    pub fn with_snapshot(records: Vec<R>) -> Self {
        let mut engine = Self::new();
        engine.replace_snapshot(records);
        engine
    }

    /// Replaces the whole snapshot (full refetch).
    ///
    /// Duplicate ids keep their first occurrence.
    pub fn replace_snapshot(&mut self, records: Vec<R>) {
        let incoming = records.len();
        let mut seen = HashSet::with_capacity(incoming);
        let mut unique = Vec::with_capacity(incoming);
        for record in records {
            if seen.insert(record.record_id().to_string()) {
                unique.push(record);
            }
        }
        if unique.len() != incoming {
            warn!(
                "event=snapshot_replace module=view status=ok dropped_duplicates={}",
                incoming - unique.len()
            );
        }
        debug!(
            "event=snapshot_replace module=view status=ok count={}",
            unique.len()
        );
        self.records = unique;
    }

    /// Current snapshot in storage order.
    pub fn snapshot(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record with `id`, if present.
    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|record| record.record_id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Removes the record with `id`, returning its former index and value.
    pub fn remove(&mut self, id: &str) -> Option<(usize, R)> {
        let index = self.position(id)?;
        Some((index, self.records.remove(index)))
    }

    /// Inserts `record` at `index` (clamped to the snapshot length).
    ///
    /// When a record with the same id is already present it is replaced in
    /// place so ids stay unique. Returns the final index.
    pub fn insert(&mut self, index: usize, record: R) -> usize {
        if let Some(existing) = self.position(record.record_id()) {
            self.records[existing] = record;
            return existing;
        }
        let index = index.min(self.records.len());
        self.records.insert(index, record);
        index
    }

    /// Computes a view over the current snapshot.
    pub fn view(&self, query: &ViewQuery) -> Vec<&R> {
        compute_view(&self.records, query)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.record_id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_view, stable_merge_sort, ViewEngine, ViewLimit, ViewQuery};
    use crate::view::record::{AttributeSource, Record};
    use std::borrow::Cow;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: &'static str,
        name: &'static str,
        gender: &'static str,
        count: &'static str,
    }

    impl AttributeSource for Row {
        fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
            match name {
                "id" => Some(Cow::Borrowed(self.id)),
                "name" => Some(Cow::Borrowed(self.name)),
                "gender" => Some(Cow::Borrowed(self.gender)),
                "count" => Some(Cow::Borrowed(self.count)),
                _ => None,
            }
        }

        fn match_mode(name: &str) -> super::MatchMode {
            if name == "gender" {
                super::MatchMode::Exact
            } else {
                super::MatchMode::Contains
            }
        }
    }

    impl Record for Row {
        fn record_id(&self) -> &str {
            self.id
        }
    }

    fn row(id: &'static str, name: &'static str, gender: &'static str, count: &'static str) -> Row {
        Row {
            id,
            name,
            gender,
            count,
        }
    }

    fn query(search_by: &str, search: &str, sort_key: &str) -> ViewQuery {
        ViewQuery {
            search_by: search_by.to_string(),
            search_query: search.to_string(),
            sort_key: sort_key.to_string(),
            limit: ViewLimit::Unbounded,
        }
    }

    fn ids(view: &[&Row]) -> Vec<&'static str> {
        view.iter().map(|row| row.id).collect()
    }

    #[test]
    fn numeric_keys_sort_numerically() {
        let rows = vec![
            row("a", "A", "male", "3"),
            row("b", "B", "male", "10"),
            row("c", "C", "male", "2"),
        ];
        let view = compute_view(&rows, &query("name", "", "count"));
        assert_eq!(ids(&view), vec!["c", "a", "b"]);
    }

    #[test]
    fn text_keys_sort_case_insensitively() {
        let rows = vec![
            row("1", "bo", "m", "x"),
            row("2", "Al", "m", "x"),
            row("3", "Cy", "m", "x"),
        ];
        let view = compute_view(&rows, &query("name", "", "name"));
        assert_eq!(ids(&view), vec!["2", "1", "3"]);
    }

    #[test]
    fn mixed_keys_fall_back_to_text_comparison() {
        let rows = vec![
            row("1", "n", "m", "10"),
            row("2", "n", "m", "9"),
            row("3", "n", "m", "1a"),
        ];
        let first = compute_view(&rows, &query("name", "", "count"));
        let second = compute_view(&rows, &query("name", "", "count"));
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn equal_keys_keep_snapshot_order() {
        let rows = vec![
            row("z", "same", "m", "1"),
            row("a", "same", "m", "1"),
            row("m", "same", "m", "1"),
        ];
        let view = compute_view(&rows, &query("name", "", "name"));
        assert_eq!(ids(&view), vec!["z", "a", "m"]);
    }

    #[test]
    fn exact_mode_needs_full_match_and_rejects_empty_query() {
        let rows = vec![row("1", "A", "Male", "1"), row("2", "B", "female", "1")];
        assert_eq!(ids(&compute_view(&rows, &query("gender", "MALE", "id"))), vec!["1"]);
        assert!(compute_view(&rows, &query("gender", "", "id")).is_empty());
        assert!(compute_view(&rows, &query("gender", "mal", "id")).is_empty());
    }

    #[test]
    fn contains_mode_matches_substrings_and_empty_query() {
        let rows = vec![
            row("1", "Ana", "f", "1"),
            row("2", "Hannah", "f", "1"),
            row("3", "Bo", "m", "1"),
        ];
        assert_eq!(ids(&compute_view(&rows, &query("name", "AN", "id"))), vec!["1", "2"]);
        assert_eq!(compute_view(&rows, &query("name", "", "id")).len(), 3);
    }

    #[test]
    fn unknown_attributes_filter_as_empty_and_never_fail() {
        let rows = vec![row("2", "A", "m", "1"), row("1", "B", "m", "1")];
        assert_eq!(compute_view(&rows, &query("nickname", "", "id")).len(), 2);
        assert!(compute_view(&rows, &query("nickname", "x", "id")).is_empty());
        let unsorted = compute_view(&rows, &query("name", "", "nickname"));
        assert_eq!(ids(&unsorted), vec!["2", "1"]);
    }

    #[test]
    fn limit_truncates_after_sorting() {
        let rows = vec![row("3", "c", "m", "1"), row("1", "a", "m", "1"), row("2", "b", "m", "1")];
        let mut q = query("name", "", "id");
        q.limit = ViewLimit::bounded(2).expect("non-zero");
        assert_eq!(ids(&compute_view(&rows, &q)), vec!["1", "2"]);
    }

    #[test]
    fn view_limit_parses_all_and_positive_counts() {
        assert_eq!(ViewLimit::parse("all"), Some(ViewLimit::Unbounded));
        assert_eq!(ViewLimit::parse(" 20 "), ViewLimit::bounded(20));
        assert_eq!(ViewLimit::parse("0"), None);
        assert_eq!(ViewLimit::parse("-5"), None);
        assert_eq!(ViewLimit::default(), ViewLimit::bounded(10).expect("ten"));
    }

    #[test]
    fn engine_dedupes_on_replace_and_reinserts_in_place() {
        let mut engine = ViewEngine::with_snapshot(vec![
            row("1", "a", "m", "1"),
            row("2", "b", "m", "1"),
            row("1", "dup", "m", "1"),
        ]);
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.get("1").map(|r| r.name), Some("a"));

        let (index, removed) = engine.remove("1").expect("present");
        assert_eq!(index, 0);
        assert!(!engine.contains("1"));
        assert_eq!(engine.insert(index, removed.clone()), 0);
        assert_eq!(engine.snapshot()[0], removed);

        assert_eq!(engine.insert(99, row("3", "c", "m", "1")), 2);
    }

    #[test]
    fn merge_sort_is_stable() {
        let items = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        let sorted = stable_merge_sort(items, |l, r| l.0.cmp(&r.0));
        assert_eq!(sorted, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
    }
}
