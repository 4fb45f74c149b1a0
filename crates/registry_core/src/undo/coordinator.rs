//! Single-slot soft-delete state machine.
//!
//! # Responsibility
//! - Drive `Idle -> Pending -> Idle` for one optimistic deletion at a time.
//! - Translate storage outcomes into [`DeletionEvent`]s for the UI.
//!
//! # Invariants
//! - `initiate_delete` on an unknown id and `undo` while idle leave every
//!   piece of state unchanged.
//! - The pending timer is either cancelled by `undo` or consumed by
//!   `confirm_expiry`, never both.
//! - `undo` always reinserts the record locally, whatever the store says.
//! - A failed commit never resurrects the record locally.

use crate::undo::scheduler::{Scheduler, TimerHandle};
use crate::undo::store::RecordStore;
use crate::view::engine::ViewEngine;
use crate::view::record::Record;
use log::{error, info, warn};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Undo window used when none is configured.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(5002);

/// Soft-delete failures.
///
/// `NotFound` and `NoPendingDeletion` are returned synchronously; the store
/// variants describe asynchronous [`DeletionEvent`] failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionError {
    /// Delete target is absent from the snapshot.
    NotFound(String),
    /// `undo` was called with nothing pending.
    NoPendingDeletion,
    StoreCommitFailed { id: String, reason: String },
    StoreRestoreFailed { id: String, reason: String },
    /// Full refetch failed; the snapshot was left as-is.
    StoreFetchFailed(String),
}

impl Display for DeletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found in snapshot: {id}"),
            Self::NoPendingDeletion => write!(f, "no pending deletion to undo"),
            Self::StoreCommitFailed { id, reason } => {
                write!(f, "failed to commit deletion of {id}: {reason}")
            }
            Self::StoreRestoreFailed { id, reason } => {
                write!(f, "failed to restore {id}: {reason}")
            }
            Self::StoreFetchFailed(reason) => write!(f, "failed to fetch records: {reason}"),
        }
    }
}

impl Error for DeletionError {}

/// Notifications emitted for the UI layer, in occurrence order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeletionEvent<R> {
    /// Record left the snapshot; undo window opened.
    Deleted { id: String },
    /// Store confirmed the permanent deletion.
    Committed { id: String },
    /// Undo succeeded locally and in the store.
    Restored { record: R },
    CommitFailed { id: String, reason: String },
    /// Undo succeeded locally but the store rejected the upsert.
    RestoreFailed { record: R, reason: String },
}

impl<R: Record> DeletionEvent<R> {
    /// Id of the record the event concerns.
    pub fn record_id(&self) -> &str {
        match self {
            Self::Deleted { id } | Self::Committed { id } | Self::CommitFailed { id, .. } => {
                id.as_str()
            }
            Self::Restored { record } | Self::RestoreFailed { record, .. } => record.record_id(),
        }
    }

    /// Failure carried by this event, if any.
    pub fn failure(&self) -> Option<DeletionError> {
        match self {
            Self::CommitFailed { id, reason } => Some(DeletionError::StoreCommitFailed {
                id: id.clone(),
                reason: reason.clone(),
            }),
            Self::RestoreFailed { record, reason } => Some(DeletionError::StoreRestoreFailed {
                id: record.record_id().to_string(),
                reason: reason.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct PendingDeletion<R> {
    record: R,
    /// Snapshot index the record occupied before removal.
    index: usize,
    timer: TimerHandle,
}

/// Owner of the single in-flight soft deletion.
pub struct SoftDeleteCoordinator<R, S, T> {
    store: S,
    scheduler: T,
    grace_period: Duration,
    pending: Option<PendingDeletion<R>>,
    events: VecDeque<DeletionEvent<R>>,
}

impl<R, S, T> SoftDeleteCoordinator<R, S, T>
where
    R: Record + Clone,
    S: RecordStore<R>,
    T: Scheduler,
{
    /// Creates an idle coordinator with [`DEFAULT_GRACE_PERIOD`].
    pub fn new(store: S, scheduler: T) -> Self {
        Self::with_grace_period(store, scheduler, DEFAULT_GRACE_PERIOD)
    }

    /// Creates an idle coordinator with a custom undo window.
    pub fn with_grace_period(store: S, scheduler: T, grace_period: Duration) -> Self {
        Self {
            store,
            scheduler,
            grace_period,
            pending: None,
            events: VecDeque::new(),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    /// Mutable scheduler access, e.g. to advance virtual time.
    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Id of the pending deletion, if any.
    pub fn pending_id(&self) -> Option<&str> {
        self.pending
            .as_ref()
            .map(|pending| pending.record.record_id())
    }

    /// Replaces the snapshot with the store's full record set.
    ///
    /// A pending record is kept out of the new snapshot until its deletion
    /// is committed or undone. Returns the new snapshot size.
    ///
    /// # Errors
    /// - `StoreFetchFailed` when the store read fails; snapshot unchanged.
    pub fn refresh(&mut self, engine: &mut ViewEngine<R>) -> Result<usize, DeletionError> {
        let mut records = match self.store.fetch_all() {
            Ok(records) => records,
            Err(err) => {
                error!("event=snapshot_refresh module=undo status=error error={err}");
                return Err(DeletionError::StoreFetchFailed(err.to_string()));
            }
        };
        if let Some(pending_id) = self.pending_id() {
            records.retain(|record| record.record_id() != pending_id);
        }
        engine.replace_snapshot(records);
        info!(
            "event=snapshot_refresh module=undo status=ok count={} pending={}",
            engine.len(),
            self.is_pending()
        );
        Ok(engine.len())
    }

    /// Optimistically deletes `id` and opens the undo window.
    ///
    /// A deletion already pending for another record is abandoned: its timer
    /// is cancelled and the record is neither committed nor restored.
    ///
    /// # Errors
    /// - `NotFound` when `id` is not in the snapshot; nothing changes.
    pub fn initiate_delete(
        &mut self,
        engine: &mut ViewEngine<R>,
        id: &str,
    ) -> Result<(), DeletionError> {
        let Some((index, record)) = engine.remove(id) else {
            warn!("event=soft_delete module=undo status=error error_code=not_found id={id}");
            return Err(DeletionError::NotFound(id.to_string()));
        };

        if let Some(previous) = self.pending.take() {
            self.scheduler.cancel(previous.timer);
            warn!(
                "event=soft_delete_abandoned module=undo status=ok id={} replaced_by={}",
                previous.record.record_id(),
                id
            );
        }

        let timer = self.scheduler.arm(self.grace_period);
        self.pending = Some(PendingDeletion {
            record,
            index,
            timer,
        });
        self.events.push_back(DeletionEvent::Deleted { id: id.to_string() });
        info!(
            "event=soft_delete module=undo status=start id={} grace_ms={} timer={}",
            id,
            self.grace_period.as_millis(),
            timer.id()
        );
        Ok(())
    }

    /// Commits the pending deletion whose countdown produced `handle`.
    ///
    /// Returns `false` (no-op) when `handle` does not belong to the current
    /// pending deletion, e.g. after `undo` or a replacement delete.
    pub fn confirm_expiry(&mut self, handle: TimerHandle) -> bool {
        let matches = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.timer == handle);
        if !matches {
            return false;
        }
        let Some(pending) = self.pending.take() else {
            return false;
        };

        let id = pending.record.record_id().to_string();
        match self.store.commit_delete(id.as_str()) {
            Ok(()) => {
                info!("event=soft_delete_commit module=undo status=ok id={id}");
                self.events.push_back(DeletionEvent::Committed { id });
            }
            Err(err) => {
                let reason = err.to_string();
                error!("event=soft_delete_commit module=undo status=error id={id} error={reason}");
                self.events
                    .push_back(DeletionEvent::CommitFailed { id, reason });
            }
        }
        true
    }

    /// Dispatches every due timer to [`Self::confirm_expiry`].
    ///
    /// Returns how many commits were attempted.
    pub fn poll_timers(&mut self) -> usize {
        self.scheduler
            .take_due()
            .into_iter()
            .filter(|handle| self.confirm_expiry(*handle))
            .count()
    }

    /// Cancels the pending deletion and puts the record back.
    ///
    /// The record is reinserted at its former snapshot position even when
    /// the store restore fails; the failure is reported as an event.
    ///
    /// # Errors
    /// - `NoPendingDeletion` when idle; nothing changes.
    pub fn undo(&mut self, engine: &mut ViewEngine<R>) -> Result<(), DeletionError> {
        let Some(pending) = self.pending.take() else {
            return Err(DeletionError::NoPendingDeletion);
        };
        self.scheduler.cancel(pending.timer);

        let restore_result = self.store.restore(&pending.record);
        engine.insert(pending.index, pending.record.clone());

        let id = pending.record.record_id().to_string();
        match restore_result {
            Ok(()) => {
                info!("event=soft_delete_undo module=undo status=ok id={id}");
                self.events.push_back(DeletionEvent::Restored {
                    record: pending.record,
                });
            }
            Err(err) => {
                let reason = err.to_string();
                error!("event=soft_delete_undo module=undo status=error id={id} error={reason}");
                self.events.push_back(DeletionEvent::RestoreFailed {
                    record: pending.record,
                    reason,
                });
            }
        }
        Ok(())
    }

    /// Removes and returns all queued events.
    pub fn drain_events(&mut self) -> Vec<DeletionEvent<R>> {
        self.events.drain(..).collect()
    }

    /// Tears the coordinator down.
    ///
    /// Any pending timer is cancelled and the pending record is returned
    /// uncommitted; the store still holds it.
    pub fn shutdown(mut self) -> Option<R> {
        let pending = self.pending.take()?;
        self.scheduler.cancel(pending.timer);
        warn!(
            "event=soft_delete_shutdown module=undo status=ok uncommitted_id={}",
            pending.record.record_id()
        );
        Some(pending.record)
    }
}

#[cfg(test)]
mod tests {
    use super::{DeletionError, DeletionEvent, SoftDeleteCoordinator, DEFAULT_GRACE_PERIOD};
    use crate::undo::scheduler::{ManualScheduler, Scheduler};
    use crate::undo::store::RecordStore;
    use crate::view::engine::{ViewEngine, ViewLimit, ViewQuery};
    use crate::view::record::{AttributeSource, Record};
    use std::borrow::Cow;
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        name: String,
    }

    impl AttributeSource for Item {
        fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
            match name {
                "id" => Some(Cow::Borrowed(self.id.as_str())),
                "name" => Some(Cow::Borrowed(self.name.as_str())),
                _ => None,
            }
        }
    }

    impl Record for Item {
        fn record_id(&self) -> &str {
            self.id.as_str()
        }
    }

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[derive(Default)]
    struct FakeStore {
        records: RefCell<Vec<Item>>,
        commits: RefCell<Vec<String>>,
        restores: RefCell<Vec<String>>,
        fail_commit: bool,
        fail_restore: bool,
    }

    impl RecordStore<Item> for FakeStore {
        type Error = String;

        fn fetch_all(&self) -> Result<Vec<Item>, String> {
            Ok(self.records.borrow().clone())
        }

        fn commit_delete(&self, id: &str) -> Result<(), String> {
            self.commits.borrow_mut().push(id.to_string());
            if self.fail_commit {
                return Err("store offline".to_string());
            }
            self.records.borrow_mut().retain(|record| record.id != id);
            Ok(())
        }

        fn restore(&self, record: &Item) -> Result<(), String> {
            self.restores.borrow_mut().push(record.id.clone());
            if self.fail_restore {
                return Err("store offline".to_string());
            }
            Ok(())
        }
    }

    type TestCoordinator = SoftDeleteCoordinator<Item, FakeStore, ManualScheduler>;

    fn setup(store: FakeStore) -> (TestCoordinator, ViewEngine<Item>) {
        *store.records.borrow_mut() = vec![item("1", "Ana"), item("2", "Bo"), item("3", "Cy")];
        let mut coordinator = SoftDeleteCoordinator::new(store, ManualScheduler::new());
        let mut engine = ViewEngine::new();
        coordinator.refresh(&mut engine).expect("refresh");
        (coordinator, engine)
    }

    fn all() -> ViewQuery {
        ViewQuery {
            limit: ViewLimit::Unbounded,
            ..ViewQuery::default()
        }
    }

    #[test]
    fn delete_hides_record_and_expiry_commits_exactly_once() {
        let (mut coordinator, mut engine) = setup(FakeStore::default());
        coordinator.initiate_delete(&mut engine, "2").expect("delete");
        assert!(engine.view(&all()).iter().all(|record| record.id != "2"));
        assert_eq!(coordinator.pending_id(), Some("2"));

        coordinator
            .scheduler_mut()
            .advance(DEFAULT_GRACE_PERIOD - Duration::from_millis(1));
        assert_eq!(coordinator.poll_timers(), 0);
        assert!(coordinator.store().commits.borrow().is_empty());

        coordinator.scheduler_mut().advance(Duration::from_millis(1));
        assert_eq!(coordinator.poll_timers(), 1);
        assert_eq!(coordinator.poll_timers(), 0);
        assert_eq!(*coordinator.store().commits.borrow(), vec!["2".to_string()]);
        assert!(!coordinator.is_pending());

        let events = coordinator.drain_events();
        assert_eq!(
            events,
            vec![
                DeletionEvent::Deleted { id: "2".to_string() },
                DeletionEvent::Committed { id: "2".to_string() },
            ]
        );
        assert_eq!(
            coordinator.undo(&mut engine),
            Err(DeletionError::NoPendingDeletion)
        );
    }

    #[test]
    fn undo_restores_original_snapshot_and_cancels_commit() {
        let (mut coordinator, mut engine) = setup(FakeStore::default());
        let before = engine.snapshot().to_vec();

        coordinator.initiate_delete(&mut engine, "2").expect("delete");
        coordinator.undo(&mut engine).expect("undo");
        assert_eq!(engine.snapshot(), before.as_slice());

        coordinator.scheduler_mut().advance(DEFAULT_GRACE_PERIOD * 2);
        assert_eq!(coordinator.poll_timers(), 0);
        assert!(coordinator.store().commits.borrow().is_empty());
        assert_eq!(*coordinator.store().restores.borrow(), vec!["2".to_string()]);

        let events = coordinator.drain_events();
        assert!(matches!(
            events.last(),
            Some(DeletionEvent::Restored { record }) if record.id == "2"
        ));
    }

    #[test]
    fn delete_of_unknown_id_changes_nothing() {
        let (mut coordinator, mut engine) = setup(FakeStore::default());
        let before = engine.snapshot().to_vec();
        let err = coordinator
            .initiate_delete(&mut engine, "404")
            .expect_err("unknown id");
        assert_eq!(err, DeletionError::NotFound("404".to_string()));
        assert_eq!(engine.snapshot(), before.as_slice());
        assert!(!coordinator.is_pending());
        assert!(coordinator.drain_events().is_empty());
        assert_eq!(coordinator.scheduler().armed_count(), 0);
    }

    #[test]
    fn second_delete_abandons_first_pending_record() {
        let (mut coordinator, mut engine) = setup(FakeStore::default());
        coordinator.initiate_delete(&mut engine, "1").expect("first");
        coordinator.initiate_delete(&mut engine, "2").expect("second");
        assert_eq!(coordinator.pending_id(), Some("2"));
        assert_eq!(coordinator.scheduler().armed_count(), 1);

        coordinator.scheduler_mut().advance(DEFAULT_GRACE_PERIOD);
        assert_eq!(coordinator.poll_timers(), 1);
        assert_eq!(*coordinator.store().commits.borrow(), vec!["2".to_string()]);
        assert!(coordinator.store().restores.borrow().is_empty());
        assert!(!engine.contains("1"));
    }

    #[test]
    fn commit_failure_is_reported_without_resurrecting_record() {
        let store = FakeStore {
            fail_commit: true,
            ..FakeStore::default()
        };
        let (mut coordinator, mut engine) = setup(store);
        coordinator.initiate_delete(&mut engine, "3").expect("delete");
        coordinator.scheduler_mut().advance(DEFAULT_GRACE_PERIOD);
        coordinator.poll_timers();

        assert!(!coordinator.is_pending());
        assert!(!engine.contains("3"));
        let events = coordinator.drain_events();
        let failure = events
            .iter()
            .find_map(DeletionEvent::failure)
            .expect("commit failure event");
        assert!(matches!(failure, DeletionError::StoreCommitFailed { ref id, .. } if id == "3"));
    }

    #[test]
    fn restore_failure_still_reinserts_locally() {
        let store = FakeStore {
            fail_restore: true,
            ..FakeStore::default()
        };
        let (mut coordinator, mut engine) = setup(store);
        coordinator.initiate_delete(&mut engine, "1").expect("delete");
        coordinator.undo(&mut engine).expect("undo is local");

        assert!(engine.contains("1"));
        assert!(!coordinator.is_pending());
        let events = coordinator.drain_events();
        assert!(matches!(
            events.last(),
            Some(DeletionEvent::RestoreFailed { record, .. }) if record.id == "1"
        ));
    }

    #[test]
    fn refresh_keeps_pending_record_hidden() {
        let (mut coordinator, mut engine) = setup(FakeStore::default());
        coordinator.initiate_delete(&mut engine, "1").expect("delete");
        let count = coordinator.refresh(&mut engine).expect("refresh");
        assert_eq!(count, 2);
        assert!(!engine.contains("1"));
    }

    #[test]
    fn stale_handle_is_ignored() {
        let (mut coordinator, mut engine) = setup(FakeStore::default());
        let stale = coordinator.scheduler_mut().arm(Duration::ZERO);
        coordinator.initiate_delete(&mut engine, "1").expect("delete");
        assert!(!coordinator.confirm_expiry(stale));
        assert!(coordinator.is_pending());
    }

    #[test]
    fn shutdown_returns_uncommitted_record() {
        let (mut coordinator, mut engine) = setup(FakeStore::default());
        coordinator.initiate_delete(&mut engine, "2").expect("delete");
        let abandoned = coordinator.shutdown().expect("pending record");
        assert_eq!(abandoned.id, "2");
    }

    #[test]
    fn custom_grace_period_is_honoured() {
        let store = FakeStore::default();
        *store.records.borrow_mut() = vec![item("1", "Ana")];
        let mut coordinator = SoftDeleteCoordinator::with_grace_period(
            store,
            ManualScheduler::new(),
            Duration::from_millis(50),
        );
        let mut engine = ViewEngine::new();
        coordinator.refresh(&mut engine).expect("refresh");
        coordinator.initiate_delete(&mut engine, "1").expect("delete");
        coordinator.scheduler_mut().advance(Duration::from_millis(50));
        assert_eq!(coordinator.poll_timers(), 1);
        assert_eq!(coordinator.grace_period(), Duration::from_millis(50));
    }
}
