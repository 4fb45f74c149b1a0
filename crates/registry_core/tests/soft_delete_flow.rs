use chrono::NaiveDate;
use registry_core::db::open_db_in_memory;
use registry_core::{
    DeletionError, DeletionEvent, ManualScheduler, Resident, ResidentRepository,
    SoftDeleteCoordinator, SqliteResidentRepository, ViewEngine, ViewLimit, ViewQuery,
    DEFAULT_GRACE_PERIOD,
};
use rusqlite::Connection;
use std::time::Duration;

fn resident(id: &str, name: &str, gender: &str, household_count: u32) -> Resident {
    Resident {
        id: id.to_string(),
        name: name.to_string(),
        gender: gender.to_string(),
        contact: "0917".to_string(),
        address: "Purok 1".to_string(),
        employment_status: "Employed".to_string(),
        house_number: "1".to_string(),
        health: "Healthy".to_string(),
        birthday: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        household_count,
    }
}

fn seeded_connection() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteResidentRepository::new(&conn);
    repo.create_resident(&resident("1", "Ana", "female", 4))
        .unwrap();
    repo.create_resident(&resident("2", "Bo", "male", 2)).unwrap();
    conn
}

fn all_ids(engine: &ViewEngine<Resident>) -> Vec<String> {
    let query = ViewQuery {
        limit: ViewLimit::Unbounded,
        ..ViewQuery::default()
    };
    engine
        .view(&query)
        .into_iter()
        .map(|resident| resident.id.clone())
        .collect()
}

fn stored_ids(conn: &Connection) -> Vec<String> {
    SqliteResidentRepository::new(conn)
        .list_residents()
        .unwrap()
        .into_iter()
        .map(|resident| resident.id)
        .collect()
}

#[test]
fn elapsed_grace_period_commits_once_then_undo_has_nothing_pending() {
    let conn = seeded_connection();
    let mut engine = ViewEngine::new();
    let mut coordinator =
        SoftDeleteCoordinator::new(SqliteResidentRepository::new(&conn), ManualScheduler::new());
    coordinator.refresh(&mut engine).unwrap();

    coordinator.initiate_delete(&mut engine, "2").unwrap();
    assert_eq!(all_ids(&engine), vec!["1"]);
    assert_eq!(stored_ids(&conn), vec!["1", "2"]);

    coordinator
        .scheduler_mut()
        .advance(DEFAULT_GRACE_PERIOD - Duration::from_millis(1));
    assert_eq!(coordinator.poll_timers(), 0);
    assert_eq!(stored_ids(&conn), vec!["1", "2"]);

    coordinator.scheduler_mut().advance(Duration::from_millis(1));
    assert_eq!(coordinator.poll_timers(), 1);
    assert_eq!(coordinator.poll_timers(), 0);
    assert_eq!(stored_ids(&conn), vec!["1"]);

    assert_eq!(
        coordinator.undo(&mut engine),
        Err(DeletionError::NoPendingDeletion)
    );
    assert_eq!(
        coordinator.drain_events(),
        vec![
            DeletionEvent::Deleted {
                id: "2".to_string()
            },
            DeletionEvent::Committed {
                id: "2".to_string()
            },
        ]
    );
}

#[test]
fn undo_before_expiry_restores_snapshot_and_store() {
    let conn = seeded_connection();
    let mut engine = ViewEngine::new();
    let mut coordinator =
        SoftDeleteCoordinator::new(SqliteResidentRepository::new(&conn), ManualScheduler::new());
    coordinator.refresh(&mut engine).unwrap();
    let before = engine.snapshot().to_vec();

    coordinator.initiate_delete(&mut engine, "1").unwrap();
    coordinator.undo(&mut engine).unwrap();
    assert_eq!(engine.snapshot(), before.as_slice());

    coordinator.scheduler_mut().advance(DEFAULT_GRACE_PERIOD * 2);
    assert_eq!(coordinator.poll_timers(), 0);
    assert_eq!(stored_ids(&conn), vec!["1", "2"]);
    assert!(!coordinator.is_pending());
}

#[test]
fn refresh_during_grace_period_keeps_pending_record_hidden() {
    let conn = seeded_connection();
    let mut engine = ViewEngine::new();
    let mut coordinator =
        SoftDeleteCoordinator::new(SqliteResidentRepository::new(&conn), ManualScheduler::new());
    coordinator.refresh(&mut engine).unwrap();

    coordinator.initiate_delete(&mut engine, "1").unwrap();
    assert_eq!(coordinator.refresh(&mut engine).unwrap(), 1);
    assert_eq!(all_ids(&engine), vec!["2"]);

    coordinator.undo(&mut engine).unwrap();
    assert_eq!(all_ids(&engine), vec!["1", "2"]);
}

#[test]
fn commit_failure_is_an_event_and_snapshot_stays_without_record() {
    let conn = seeded_connection();
    let mut engine = ViewEngine::new();
    let mut coordinator = SoftDeleteCoordinator::with_grace_period(
        SqliteResidentRepository::new(&conn),
        ManualScheduler::new(),
        Duration::from_millis(10),
    );
    coordinator.refresh(&mut engine).unwrap();

    coordinator.initiate_delete(&mut engine, "2").unwrap();
    conn.execute("DELETE FROM residents WHERE id = '2';", [])
        .unwrap();

    coordinator
        .scheduler_mut()
        .advance(Duration::from_millis(10));
    assert_eq!(coordinator.poll_timers(), 1);

    let events = coordinator.drain_events();
    let failure = events
        .iter()
        .find_map(DeletionEvent::failure)
        .expect("commit failure event");
    assert!(matches!(failure, DeletionError::StoreCommitFailed { id, .. } if id == "2"));
    assert_eq!(all_ids(&engine), vec!["1"]);
    assert!(!coordinator.is_pending());
}

#[test]
fn undo_after_external_delete_reinserts_via_upsert() {
    let conn = seeded_connection();
    let mut engine = ViewEngine::new();
    let mut coordinator =
        SoftDeleteCoordinator::new(SqliteResidentRepository::new(&conn), ManualScheduler::new());
    coordinator.refresh(&mut engine).unwrap();

    coordinator.initiate_delete(&mut engine, "1").unwrap();
    conn.execute("DELETE FROM residents WHERE id = '1';", [])
        .unwrap();
    coordinator.undo(&mut engine).unwrap();

    assert_eq!(stored_ids(&conn), vec!["1", "2"]);
    let stored = SqliteResidentRepository::new(&conn)
        .get_resident("1")
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Ana");
    assert_eq!(stored.household_count, 4);
}

#[test]
fn second_delete_abandons_first_without_committing_it() {
    let conn = seeded_connection();
    let mut engine = ViewEngine::new();
    let mut coordinator =
        SoftDeleteCoordinator::new(SqliteResidentRepository::new(&conn), ManualScheduler::new());
    coordinator.refresh(&mut engine).unwrap();

    coordinator.initiate_delete(&mut engine, "1").unwrap();
    coordinator.initiate_delete(&mut engine, "2").unwrap();
    assert_eq!(coordinator.pending_id(), Some("2"));
    assert!(all_ids(&engine).is_empty());

    coordinator.scheduler_mut().advance(DEFAULT_GRACE_PERIOD);
    assert_eq!(coordinator.poll_timers(), 1);
    assert_eq!(stored_ids(&conn), vec!["1"]);

    coordinator.refresh(&mut engine).unwrap();
    assert_eq!(all_ids(&engine), vec!["1"]);
}

#[test]
fn deleting_unknown_id_changes_nothing() {
    let conn = seeded_connection();
    let mut engine = ViewEngine::new();
    let mut coordinator =
        SoftDeleteCoordinator::new(SqliteResidentRepository::new(&conn), ManualScheduler::new());
    coordinator.refresh(&mut engine).unwrap();

    assert_eq!(
        coordinator.initiate_delete(&mut engine, "9"),
        Err(DeletionError::NotFound("9".to_string()))
    );
    assert_eq!(all_ids(&engine), vec!["1", "2"]);
    assert!(coordinator.drain_events().is_empty());
    assert_eq!(coordinator.scheduler().armed_count(), 0);
}
