use chrono::NaiveDate;
use registry_core::csv::CsvError;
use registry_core::db::open_db_in_memory;
use registry_core::{Resident, ResidentService, ResidentServiceError, SqliteResidentRepository};

const HEADER: &str = "ID,Name,Gender,Contact,Address,Employment Status,House Number,Health,Birthday,Household Count";

fn resident(id: &str, address: &str) -> Resident {
    Resident {
        id: id.to_string(),
        name: format!("Resident {id}"),
        gender: "Female".to_string(),
        contact: "0917".to_string(),
        address: address.to_string(),
        employment_status: "Retiree".to_string(),
        house_number: "4B".to_string(),
        health: "Asthma".to_string(),
        birthday: NaiveDate::from_ymd_opt(1948, 2, 29).unwrap(),
        household_count: 2,
    }
}

#[test]
fn export_then_import_into_fresh_registry_preserves_residents() {
    let source_conn = open_db_in_memory().unwrap();
    let source = ResidentService::new(SqliteResidentRepository::new(&source_conn));
    source.create(&resident("R-1", "Purok 1, Zone \"A\"")).unwrap();
    source.create(&resident("R-2", "Purok 2")).unwrap();

    let csv = source.export_csv().unwrap();
    assert!(csv.starts_with(HEADER));
    assert!(csv.contains("\"Purok 1, Zone \"\"A\"\"\""));

    let target_conn = open_db_in_memory().unwrap();
    let target = ResidentService::new(SqliteResidentRepository::new(&target_conn));
    let report = target.import_csv(&csv).unwrap();

    assert_eq!(report.created, vec!["R-1", "R-2"]);
    assert_eq!(target.list().unwrap(), source.list().unwrap());
}

#[test]
fn export_of_empty_registry_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = ResidentService::new(SqliteResidentRepository::new(&conn));
    assert!(matches!(
        service.export_csv(),
        Err(ResidentServiceError::Csv(CsvError::NothingToExport))
    ));
}

#[test]
fn import_skips_header_and_blank_rows_and_accepts_crlf() {
    let conn = open_db_in_memory().unwrap();
    let service = ResidentService::new(SqliteResidentRepository::new(&conn));
    let text = format!(
        "{HEADER}\r\nR-1,Ana,Female,0917,Purok 1,Employed,1,Healthy,1990-04-02,3\r\n\r\nR-2,Bo,Male,0918,Purok 2,Student,2,Healthy,4/5/2004,1\r\n"
    );

    let report = service.import_csv(&text).unwrap();
    assert_eq!(report.created, vec!["R-1", "R-2"]);
    assert_eq!(report.skipped_blank, 1);

    let bo = service.get("R-2").unwrap().unwrap();
    assert_eq!(bo.birthday, NaiveDate::from_ymd_opt(2004, 4, 5).unwrap());
}

#[test]
fn import_stops_at_first_bad_row_and_keeps_earlier_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = ResidentService::new(SqliteResidentRepository::new(&conn));
    let text = format!(
        "{HEADER}\nR-1,Ana,Female,0917,Purok 1,Employed,1,Healthy,1990-04-02,3\nR-2,Bo,Male,0918,Purok 2,Student,2,Healthy,1990-04-02,many\nR-3,Cy,Male,0919,Purok 3,Student,3,Healthy,1990-04-02,1\n"
    );

    let err = service.import_csv(&text).unwrap_err();
    assert!(matches!(
        err,
        ResidentServiceError::Csv(CsvError::InvalidHouseholdCount { line: 3, ref value }) if value == "many"
    ));
    let ids: Vec<String> = service
        .list()
        .unwrap()
        .into_iter()
        .map(|resident| resident.id)
        .collect();
    assert_eq!(ids, vec!["R-1"]);
}

#[test]
fn import_rejects_row_with_blank_required_field() {
    let conn = open_db_in_memory().unwrap();
    let service = ResidentService::new(SqliteResidentRepository::new(&conn));
    let text = format!("{HEADER}\nR-1,,Female,0917,Purok 1,Employed,1,Healthy,1990-04-02,3\n");

    let err = service.import_csv(&text).unwrap_err();
    match err {
        ResidentServiceError::ImportRowFailed { line, source } => {
            assert_eq!(line, 2);
            assert!(matches!(*source, ResidentServiceError::Validation(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn import_of_header_only_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = ResidentService::new(SqliteResidentRepository::new(&conn));
    let report = service.import_csv(HEADER).unwrap();
    assert!(report.created.is_empty());
}

#[test]
fn import_rejects_stray_quotes_before_creating_anything() {
    let conn = open_db_in_memory().unwrap();
    let service = ResidentService::new(SqliteResidentRepository::new(&conn));
    let text = format!(
        "{HEADER}\nR-1,Ana,Female,0917,Purok 1,Employed,1,Healthy,1990-04-02,3\nR-2,\"Bo\" Jr,Male,0918,Purok 2,Student,2,Healthy,1990-04-02,1\n"
    );

    let err = service.import_csv(&text).unwrap_err();
    assert!(matches!(err, ResidentServiceError::Csv(CsvError::MisplacedQuote { line: 3 })));
    assert!(service.list().unwrap().is_empty());
}
