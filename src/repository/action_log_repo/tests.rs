use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn make_test_log(action_id: &str, step_run_id: &str, actor: &str) -> ActionLog {
    let mut log = ActionLog::new(Some(step_run_id), ActionType::AddChild, actor)
        .with_payload(json!({ "kind": "WASTE", "quantity": 2.5 }))
        .with_detail("新增损耗");
    log.action_id = action_id.to_string();
    log
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log("log1", "R1", "user1");
    assert_eq!(repo.insert(&log).unwrap(), "log1");

    let found = repo.find_by_id("log1").unwrap().unwrap();
    assert_eq!(found.step_run_id.as_deref(), Some("R1"));
    assert_eq!(found.action_type, ActionType::AddChild);
    assert_eq!(found.actor, "user1");
    assert_eq!(found.payload_json, Some(json!({ "kind": "WASTE", "quantity": 2.5 })));

    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_find_by_step_run_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&make_test_log("log1", "R1", "user1")).unwrap();
    repo.insert(&make_test_log("log2", "R1", "user2")).unwrap();
    repo.insert(&make_test_log("log3", "R2", "user1")).unwrap();

    let logs = repo.find_by_step_run_id("R1").unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.step_run_id.as_deref() == Some("R1")));
}

#[test]
fn test_find_by_time_range_and_recent() {
    let repo = ActionLogRepository::new(setup_test_db());
    let base = NaiveDate::from_ymd_opt(2026, 2, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();

    for i in 0..3 {
        let mut log = make_test_log(&format!("log{}", i), "R1", "user1");
        log.action_ts = base + Duration::hours(i);
        repo.insert(&log).unwrap();
    }

    let logs = repo
        .find_by_time_range(base, base + Duration::minutes(90))
        .unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action_id, "log1");

    let recent = repo.find_recent(1).unwrap();
    assert_eq!(recent[0].action_id, "log2");
}

#[test]
fn test_config_log_without_step_run() {
    let repo = ActionLogRepository::new(setup_test_db());
    let log = ActionLog::new(None, ActionType::UpdateConfig, "admin").with_detail("tolerance_epsilon");
    repo.insert(&log).unwrap();

    let found = repo.find_by_id(&log.action_id).unwrap().unwrap();
    assert!(found.step_run_id.is_none());
    assert_eq!(found.action_type, ActionType::UpdateConfig);
}
