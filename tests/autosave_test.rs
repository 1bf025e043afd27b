// ==========================================
// 自动保存集成测试
// ==========================================
// 测试范围:
// 1. 防抖窗口内的多次编辑合并为一次保存
// 2. 计时器到期自动写入
// 3. flush / close 写完待写字段
// 4. 保存失败计数与通知
// 5. 字段组注册表 (含替换)
// 6. 句柄未关闭即释放时强制保存
// ==========================================

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use food_trace::autosave::{AutosaveConfig, AutosaveHandle, AutosaveRegistry};
use food_trace::domain::step_run::FieldMap;
use food_trace::domain::types::StepKind;
use food_trace::notify::NotificationSink;
use food_trace::repository::StepRecordStore;
use helpers::api_test_helper::*;
use serde_json::json;

fn spawn(env: &ApiTestEnv, step_run_id: &str, debounce_ms: u64) -> AutosaveHandle {
    let sink: Arc<dyn NotificationSink> = Arc::new(env.state.notifications.clone());
    AutosaveHandle::spawn(
        AutosaveConfig::new(step_run_id, Duration::from_millis(debounce_ms)).with_actor("tester"),
        env.state.store.clone(),
        sink,
    )
}

#[tokio::test]
async fn test_flush_合并编辑() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Washing, "LOT-A1", "100").await;
    let handle = spawn(&env, &run.step_run_id, 10_000);

    handle.edit("chlorine_ppm", json!("40")).unwrap();
    handle.edit("chlorine_ppm", json!("45")).unwrap();
    handle.edit("wash_duration_min", json!(15)).unwrap();

    let stats = handle.flush().await.expect("flush 失败");
    assert_eq!(stats.saves, 1);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.last_revision, Some(run.revision + 1));

    let stored = env.state.store.fetch(&run.step_run_id).await.unwrap();
    assert_eq!(stored.run.fields.get("chlorine_ppm"), Some(&json!("45")));
    assert_eq!(stored.run.fields.get("wash_duration_min"), Some(&json!(15)));

    // 无待写字段时 flush 不产生保存
    let stats = handle.flush().await.unwrap();
    assert_eq!(stats.saves, 1);

    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_计时器到期自动保存() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Drying, "LOT-A2", "100").await;
    let handle = spawn(&env, &run.step_run_id, 20);

    handle.edit("inlet_temp_c", json!(80)).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let stored = env.state.store.fetch(&run.step_run_id).await.unwrap();
    assert_eq!(stored.run.fields.get("inlet_temp_c"), Some(&json!(80)));

    let stats = handle.close().await.unwrap();
    assert_eq!(stats.saves, 1);
}

#[tokio::test]
async fn test_close_写完待写字段() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Washing, "LOT-A3", "100").await;
    let handle = spawn(&env, &run.step_run_id, 10_000);

    let mut fields = FieldMap::new();
    fields.insert("visual_status".to_string(), json!("ABSENT"));
    fields.insert("remarks".to_string(), json!("首批"));
    handle.edit_fields(fields).unwrap();

    let stats = handle.close().await.expect("close 失败");
    assert_eq!(stats.saves, 1);

    let stored = env.state.store.fetch(&run.step_run_id).await.unwrap();
    assert_eq!(stored.run.fields.get("remarks"), Some(&json!("首批")));
    assert_eq!(stored.run.fields.get("visual_status"), Some(&json!("ABSENT")));
}

#[tokio::test]
async fn test_保存中继续编辑() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Washing, "LOT-A4", "100").await;
    let handle = spawn(&env, &run.step_run_id, 0);

    for i in 0..20 {
        handle.edit("wash_duration_min", json!(i)).unwrap();
        tokio::task::yield_now().await;
    }
    let stats = handle.close().await.unwrap();
    assert!(stats.saves >= 1);
    assert_eq!(stats.failures, 0);

    let stored = env.state.store.fetch(&run.step_run_id).await.unwrap();
    assert_eq!(stored.run.fields.get("wash_duration_min"), Some(&json!(19)));
    assert_eq!(stored.run.revision, run.revision + stats.saves as i32);
}

#[tokio::test]
async fn test_保存失败通知() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let handle = spawn(&env, "missing-run", 10_000);

    handle.edit("chlorine_ppm", json!("50")).unwrap();
    let stats = handle.close().await.unwrap();

    assert_eq!(stats.saves, 0);
    assert_eq!(stats.failures, 1);
    assert!(env.notification_keys().contains(&"autosave.failed".to_string()));
}

#[tokio::test]
async fn test_open_autosave_按工序配置() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Sorting, "LOT-A5", "100").await;

    let handle = env
        .state
        .step_run_api
        .open_autosave(&run.step_run_id, "operator")
        .await
        .expect("自动保存启动失败");
    assert_eq!(handle.step_run_id(), run.step_run_id);

    handle.edit("grade_note", json!("A级偏多")).unwrap();
    let stats = handle.close().await.unwrap();
    assert_eq!(stats.saves, 1);

    let stored = env.state.store.fetch(&run.step_run_id).await.unwrap();
    assert_eq!(stored.run.updated_by.as_deref(), Some("operator"));

    assert!(env
        .state
        .step_run_api
        .open_autosave("missing-run", "operator")
        .await
        .is_err());
}

#[tokio::test]
async fn test_registry_按字段组刷新() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let washing = env.create_run(StepKind::Washing, "LOT-A6", "100").await;
    let drying = env.create_run(StepKind::Drying, "LOT-A6", "90").await;

    let mut registry = AutosaveRegistry::new();
    assert!(registry
        .register("washing", spawn(&env, &washing.step_run_id, 10_000))
        .is_none());
    assert!(registry
        .register("drying", spawn(&env, &drying.step_run_id, 10_000))
        .is_none());
    assert_eq!(registry.len(), 2);

    registry
        .get("washing")
        .unwrap()
        .edit("chlorine_ppm", json!("60"))
        .unwrap();
    registry
        .get("drying")
        .unwrap()
        .edit("inlet_temp_c", json!(75))
        .unwrap();

    let results = registry.flush_all().await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, r)| matches!(r, Ok(s) if s.saves == 1)));

    let results = registry.close_all().await;
    assert_eq!(results.len(), 2);
    assert!(registry.is_empty());

    let stored = env.state.store.fetch(&drying.step_run_id).await.unwrap();
    assert_eq!(stored.run.fields.get("inlet_temp_c"), Some(&json!(75)));
}

/// 轮询直到字段写入或超时
async fn wait_for_field(
    env: &ApiTestEnv,
    step_run_id: &str,
    key: &str,
    expected: &serde_json::Value,
) -> bool {
    for _ in 0..50 {
        let stored = env.state.store.fetch(step_run_id).await.unwrap();
        if stored.run.fields.get(key) == Some(expected) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_句柄释放强制保存() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Washing, "LOT-A7", "100").await;
    let handle = spawn(&env, &run.step_run_id, 10_000);

    handle.edit("chlorine_ppm", json!("77")).unwrap();
    // 未调用 close, 防抖窗口远未到期
    drop(handle);

    assert!(wait_for_field(&env, &run.step_run_id, "chlorine_ppm", &json!("77")).await);
}

#[tokio::test]
async fn test_registry_替换字段组() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Drying, "LOT-A8", "100").await;

    let mut registry = AutosaveRegistry::new();
    registry.register("drying", spawn(&env, &run.step_run_id, 10_000));
    registry
        .get("drying")
        .unwrap()
        .edit("inlet_temp_c", json!(70))
        .unwrap();

    let replaced = registry
        .register("drying", spawn(&env, &run.step_run_id, 10_000))
        .expect("应返回被替换的句柄");
    assert_eq!(registry.len(), 1);
    drop(replaced);

    assert!(wait_for_field(&env, &run.step_run_id, "inlet_temp_c", &json!(70)).await);

    registry
        .get("drying")
        .unwrap()
        .edit("drying_duration_min", json!(45))
        .unwrap();
    let results = registry.close_all().await;
    assert!(results.iter().all(|(_, r)| matches!(r, Ok(s) if s.saves == 1)));

    let stored = env.state.store.fetch(&run.step_run_id).await.unwrap();
    assert_eq!(stored.run.fields.get("inlet_temp_c"), Some(&json!(70)));
    assert_eq!(stored.run.fields.get("drying_duration_min"), Some(&json!(45)));
}
