// ==========================================
// 检测类工序集成测试
// ==========================================
// 测试范围:
// 1. 金属检测: PASS/FAIL 结论与剔除记录一致性, 剔除量计入台账
// 2. 质检: 评分完整性, 不合格项列表
// 3. 清洗/干燥: 表单提交与称重复核
// ==========================================

mod helpers;

use food_trace::api::ApiError;
use food_trace::domain::child::ChildRecord;
use food_trace::domain::forms::field_keys;
use food_trace::domain::metal::{NewMetalCheckAttempt, NewMetalRejection};
use food_trace::domain::qc::QcScore;
use food_trace::domain::step_run::{FieldMap, StepRunUpsert};
use food_trace::domain::types::{CheckStatus, QcParameter, StepKind, StepRunStatus};
use food_trace::domain::waste::NewWeightCheck;
use food_trace::notify::NotificationLevel;
use food_trace::repository::StepRecordStore;
use helpers::api_test_helper::*;
use serde_json::json;

fn attempt(check_no: i32, status: CheckStatus, rejections: Vec<NewMetalRejection>) -> NewMetalCheckAttempt {
    NewMetalCheckAttempt {
        check_no,
        status,
        remarks: None,
        checked_by: Some("inspector".to_string()),
        rejections,
    }
}

fn full_scores() -> Vec<QcScore> {
    QcParameter::ALL.iter().map(|p| QcScore::new(*p, 3)).collect()
}

// ==========================================
// 金属检测
// ==========================================

#[tokio::test]
async fn test_metal_pass_无剔除() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::MetalDetection, "LOT-M1", "50").await;

    let mutation = env
        .state
        .metal_detection_api
        .record_attempt(&run.step_run_id, attempt(1, CheckStatus::Pass, vec![NewMetalRejection::default()]))
        .await
        .expect("PASS 应保存成功");

    match mutation.record {
        ChildRecord::MetalCheckAttempt(a) => {
            assert_eq!(a.status, CheckStatus::Pass);
            // 空白占位行被清理
            assert!(a.rejections.is_empty());
        }
        other => panic!("期望金属检测记录, 实际 {:?}", other.kind()),
    }
    let ledger = mutation.ledger.expect("金属检测应有台账");
    assert!((ledger.final_remaining - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_metal_fail_剔除计入台账() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::MetalDetection, "LOT-M2", "50").await;

    let mutation = env
        .state
        .metal_detection_api
        .record_attempt(
            &run.step_run_id,
            attempt(
                1,
                CheckStatus::Fail,
                vec![
                    NewMetalRejection::new("铁", 1.5),
                    NewMetalRejection::new("不锈钢", 1.0),
                ],
            ),
        )
        .await
        .expect("FAIL 应保存成功");

    let ledger = mutation.ledger.unwrap();
    assert!((ledger.total_allocated - 2.5).abs() < 1e-9);
    assert!((ledger.final_remaining - 47.5).abs() < 1e-9);

    let warning = env
        .state
        .notifications
        .active()
        .into_iter()
        .find(|n| n.key == "metal.rejected")
        .expect("应有剔除告警");
    assert_eq!(warning.level, NotificationLevel::Warning);
    assert!(warning.message.contains("2.500"));
}

#[tokio::test]
async fn test_metal_结论不一致() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::MetalDetection, "LOT-M3", "50").await;
    let api = &env.state.metal_detection_api;

    let err = api
        .record_attempt(&run.step_run_id, attempt(1, CheckStatus::Fail, vec![]))
        .await
        .expect_err("FAIL 无剔除记录应被拒绝");
    assert!(err.is_validation());

    let err = api
        .record_attempt(
            &run.step_run_id,
            attempt(1, CheckStatus::Pass, vec![NewMetalRejection::new("铁", 0.5)]),
        )
        .await
        .expect_err("PASS 带剔除记录应被拒绝");
    assert!(err.is_validation());

    api.record_attempt(&run.step_run_id, attempt(1, CheckStatus::Pass, vec![]))
        .await
        .unwrap();
    let err = api
        .record_attempt(&run.step_run_id, attempt(1, CheckStatus::Pass, vec![]))
        .await
        .expect_err("检查编号重复应被拒绝");
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_metal_剔除超出可用量() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::MetalDetection, "LOT-M4", "2").await;

    let err = env
        .state
        .metal_detection_api
        .record_attempt(
            &run.step_run_id,
            attempt(1, CheckStatus::Fail, vec![NewMetalRejection::new("铁", 3.0)]),
        )
        .await
        .expect_err("剔除量超出可用量应被拦截");
    assert!(matches!(err, ApiError::Allocation(_)));
}

#[tokio::test]
async fn test_metal_下调可用量后仍可记录pass() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::MetalDetection, "LOT-M5", "1").await;
    let api = &env.state.metal_detection_api;

    api.record_attempt(
        &run.step_run_id,
        attempt(1, CheckStatus::Fail, vec![NewMetalRejection::new("铁", 0.5)]),
    )
    .await
    .expect("FAIL 应保存成功");

    let view = env
        .state
        .step_run_api
        .set_available_qty(&run.step_run_id, "0.2", "tester")
        .await
        .expect("下调可用量应允许保存");
    assert!(view.ledger.unwrap().over_budget);

    // PASS 不增加剔除量
    let mutation = api
        .record_attempt(&run.step_run_id, attempt(2, CheckStatus::Pass, vec![]))
        .await
        .expect("超额存量不应阻止 PASS");
    let ledger = mutation.ledger.unwrap();
    assert!(ledger.over_budget);
    assert!((ledger.total_allocated - 0.5).abs() < 1e-9);

    // 新增剔除仍受上限约束
    let err = api
        .record_attempt(
            &run.step_run_id,
            attempt(3, CheckStatus::Fail, vec![NewMetalRejection::new("铁", 0.1)]),
        )
        .await
        .expect_err("超额时新增剔除应被拦截");
    assert!(matches!(err, ApiError::Allocation(_)));
}

// ==========================================
// 质检
// ==========================================

#[tokio::test]
async fn test_qc_全部满分合格() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::QcCheck, "LOT-Q1", "0").await;

    let mutation = env
        .state
        .qc_api
        .submit_check(&run.step_run_id, full_scores(), Some("qa".to_string()))
        .await
        .expect("质检提交失败");

    match mutation.record {
        ChildRecord::QcCheck(q) => {
            assert_eq!(q.result, CheckStatus::Pass);
            assert!(q.failed_parameters.is_empty());
        }
        other => panic!("期望质检记录, 实际 {:?}", other.kind()),
    }
    assert!(mutation.ledger.is_none());
}

#[tokio::test]
async fn test_qc_不合格项按参数顺序() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::QcCheck, "LOT-Q2", "0").await;

    let mut scores = full_scores();
    scores.reverse();
    for s in scores.iter_mut() {
        if matches!(s.parameter, QcParameter::Odour | QcParameter::Colour) {
            s.score = 1;
        }
    }

    let mutation = env
        .state
        .qc_api
        .submit_check(&run.step_run_id, scores, None)
        .await
        .expect("质检提交失败");

    let ChildRecord::QcCheck(q) = mutation.record else {
        panic!("期望质检记录");
    };
    assert_eq!(q.result, CheckStatus::Fail);
    let codes: Vec<&str> = q.failed_parameters.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["QC02", "QC03"]);

    let warning = env
        .state
        .notifications
        .active()
        .into_iter()
        .find(|n| n.key == "qc.failed")
        .expect("应有质检告警");
    assert!(warning.message.contains("Colour, Odour"));
}

#[tokio::test]
async fn test_qc_评分不完整() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let mut scores = full_scores();
    scores.pop();

    let err = env.state.qc_api.evaluate(&scores).expect_err("缺项应被拒绝");
    assert!(err.is_validation());

    let mut scores = full_scores();
    scores[0].score = 4;
    assert!(env.state.qc_api.evaluate(&scores).is_err());
}

// ==========================================
// 清洗 / 干燥
// ==========================================

fn washing_fields() -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(field_keys::CHLORINE_PPM.to_string(), json!("50"));
    fields.insert(field_keys::WASH_DURATION_MIN.to_string(), json!(12));
    fields.insert(field_keys::VISUAL_STATUS.to_string(), json!("ABSENT"));
    fields.insert(field_keys::PEST_STATUS.to_string(), json!("ABSENT"));
    fields.insert(field_keys::MOULD_STATUS.to_string(), json!("NOT_CHECKED"));
    fields.insert(field_keys::FOREIGN_MATTER_REMOVED.to_string(), json!("Yes"));
    fields
}

#[tokio::test]
async fn test_washing_提交表单() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Washing, "LOT-W1", "100").await;

    let submitted = env
        .state
        .washing_api
        .submit_form(&run.step_run_id, washing_fields(), "operator")
        .await
        .expect("提交失败");
    assert_eq!(submitted.status, StepRunStatus::Completed);
    assert!(submitted.revision > run.revision);

    let mut bad = washing_fields();
    bad.insert(field_keys::CHLORINE_PPM.to_string(), json!("500"));
    let err = env
        .state
        .washing_api
        .submit_form(&run.step_run_id, bad, "operator")
        .await
        .expect_err("余氯超范围应被拒绝");
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_washing_提交合并已保存字段() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Washing, "LOT-W2", "100").await;

    // 自动保存已写入部分字段
    let mut saved = FieldMap::new();
    saved.insert(field_keys::CHLORINE_PPM.to_string(), json!("50"));
    saved.insert(field_keys::WASH_DURATION_MIN.to_string(), json!(12));
    env.state
        .store
        .upsert(&run.step_run_id, StepRunUpsert::fields_only(saved, None))
        .await
        .unwrap();

    let mut rest = washing_fields();
    rest.remove(field_keys::CHLORINE_PPM);
    rest.remove(field_keys::WASH_DURATION_MIN);
    let submitted = env
        .state
        .washing_api
        .submit_form(&run.step_run_id, rest, "operator")
        .await
        .expect("已保存字段应参与校验");
    assert_eq!(submitted.status, StepRunStatus::Completed);
    assert_eq!(
        submitted.fields.get(field_keys::CHLORINE_PPM),
        Some(&json!("50"))
    );

    // 本次提交覆盖已保存值
    let mut bad = FieldMap::new();
    bad.insert(field_keys::CHLORINE_PPM.to_string(), json!("500"));
    let err = env
        .state
        .washing_api
        .submit_form(&run.step_run_id, bad, "operator")
        .await
        .expect_err("余氯超范围应被拒绝");
    assert!(err.is_validation());

    let mut missing = FieldMap::new();
    missing.insert(field_keys::INLET_TEMP_C.to_string(), json!(80));
    let drying = env.create_run(StepKind::Drying, "LOT-W2", "90").await;
    let err = env
        .state
        .drying_api
        .submit_form(&drying.step_run_id, missing, "operator")
        .await
        .expect_err("缺少必填字段应被拒绝");
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_weight_check_容差() {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    let run = env.create_run(StepKind::Drying, "LOT-D1", "100").await;
    let api = &env.state.drying_api;

    let ok = api
        .add_weight_check(
            &run.step_run_id,
            NewWeightCheck {
                check_no: 1,
                target_weight: 10.0,
                actual_weight: 10.1,
                within_tolerance: false,
            },
        )
        .await
        .unwrap();
    let ChildRecord::WeightCheck(c) = ok.record else {
        panic!("期望称重记录");
    };
    assert!(c.within_tolerance);

    let off = api
        .add_weight_check(
            &run.step_run_id,
            NewWeightCheck {
                check_no: 2,
                target_weight: 10.0,
                actual_weight: 11.0,
                within_tolerance: true,
            },
        )
        .await
        .unwrap();
    let ChildRecord::WeightCheck(c) = off.record else {
        panic!("期望称重记录");
    };
    assert!(!c.within_tolerance);
    assert!(env
        .notification_keys()
        .contains(&"weight_check.out_of_tolerance".to_string()));
}
