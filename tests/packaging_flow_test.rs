// ==========================================
// 包装工序集成测试
// ==========================================
// 测试范围:
// 1. 包装条目与台账 (已包装 + 余料)
// 2. 余料跨工序记录复用
// 3. 箱规拆分与入库分配
// 4. 库存缓存随包装事件失效
// ==========================================

mod helpers;

use food_trace::api::ApiError;
use food_trace::domain::child::ChildRecord;
use food_trace::domain::packaging::{NewPackEntry, NewRemainderUsage, NewStorageAllocation};
use food_trace::domain::types::{ChildKind, StepKind};
use food_trace::engine::AllocationError;
use helpers::api_test_helper::*;

const UNIT: &str = "U-2KG";

fn pack_entry(pack_count: u32, remainder_qty: f64) -> NewPackEntry {
    NewPackEntry {
        product_id: "P-1".to_string(),
        packaging_unit_id: UNIT.to_string(),
        pack_count,
        unit_weight: 2.0,
        remainder_qty,
    }
}

async fn packaging_env() -> ApiTestEnv {
    let env = ApiTestEnv::new().await.expect("无法创建测试环境");
    env.seed_product("P-1");
    seed_packaging_unit(&env.db_path, UNIT, 2.0, 4).expect("包装规格写入失败");
    env
}

fn entry_id(record: &ChildRecord) -> String {
    match record {
        ChildRecord::PackEntry(e) => e.pack_entry_id.clone(),
        other => panic!("期望包装条目, 实际 {:?}", other.kind()),
    }
}

// ==========================================
// 包装条目
// ==========================================

#[tokio::test]
async fn test_pack_entry_计入台账() {
    let env = packaging_env().await;
    let run = env.create_run(StepKind::Packaging, "LOT-P1", "30").await;

    let mutation = env
        .state
        .packaging_api
        .add_pack_entry(&run.step_run_id, pack_entry(10, 1.5))
        .await
        .expect("包装条目写入失败");

    let ledger = mutation.ledger.expect("包装工序应有台账");
    assert!((ledger.total_allocated - 21.5).abs() < 1e-9);
    assert!((ledger.final_remaining - 8.5).abs() < 1e-9);

    let err = env
        .state
        .packaging_api
        .add_pack_entry(&run.step_run_id, pack_entry(4, 1.0))
        .await
        .expect_err("包装量 + 余料超出可用量应被拦截");
    match err {
        ApiError::Allocation(AllocationError::OverAllocation { shortfall, .. }) => {
            assert!((shortfall - 0.5).abs() < 1e-9);
        }
        other => panic!("期望 OverAllocation, 实际 {:?}", other),
    }
}

#[tokio::test]
async fn test_pack_entry_包数与余料不能同时为零() {
    let env = packaging_env().await;
    let run = env.create_run(StepKind::Packaging, "LOT-P2", "30").await;

    let err = env
        .state
        .packaging_api
        .add_pack_entry(&run.step_run_id, pack_entry(0, 0.0))
        .await
        .expect_err("空包装条目应被拒绝");
    assert!(err.is_validation());
}

// ==========================================
// 余料复用
// ==========================================

#[tokio::test]
async fn test_remainder_usage_跨工序记录() {
    let env = packaging_env().await;
    let api = &env.state.packaging_api;

    let first = env.create_run(StepKind::Packaging, "LOT-P3", "30").await;
    let source = api
        .add_pack_entry(&first.step_run_id, pack_entry(10, 1.5))
        .await
        .unwrap();
    let source_id = entry_id(&source.record);

    let second = env.create_run(StepKind::Packaging, "LOT-P4", "10").await;
    let target = api
        .add_pack_entry(&second.step_run_id, pack_entry(5, 0.0))
        .await
        .unwrap();
    let target_id = entry_id(&target.record);

    let mutation = api
        .add_remainder_usage(
            &second.step_run_id,
            NewRemainderUsage {
                source_pack_entry_id: source_id.clone(),
                target_pack_entry_id: target_id.clone(),
                quantity: 1.0,
            },
        )
        .await
        .expect("余料复用失败");
    // 复用进来的余料增加本工序可用量
    let ledger = mutation.ledger.unwrap();
    assert!((ledger.available_qty - 11.0).abs() < 1e-9);

    let err = api
        .add_remainder_usage(
            &second.step_run_id,
            NewRemainderUsage {
                source_pack_entry_id: source_id.clone(),
                target_pack_entry_id: target_id.clone(),
                quantity: 1.0,
            },
        )
        .await
        .expect_err("累计复用量超过源余料应被拦截");
    match err {
        ApiError::Allocation(AllocationError::OverAllocation { shortfall, .. }) => {
            assert!((shortfall - 0.5).abs() < 1e-9);
        }
        other => panic!("期望 OverAllocation, 实际 {:?}", other),
    }

    let err = api
        .add_remainder_usage(
            &second.step_run_id,
            NewRemainderUsage {
                source_pack_entry_id: target_id.clone(),
                target_pack_entry_id: target_id.clone(),
                quantity: 0.1,
            },
        )
        .await
        .expect_err("不能复用到自身");
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = api
        .add_remainder_usage(
            &second.step_run_id,
            NewRemainderUsage {
                source_pack_entry_id: "missing".to_string(),
                target_pack_entry_id: target_id,
                quantity: 0.1,
            },
        )
        .await
        .expect_err("源条目不存在");
    assert!(matches!(err, ApiError::NotFound(_)));
}

// ==========================================
// 箱规 / 入库
// ==========================================

#[tokio::test]
async fn test_box_rule_拆分() {
    let env = packaging_env().await;
    let api = &env.state.packaging_api;

    let breakdown = api.box_breakdown(UNIT, 10).expect("箱规计算失败");
    assert_eq!(breakdown.full_boxes, 2);
    assert_eq!(breakdown.loose_packs, 2);
    assert_eq!(breakdown.total_boxes(), 3);

    let units = api.list_packaging_units().unwrap();
    assert_eq!(units.len(), 1);

    let err = api.lookup_box_rule("U-NONE").expect_err("未配置箱规");
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_storage_allocation_箱数上限() {
    let env = packaging_env().await;
    let api = &env.state.packaging_api;
    let run = env.create_run(StepKind::Packaging, "LOT-P5", "30").await;
    let entry = api
        .add_pack_entry(&run.step_run_id, pack_entry(10, 0.0))
        .await
        .unwrap();
    let entry_id = entry_id(&entry.record);

    let alloc = |location: &str, box_count: u32| NewStorageAllocation {
        pack_entry_id: entry_id.clone(),
        location: location.to_string(),
        box_count,
    };

    api.add_storage_allocation(&run.step_run_id, alloc("A-01", 2))
        .await
        .expect("入库分配失败");
    let err = api
        .add_storage_allocation(&run.step_run_id, alloc("A-02", 2))
        .await
        .expect_err("超出占用箱数应被拦截");
    assert!(matches!(err, ApiError::Allocation(_)));

    api.add_storage_allocation(&run.step_run_id, alloc("A-02", 1))
        .await
        .expect("恰好用尽箱数应通过");

    let err = api
        .add_storage_allocation(&run.step_run_id, alloc("A-03", u32::MAX))
        .await
        .expect_err("超大箱数应被拦截");
    assert!(matches!(err, ApiError::Allocation(_)));

    let err = api
        .add_storage_allocation(&run.step_run_id, alloc(" ", 1))
        .await
        .expect_err("库位为空");
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let view = env
        .state
        .step_run_api
        .fetch_step_run(&run.step_run_id)
        .await
        .unwrap();
    assert_eq!(view.detail.storage_allocations.len(), 2);
}

#[tokio::test]
async fn test_upload_photo_提示未开放() {
    let env = packaging_env().await;
    let run = env.create_run(StepKind::Packaging, "LOT-P6", "30").await;

    env.state
        .packaging_api
        .upload_photo(&run.step_run_id, "label.jpg")
        .expect("照片上传不应报错");
    let last = env.state.notifications.last().expect("应有提示");
    assert_eq!(last.key, "packaging.photo_upload_unavailable");
    assert!(last.message.contains("label.jpg"));
}

// ==========================================
// 库存缓存
// ==========================================

#[tokio::test]
async fn test_stock_cache_随包装失效() {
    let env = packaging_env().await;
    let reference = &env.state.reference_api;

    reference.record_supply("P-1", "100").expect("到货登记失败");
    assert!((reference.stock_count("P-1").await.unwrap() - 100.0).abs() < 1e-9);

    let run = env.create_run(StepKind::Packaging, "LOT-P7", "30").await;
    let entry = env
        .state
        .packaging_api
        .add_pack_entry(&run.step_run_id, pack_entry(10, 0.0))
        .await
        .unwrap();
    assert!((reference.stock_count("P-1").await.unwrap() - 80.0).abs() < 1e-9);

    env.state
        .step_run_api
        .delete_child(&run.step_run_id, ChildKind::PackEntry, entry.record.id())
        .await
        .unwrap();
    assert!((reference.stock_count("P-1").await.unwrap() - 100.0).abs() < 1e-9);
}
