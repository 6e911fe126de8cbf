// ==========================================
// HoldResolutionApi 集成测试
// ==========================================
// 测试范围:
// 1. release_hold（含 send_back_to_qc）/ request_reinspection / reject_container
// 2. 处理记录只追加，previous_qc_status 为 held
// 3. 非 held、不存在、越权
// 4. 通知失败不影响处理结果
// ==========================================

mod helpers;

use std::sync::Arc;

use container_qc::api::ApiError;
use container_qc::domain::types::{QcStatus, ResolutionAction};
use container_qc::engine::notification::{NotificationEventType, RecordingNotificationSink};
use helpers::api_test_helper::*;
use test_helpers::count_rows;

#[tokio::test]
async fn test_release_hold_to_approved() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.held_container().await;

    let outcome = env
        .state
        .hold_resolution_api
        .resolve_hold(id, ResolutionAction::ReleaseHold, Some("dents are cosmetic"), LIC_OM_INTERNAL, false)
        .await
        .expect("处理扣留失败");
    assert_eq!(outcome.new_status, QcStatus::Approved);
    assert!(!outcome.reenters_qc);

    let container = env.state.qc_api.get_container(LIC_OM_INTERNAL, id).expect("查询失败");
    assert_eq!(container.qc_status, QcStatus::Approved);
    assert!(container.hold.is_none(), "扣留原因应被清除");
    assert!(container.inspection.is_some(), "放行不清空检验数据");

    let log = env
        .state
        .hold_resolution_api
        .list_resolutions(id)
        .expect("查询失败");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].previous_qc_status, QcStatus::Held);
    assert_eq!(log[0].resolution_action, ResolutionAction::ReleaseHold);
    assert_eq!(log[0].resolution_note.as_deref(), Some("dents are cosmetic"));
    assert_eq!(log[0].resolved_by, LIC_OM_INTERNAL);
    assert!(!log[0].send_back_to_qc);
}

#[tokio::test]
async fn test_release_hold_send_back_to_qc() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.held_container().await;

    let outcome = env
        .state
        .hold_resolution_api
        .resolve_hold(id, ResolutionAction::ReleaseHold, None, LIC_OM_INTERNAL, true)
        .await
        .expect("处理扣留失败");
    assert_eq!(outcome.new_status, QcStatus::QcSubmitted);
    assert!(outcome.reenters_qc);

    // 回到 qc_submitted 后可以重新审核
    let approved = env.state.qc_api.clear(LIC_OM_INTERNAL, id).expect("放行失败");
    assert_eq!(approved.qc_status, QcStatus::Approved);
}

#[tokio::test]
async fn test_request_reinspection_clears_inspection() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.held_container().await;

    // send_back_to_qc 对复检无影响
    let outcome = env
        .state
        .hold_resolution_api
        .resolve_hold(id, ResolutionAction::RequestReinspection, None, LIC_OM_INTERNAL, false)
        .await
        .expect("处理扣留失败");
    assert_eq!(outcome.new_status, QcStatus::Arrived);
    assert!(outcome.reenters_qc);

    let container = env.state.qc_api.get_container(LIC_OM_INTERNAL, id).expect("查询失败");
    assert_eq!(container.qc_status, QcStatus::Arrived);
    assert!(container.inspection.is_none());
    assert!(container.arrival.is_some(), "到场信息保留");

    let resubmitted = env
        .state
        .qc_api
        .start_inspection(LIC_OM_INTERNAL, id, cartons(98))
        .expect("复检提交失败");
    assert_eq!(resubmitted.qc_status, QcStatus::QcSubmitted);
    assert_eq!(
        resubmitted.inspection.map(|i| i.info.actual_carton_count),
        Some(Some(98))
    );
}

#[tokio::test]
async fn test_reject_container_is_terminal() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.held_container().await;

    let outcome = env
        .state
        .hold_resolution_api
        .resolve_hold(id, ResolutionAction::RejectContainer, Some("mould"), LIC_OM_INTERNAL, true)
        .await
        .expect("处理扣留失败");
    assert_eq!(outcome.new_status, QcStatus::Rejected);
    assert!(!outcome.reenters_qc);

    assert_api_error(
        env.state.qc_api.clear(LIC_OM_INTERNAL, id),
        |e| matches!(e, ApiError::InvalidTransition { .. }),
        "拒收后放行",
    );
    assert_api_error(
        env.state.qc_api.mark_arrived(LIC_OM_INTERNAL, id, None, "Sohar"),
        |e| matches!(e, ApiError::InvalidTransition { .. }),
        "拒收后登记到场",
    );
    let again = env
        .state
        .hold_resolution_api
        .resolve_hold(id, ResolutionAction::ReleaseHold, None, LIC_OM_INTERNAL, false)
        .await;
    assert_api_error(again, |e| matches!(e, ApiError::InvalidTransition { .. }), "拒收后再处理");
}

#[tokio::test]
async fn test_resolve_hold_guards() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let approved = env.approved_container();

    let result = env
        .state
        .hold_resolution_api
        .resolve_hold(approved, ResolutionAction::ReleaseHold, None, LIC_OM_INTERNAL, false)
        .await;
    assert_api_error(result, |e| matches!(e, ApiError::InvalidTransition { .. }), "非 held");

    let result = env
        .state
        .hold_resolution_api
        .resolve_hold(424_242, ResolutionAction::ReleaseHold, None, LIC_OM_INTERNAL, false)
        .await;
    assert_api_error(result, |e| matches!(e, ApiError::NotFound(_)), "不存在");

    let held = env.held_container().await;
    let result = env
        .state
        .hold_resolution_api
        .resolve_hold(held, ResolutionAction::ReleaseHold, None, LIC_QA_INTERNAL, false)
        .await;
    assert_api_error(result, |e| matches!(e, ApiError::AccessDenied(_)), "国别不匹配");

    // 失败不写处理记录
    let conn = env.conn();
    assert_eq!(count_rows(&conn, "qc_hold_resolution", None), 0);
    let container = env.state.qc_api.get_container(LIC_OM_INTERNAL, held).expect("查询失败");
    assert_eq!(container.qc_status, QcStatus::Held);
}

#[tokio::test]
async fn test_second_resolution_on_new_hold_appends() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let id = env.held_container().await;
    let api = &env.state.hold_resolution_api;

    api.resolve_hold(id, ResolutionAction::ReleaseHold, None, LIC_OM_INTERNAL, true)
        .await
        .expect("第一次处理失败");
    env.state
        .qc_api
        .hold(LIC_OM_INTERNAL, id, "temperature", None)
        .await
        .expect("再次扣留失败");
    api.resolve_hold(id, ResolutionAction::ReleaseHold, None, LIC_OM_INTERNAL, false)
        .await
        .expect("第二次处理失败");

    let log = api.list_resolutions(id).expect("查询失败");
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|r| r.previous_qc_status == QcStatus::Held));

    let history = env.state.qc_api.status_history(LIC_OM_INTERNAL, id).expect("查询失败");
    let last = history.last().expect("应有历史");
    assert_eq!((last.from_status, last.to_status), (QcStatus::Held, QcStatus::Approved));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_resolution() {
    let sink = Arc::new(RecordingNotificationSink::failing_for(&[BUYER]));
    let env = ApiTestEnv::with_sink(sink.clone()).expect("无法创建测试环境");
    let id = env.held_container().await;

    let outcome = env
        .state
        .hold_resolution_api
        .resolve_hold(id, ResolutionAction::ReleaseHold, None, LIC_OM_INTERNAL, false)
        .await
        .expect("通知失败不应影响处理");
    assert_eq!(outcome.new_status, QcStatus::Approved);

    let resolved: Vec<_> = sink
        .sent()
        .into_iter()
        .filter(|n| n.event_type == NotificationEventType::HoldResolved)
        .collect();
    let mut recipients: Vec<String> = resolved.iter().map(|n| n.recipient_id.clone()).collect();
    recipients.sort();
    assert_eq!(recipients, vec![ADMIN.to_string(), MANAGER.to_string()]);
    assert_eq!(resolved[0].payload["new_status"], "approved");
}
