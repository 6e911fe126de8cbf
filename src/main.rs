// ==========================================
// 出口集装箱质检追踪系统 - 命令行入口
// ==========================================
// 职责: 初始化日志与数据库，报告 schema 状态
// 说明: 业务接口以库形式提供（container_qc::AppState）
// ==========================================

use container_qc::app::{get_default_db_path, AppState};
use container_qc::db::{open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use std::process::ExitCode;

fn main() -> ExitCode {
    container_qc::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", container_qc::APP_NAME);
    tracing::info!("系统版本: {}", container_qc::VERSION);
    tracing::info!("==================================================");

    // 命令行参数优先，其次环境变量/默认路径
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let app_state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("AppState初始化失败: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let version = open_sqlite_connection(app_state.get_db_path())
        .and_then(|conn| read_schema_version(&conn));
    match version {
        Ok(Some(v)) if v == CURRENT_SCHEMA_VERSION => {
            tracing::info!("schema_version={}，与代码一致", v);
            ExitCode::SUCCESS
        }
        Ok(Some(v)) => {
            tracing::warn!("schema_version={}，期望 {}", v, CURRENT_SCHEMA_VERSION);
            ExitCode::FAILURE
        }
        Ok(None) => {
            tracing::warn!("数据库缺少 schema_version 表");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("schema_version 读取失败: {}", e);
            ExitCode::FAILURE
        }
    }
}
