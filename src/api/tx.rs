// ==========================================
// 出口集装箱质检追踪系统 - 写事务边界
// ==========================================
// 约定: 所有“读-校验-写”在一个 BEGIN IMMEDIATE 事务内完成，
//       SQLite 写锁即请求级锁；闭包返回 Err 时事务随 drop 回滚
// 红线: 闭包内不得再调用会锁同一连接的仓储实例方法
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// 在 IMMEDIATE 写事务内执行
pub(crate) fn with_write_tx<T>(
    conn: &Arc<Mutex<Connection>>,
    f: impl FnOnce(&Transaction<'_>) -> ApiResult<T>,
) -> ApiResult<T> {
    let mut guard = conn
        .lock()
        .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))?;
    let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// 在只读事务内执行（多条查询共享同一快照）
pub(crate) fn with_read_tx<T>(
    conn: &Arc<Mutex<Connection>>,
    f: impl FnOnce(&Transaction<'_>) -> ApiResult<T>,
) -> ApiResult<T> {
    let mut guard = conn
        .lock()
        .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))?;
    let tx = guard.transaction_with_behavior(TransactionBehavior::Deferred)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}
