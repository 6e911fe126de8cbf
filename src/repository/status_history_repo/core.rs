use crate::domain::status_history::StatusHistoryEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_support::fmt_datetime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// StatusHistoryRepository - 状态历史仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct StatusHistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StatusHistoryRepository {
    /// 创建新的状态历史仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 追加一条状态变更记录（事务内，与状态迁移同事务提交）
    ///
    /// # 参数
    /// - `entry`: 状态变更记录
    ///
    /// # 返回
    /// - `Ok(history_id)`: 成功插入
    pub fn insert_tx(conn: &Connection, entry: &StatusHistoryEntry) -> RepositoryResult<String> {
        conn.execute(
            r#"
            INSERT INTO container_status_history (
                history_id, container_id, from_status, to_status, actor, payload_json, action_ts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                &entry.history_id,
                entry.container_id,
                entry.from_status.as_str(),
                entry.to_status.as_str(),
                &entry.actor,
                entry.payload_json.as_ref().map(|v| v.to_string()),
                fmt_datetime(&entry.action_ts),
            ],
        )?;
        Ok(entry.history_id.clone())
    }
}
