// ==========================================
// 出口集装箱质检追踪系统 - 用户目录仓储（只读）
// ==========================================
// 用途: 解析通知接收人
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 接收内部通知的角色
const STAFF_ROLES: [&str; 2] = ["admin", "manager"];

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在岗管理员/经理用户ID（按ID排序）
    pub fn list_active_staff(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT user_id FROM app_user
            WHERE is_active = 1 AND LOWER(role) IN (?1, ?2)
            ORDER BY user_id ASC
            "#,
        )?;
        let ids = stmt
            .query_map(params![STAFF_ROLES[0], STAFF_ROLES[1]], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// 集装箱所属需求的采购方
    pub fn find_buyer_of_container(&self, container_id: i64) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let buyer: Option<Option<String>> = conn
            .query_row(
                r#"
                SELECT r.buyer_id
                FROM container c
                JOIN capacity_request r ON r.request_id = c.buyer_request_id
                WHERE c.container_id = ?1
                "#,
                params![container_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(buyer.flatten())
    }
}
