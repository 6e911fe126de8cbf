// ==========================================
// 出口集装箱质检追踪系统 - 产能需求数据仓储
// ==========================================
// 职责: 读取外部产能需求；产能台账（已分配集装箱计数）
// 红线: 不修改配额与交付窗口，唯一写入为首个计划标记
// ==========================================

use crate::domain::capacity::CapacityRequest;
use crate::domain::types::RequestStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_support::{fmt_datetime, get_opt_date, get_opt_datetime};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT request_id, buyer_id, container_amount, start_date, end_date,
           deadline_date, import_country, status, farmer_accepted_at
    FROM capacity_request
"#;

// ==========================================
// CapacityRequestRepository - 产能需求仓储
// ==========================================
pub struct CapacityRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CapacityRequestRepository {
    /// 从共享连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询产能需求
    pub fn find_by_id(&self, request_id: &str) -> RepositoryResult<Option<CapacityRequest>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, request_id)
    }

    /// 按ID查询产能需求（事务内）
    pub fn find_by_id_tx(
        conn: &Connection,
        request_id: &str,
    ) -> RepositoryResult<Option<CapacityRequest>> {
        let sql = format!("{} WHERE request_id = ?1", SELECT_COLUMNS);
        let request = conn
            .query_row(&sql, params![request_id], Self::map_row)
            .optional()?;
        Ok(request)
    }

    /// 已分配集装箱数量（产能台账）
    ///
    /// 通过 plan 关联实时统计，不做缓存；调用方负责在写事务内调用
    pub fn count_allocated_containers_tx(conn: &Connection, request_id: &str) -> RepositoryResult<i64> {
        let used: i64 = conn.query_row(
            r#"
            SELECT COUNT(c.container_id)
            FROM container c
            JOIN production_plan p ON p.plan_id = c.plan_id
            WHERE p.request_id = ?1
            "#,
            params![request_id],
            |row| row.get(0),
        )?;
        Ok(used)
    }

    /// 已分配集装箱数量（只读快照）
    pub fn count_allocated_containers(&self, request_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::count_allocated_containers_tx(&conn, request_id)
    }

    /// 写入首个计划创建标记（仅当尚未写入）
    ///
    /// # 返回
    /// - Ok(true): 本次写入
    /// - Ok(false): 已存在标记，未修改
    pub fn mark_first_plan_created(
        &self,
        request_id: &str,
        at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE capacity_request
            SET farmer_accepted_at = ?2
            WHERE request_id = ?1 AND farmer_accepted_at IS NULL
            "#,
            params![request_id, fmt_datetime(&at)],
        )?;
        Ok(rows == 1)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CapacityRequest> {
        let status: String = row.get(7)?;
        Ok(CapacityRequest {
            request_id: row.get(0)?,
            buyer_id: row.get(1)?,
            container_amount: row.get(2)?,
            start_date: get_opt_date(row, 3)?,
            end_date: get_opt_date(row, 4)?,
            deadline_date: get_opt_date(row, 5)?,
            import_country: row.get(6)?,
            status: RequestStatus::from_str(&status),
            farmer_accepted_at: get_opt_datetime(row, 8)?,
        })
    }
}
