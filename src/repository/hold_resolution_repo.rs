// ==========================================
// 出口集装箱质检追踪系统 - 扣留处理记录仓储
// ==========================================
// 红线: 只追加，不修改不删除（计划替换级联除外）
// ==========================================

use crate::domain::qc::HoldResolution;
use crate::domain::types::{QcStatus, ResolutionAction};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_support::{fmt_datetime, get_datetime};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct HoldResolutionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HoldResolutionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加扣留处理记录（事务内）
    pub fn insert_tx(conn: &Connection, resolution: &HoldResolution) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO qc_hold_resolution (
                resolution_id, container_id, previous_qc_status, resolution_action,
                resolution_note, resolved_by, send_back_to_qc, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                &resolution.resolution_id,
                resolution.container_id,
                resolution.previous_qc_status.as_str(),
                resolution.resolution_action.as_str(),
                &resolution.resolution_note,
                &resolution.resolved_by,
                resolution.send_back_to_qc,
                fmt_datetime(&resolution.resolved_at),
            ],
        )?;
        Ok(())
    }

    /// 查询集装箱的全部扣留处理记录（按时间升序）
    pub fn list_by_container(&self, container_id: i64) -> RepositoryResult<Vec<HoldResolution>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT resolution_id, container_id, previous_qc_status, resolution_action,
                   resolution_note, resolved_by, send_back_to_qc, resolved_at
            FROM qc_hold_resolution
            WHERE container_id = ?1
            ORDER BY resolved_at ASC, rowid ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![container_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HoldResolution> {
        let previous: String = row.get(2)?;
        let action: String = row.get(3)?;
        Ok(HoldResolution {
            resolution_id: row.get(0)?,
            container_id: row.get(1)?,
            previous_qc_status: QcStatus::from_str(&previous).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    Type::Text,
                    format!("未知的 qc_status: {}", previous).into(),
                )
            })?,
            resolution_action: ResolutionAction::from_str(&action).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    Type::Text,
                    format!("未知的处理动作: {}", action).into(),
                )
            })?,
            resolution_note: row.get(4)?,
            resolved_by: row.get(5)?,
            send_back_to_qc: row.get(6)?,
            resolved_at: get_datetime(row, 7)?,
        })
    }
}
