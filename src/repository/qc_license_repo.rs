// ==========================================
// 出口集装箱质检追踪系统 - 质检执照仓储（只读）
// ==========================================

use crate::domain::qc::QcLicense;
use crate::domain::types::LicenseKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct QcLicenseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl QcLicenseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询执照（含停用）
    pub fn find_by_id(&self, license_id: &str) -> RepositoryResult<Option<QcLicense>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, license_id)
    }

    /// 按ID查询执照（事务内）
    pub fn find_by_id_tx(conn: &Connection, license_id: &str) -> RepositoryResult<Option<QcLicense>> {
        Ok(conn
            .query_row(
                r#"
                SELECT license_id, assigned_to, country_code, license_kind, is_active
                FROM qc_license
                WHERE license_id = ?1
                "#,
                params![license_id],
                |row| {
                    let kind: String = row.get(3)?;
                    Ok(QcLicense {
                        license_id: row.get(0)?,
                        assigned_to: row.get(1)?,
                        country_code: row.get(2)?,
                        kind: LicenseKind::from_str(&kind).ok_or_else(|| {
                            rusqlite::Error::FromSqlConversionFailure(
                                3,
                                Type::Text,
                                format!("未知的执照类型: {}", kind).into(),
                            )
                        })?,
                        is_active: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }
}
