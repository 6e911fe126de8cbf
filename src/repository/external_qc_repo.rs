// ==========================================
// 出口集装箱质检追踪系统 - 外部质检报告仓储
// ==========================================
// 约束: container_id 唯一，报告创建后不可修改
// ==========================================

use crate::domain::qc::{ExternalQcReport, ReportedContainer};
use crate::repository::container_repo::ContainerRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_support::{fmt_datetime, get_datetime, get_json_array};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const REPORT_COLUMNS: &str = r#"
    x.report_id, x.container_id, x.qc_license_id, x.actual_quantity, x.quality_condition,
    x.packaging_condition, x.discrepancies, x.attachments, x.confirmed_at
"#;

pub struct ExternalQcRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExternalQcRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入报告（事务内）
    ///
    /// 重复提交由 UNIQUE(container_id) 兜底为 UniqueConstraintViolation
    pub fn insert_tx(conn: &Connection, report: &ExternalQcReport) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO external_qc_report (
                report_id, container_id, qc_license_id, actual_quantity, quality_condition,
                packaging_condition, discrepancies, attachments, confirmed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                &report.report_id,
                report.container_id,
                &report.qc_license_id,
                report.actual_quantity,
                &report.quality_condition,
                &report.packaging_condition,
                &report.discrepancies,
                serde_json::to_string(&report.attachments)?,
                fmt_datetime(&report.confirmed_at),
            ],
        )?;
        Ok(())
    }

    /// 集装箱是否已有报告（事务内）
    pub fn exists_for_container_tx(conn: &Connection, container_id: i64) -> RepositoryResult<bool> {
        let exists = conn
            .query_row(
                "SELECT 1 FROM external_qc_report WHERE container_id = ?1",
                params![container_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        Ok(exists)
    }

    /// 按集装箱查询报告
    pub fn find_by_container(&self, container_id: i64) -> RepositoryResult<Option<ExternalQcReport>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM external_qc_report x WHERE x.container_id = ?1",
            REPORT_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![container_id], |row| Self::map_report(row, 0))
            .optional()?)
    }

    /// 某执照在国别范围内提交过的报告（按确认时间倒序）
    pub fn list_by_license(
        &self,
        license_id: &str,
        country: &str,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<ReportedContainer>, i64)> {
        let conn = self.get_conn()?;

        const FROM_WHERE: &str = r#"
            FROM external_qc_report x
            JOIN container c ON c.container_id = x.container_id
            JOIN production_plan p ON p.plan_id = c.plan_id
            JOIN capacity_request r ON r.request_id = c.buyer_request_id
            LEFT JOIN app_user u ON u.user_id = c.supplier_id
            WHERE x.qc_license_id = ?1
              AND LOWER(TRIM(r.import_country)) = LOWER(TRIM(?2))
        "#;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) {}", FROM_WHERE),
            params![license_id, country],
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT c.container_id, c.plan_id, c.container_no, c.qc_status, c.qc_reviewed_by, \
             c.qc_reviewed_at, c.qc_arrived_at, c.qc_arrival_place, c.qc_inspection_info, \
             c.qc_inspected_by, c.qc_inspected_at, c.qc_hold_reason, c.qc_hold_details, \
             c.tracking_code, c.supplier_id, c.buyer_request_id, c.metadata, c.admin_metadata, \
             c.created_at, c.updated_at, p.plan_date, u.display_name, r.import_country, {} {} \
             ORDER BY x.confirmed_at DESC, x.report_id DESC LIMIT ?3 OFFSET ?4",
            REPORT_COLUMNS, FROM_WHERE
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![license_id, country, limit, offset], |row| {
                Ok(ReportedContainer {
                    summary: ContainerRepository::map_summary(row)?,
                    report: Self::map_report(row, 23)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }

    /// 从 base 列开始映射报告字段
    fn map_report(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<ExternalQcReport> {
        Ok(ExternalQcReport {
            report_id: row.get(base)?,
            container_id: row.get(base + 1)?,
            qc_license_id: row.get(base + 2)?,
            actual_quantity: row.get(base + 3)?,
            quality_condition: row.get(base + 4)?,
            packaging_condition: row.get(base + 5)?,
            discrepancies: row.get(base + 6)?,
            attachments: get_json_array(row, base + 7)?,
            confirmed_at: get_datetime(row, base + 8)?,
        })
    }
}
