// ==========================================
// 出口集装箱质检追踪系统 - 集装箱数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发: 状态迁移一律为带状态谓词的条件 UPDATE，
//       返回 false 表示守卫已被并发写入方抢先改变
// ==========================================

use crate::domain::container::{
    ArrivalInfo, Container, ContainerSummary, HoldInfo, InspectionInfo, InspectionRecord,
};
use crate::domain::plan::Plan;
use crate::domain::types::{QcStatus, RequestStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_support::{
    fmt_date, fmt_datetime, get_date, get_datetime, get_opt_datetime, get_opt_json, like_pattern,
    sql_param, SqlQueryBuilder,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const CONTAINER_COLUMNS: &str = r#"
    c.container_id, c.plan_id, c.container_no, c.qc_status, c.qc_reviewed_by, c.qc_reviewed_at,
    c.qc_arrived_at, c.qc_arrival_place, c.qc_inspection_info, c.qc_inspected_by, c.qc_inspected_at,
    c.qc_hold_reason, c.qc_hold_details, c.tracking_code, c.supplier_id, c.buyer_request_id,
    c.metadata, c.admin_metadata, c.created_at, c.updated_at
"#;

const SCOPED_FROM: &str = r#"
    FROM container c
    JOIN production_plan p ON p.plan_id = c.plan_id
    JOIN capacity_request r ON r.request_id = c.buyer_request_id
    LEFT JOIN app_user u ON u.user_id = c.supplier_id
"#;

/// 集装箱 + 所属需求的国别范围信息
#[derive(Debug, Clone)]
pub struct ScopedContainer {
    pub container: Container,
    pub import_country: String,
    pub request_status: RequestStatus,
}

// ==========================================
// 列表查询参数
// ==========================================

/// 排序白名单
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerSortColumn {
    ContainerId,
    ContainerNo,
    QcStatus,
    CreatedAt,
    QcReviewedAt,
    TrackingCode,
    PlanDate,
}

impl ContainerSortColumn {
    /// 解析前端排序字段，不在白名单内返回 None
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "id" | "container_id" => Some(ContainerSortColumn::ContainerId),
            "container_no" => Some(ContainerSortColumn::ContainerNo),
            "qc_status" => Some(ContainerSortColumn::QcStatus),
            "created_at" => Some(ContainerSortColumn::CreatedAt),
            "qc_reviewed_at" => Some(ContainerSortColumn::QcReviewedAt),
            "tracking_code" => Some(ContainerSortColumn::TrackingCode),
            "plan_date" => Some(ContainerSortColumn::PlanDate),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ContainerSortColumn::ContainerId => "c.container_id",
            ContainerSortColumn::ContainerNo => "c.container_no",
            ContainerSortColumn::QcStatus => "c.qc_status",
            ContainerSortColumn::CreatedAt => "c.created_at",
            ContainerSortColumn::QcReviewedAt => "c.qc_reviewed_at",
            ContainerSortColumn::TrackingCode => "c.tracking_code",
            ContainerSortColumn::PlanDate => "p.plan_date",
        }
    }
}

/// 国别范围内的集装箱列表查询
#[derive(Debug, Clone)]
pub struct ContainerQuery {
    pub country: String,
    pub qc_status: Option<QcStatus>,
    pub search: Option<String>,
    pub supplier: Option<String>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
    pub sort_by: ContainerSortColumn,
    pub sort_desc: bool,
    pub limit: i64,
    pub offset: i64,
}

// ==========================================
// ContainerRepository - 集装箱仓储
// ==========================================
pub struct ContainerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContainerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 为计划批量创建编号 1..=count 的集装箱（事务内）
    pub fn insert_batch_tx(
        conn: &Connection,
        plan: &Plan,
        count: i64,
        supplier_id: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<Vec<Container>> {
        let now_str = fmt_datetime(&now);
        let mut stmt = conn.prepare(
            r#"INSERT INTO container (
                plan_id, container_no, qc_status, supplier_id, buyer_request_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)"#,
        )?;

        let mut containers = Vec::with_capacity(count.max(0) as usize);
        for container_no in 1..=count {
            stmt.execute(params![
                &plan.plan_id,
                container_no,
                QcStatus::Pending.as_str(),
                supplier_id,
                &plan.request_id,
                &now_str,
            ])?;
            containers.push(Container {
                container_id: conn.last_insert_rowid(),
                plan_id: plan.plan_id.clone(),
                container_no,
                qc_status: QcStatus::Pending,
                qc_reviewed_by: None,
                qc_reviewed_at: None,
                arrival: None,
                inspection: None,
                hold: None,
                tracking_code: None,
                supplier_id: Some(supplier_id.to_string()),
                buyer_request_id: plan.request_id.clone(),
                metadata: None,
                admin_metadata: None,
                created_at: now,
                updated_at: now,
            });
        }
        Ok(containers)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按ID查询
    pub fn find_by_id(&self, container_id: i64) -> RepositoryResult<Option<Container>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, container_id)
    }

    /// 按ID查询（事务内）
    pub fn find_by_id_tx(conn: &Connection, container_id: i64) -> RepositoryResult<Option<Container>> {
        let sql = format!(
            "SELECT {} FROM container c WHERE c.container_id = ?1",
            CONTAINER_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![container_id], Self::map_container)
            .optional()?)
    }

    /// 按ID查询并带出所属需求的国别信息（事务内）
    pub fn find_scoped_tx(
        conn: &Connection,
        container_id: i64,
    ) -> RepositoryResult<Option<ScopedContainer>> {
        let sql = format!(
            "SELECT {}, r.import_country, r.status FROM container c \
             JOIN capacity_request r ON r.request_id = c.buyer_request_id \
             WHERE c.container_id = ?1",
            CONTAINER_COLUMNS
        );
        let scoped = conn
            .query_row(&sql, params![container_id], |row| {
                let status: String = row.get(21)?;
                Ok(ScopedContainer {
                    container: Self::map_container(row)?,
                    import_country: row.get(20)?,
                    request_status: RequestStatus::from_str(&status),
                })
            })
            .optional()?;
        Ok(scoped)
    }

    /// 查询计划下的集装箱（按编号升序，事务内）
    pub fn list_by_plan_tx(conn: &Connection, plan_id: &str) -> RepositoryResult<Vec<Container>> {
        let sql = format!(
            "SELECT {} FROM container c WHERE c.plan_id = ?1 ORDER BY c.container_no ASC",
            CONTAINER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let containers = stmt
            .query_map(params![plan_id], Self::map_container)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(containers)
    }

    /// 国别范围内的分页列表 + 总数
    pub fn list_scoped(&self, query: &ContainerQuery) -> RepositoryResult<(Vec<ContainerSummary>, i64)> {
        let conn = self.get_conn()?;

        let mut builder = Self::scoped_builder(query);
        if let Some(status) = query.qc_status {
            builder.push_where("c.qc_status = ?", vec![sql_param(status.as_str().to_string())]);
        }

        let count_sql = builder.build_with_select(&format!("SELECT COUNT(*) {}", SCOPED_FROM), "");
        let total: i64 = conn.query_row(&count_sql, builder.params().as_slice(), |row| row.get(0))?;

        let direction = if query.sort_desc { "DESC" } else { "ASC" };
        builder
            .order_by(&format!(
                "{} {}, c.container_id {}",
                query.sort_by.column(),
                direction,
                direction
            ))
            .limit_offset(query.limit, query.offset);

        let sql = builder.build();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(builder.params().as_slice(), Self::map_summary)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }

    /// 按状态分组计数
    ///
    /// 忽略 query.qc_status，其余过滤条件（国别、搜索、供应商、日期）全部生效
    pub fn count_by_status_scoped(&self, query: &ContainerQuery) -> RepositoryResult<HashMap<QcStatus, i64>> {
        let conn = self.get_conn()?;
        let builder = Self::scoped_builder(query);
        let sql = builder.build_with_select(
            &format!("SELECT c.qc_status, COUNT(*) {}", SCOPED_FROM),
            "GROUP BY c.qc_status",
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(builder.params().as_slice(), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = HashMap::new();
        for (status, n) in rows {
            match QcStatus::from_str(&status) {
                Some(s) => {
                    counts.insert(s, n);
                }
                None => tracing::warn!(status = %status, "忽略未知的 qc_status 值"),
            }
        }
        Ok(counts)
    }

    /// 外部质检工作队列：已放行且尚无外部报告（按最近审核倒序）
    ///
    /// 只按国别过滤，不看需求状态，与提交报告的守卫一致
    pub fn list_approved_unreported(
        &self,
        country: &str,
        limit: i64,
        offset: i64,
    ) -> RepositoryResult<(Vec<ContainerSummary>, i64)> {
        let conn = self.get_conn()?;

        let mut builder = SqlQueryBuilder::new(&format!(
            "SELECT {}, p.plan_date, u.display_name, r.import_country {}",
            CONTAINER_COLUMNS, SCOPED_FROM
        ));
        Self::push_country_filter(&mut builder, country);
        builder.push_where("c.qc_status = ?", vec![sql_param(QcStatus::Approved.as_str().to_string())]);
        builder.push_where(
            "NOT EXISTS (SELECT 1 FROM external_qc_report x WHERE x.container_id = c.container_id)",
            vec![],
        );

        let count_sql = builder.build_with_select(&format!("SELECT COUNT(*) {}", SCOPED_FROM), "");
        let total: i64 = conn.query_row(&count_sql, builder.params().as_slice(), |row| row.get(0))?;

        builder
            .order_by("c.qc_reviewed_at DESC, c.container_id DESC")
            .limit_offset(limit, offset);
        let sql = builder.build();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(builder.params().as_slice(), Self::map_summary)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }

    // ==========================================
    // 质检状态迁移（条件 UPDATE，事务内）
    // ==========================================

    /// pending → arrived
    pub fn mark_arrived_tx(
        conn: &Connection,
        container_id: i64,
        arrival: &ArrivalInfo,
        reviewer: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE container
            SET qc_status = 'arrived',
                qc_arrived_at = ?2,
                qc_arrival_place = ?3,
                qc_reviewed_by = ?4,
                qc_reviewed_at = ?5,
                updated_at = ?5
            WHERE container_id = ?1 AND qc_status = 'pending'
            "#,
            params![
                container_id,
                fmt_datetime(&arrival.arrived_at),
                &arrival.place,
                reviewer,
                fmt_datetime(&now),
            ],
        )?;
        Ok(rows == 1)
    }

    /// arrived → qc_submitted（仅当检验数据为空）
    pub fn submit_inspection_tx(
        conn: &Connection,
        container_id: i64,
        info: &InspectionInfo,
        inspector: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let payload = serde_json::to_string(info)?;
        let rows = conn.execute(
            r#"
            UPDATE container
            SET qc_status = 'qc_submitted',
                qc_inspection_info = ?2,
                qc_inspected_by = ?3,
                qc_inspected_at = ?4,
                qc_reviewed_by = ?3,
                qc_reviewed_at = ?4,
                updated_at = ?4
            WHERE container_id = ?1
              AND qc_status = 'arrived'
              AND (qc_inspection_info IS NULL OR TRIM(qc_inspection_info) = '')
            "#,
            params![container_id, payload, inspector, fmt_datetime(&now)],
        )?;
        Ok(rows == 1)
    }

    /// qc_submitted → approved（要求检验数据存在）
    pub fn approve_tx(
        conn: &Connection,
        container_id: i64,
        reviewer: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE container
            SET qc_status = 'approved',
                qc_reviewed_by = ?2,
                qc_reviewed_at = ?3,
                updated_at = ?3
            WHERE container_id = ?1
              AND qc_status = 'qc_submitted'
              AND qc_inspection_info IS NOT NULL
              AND TRIM(qc_inspection_info) NOT IN ('', '{}')
            "#,
            params![container_id, reviewer, fmt_datetime(&now)],
        )?;
        Ok(rows == 1)
    }

    /// qc_submitted → held
    pub fn hold_tx(
        conn: &Connection,
        container_id: i64,
        hold: &HoldInfo,
        reviewer: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE container
            SET qc_status = 'held',
                qc_hold_reason = ?2,
                qc_hold_details = ?3,
                qc_reviewed_by = ?4,
                qc_reviewed_at = ?5,
                updated_at = ?5
            WHERE container_id = ?1
              AND qc_status = 'qc_submitted'
              AND qc_inspection_info IS NOT NULL
              AND TRIM(qc_inspection_info) NOT IN ('', '{}')
            "#,
            params![container_id, &hold.reason, &hold.details, reviewer, fmt_datetime(&now)],
        )?;
        Ok(rows == 1)
    }

    /// held → new_status（扣留处理），同时清除扣留原因
    ///
    /// clear_inspection 为 true 时清空检验数据，允许重新提交检验
    pub fn apply_resolution_tx(
        conn: &Connection,
        container_id: i64,
        new_status: QcStatus,
        clear_inspection: bool,
        reviewer: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE container
            SET qc_status = ?2,
                qc_hold_reason = NULL,
                qc_hold_details = NULL,
                qc_inspection_info = CASE WHEN ?3 THEN NULL ELSE qc_inspection_info END,
                qc_inspected_by = CASE WHEN ?3 THEN NULL ELSE qc_inspected_by END,
                qc_inspected_at = CASE WHEN ?3 THEN NULL ELSE qc_inspected_at END,
                qc_reviewed_by = ?4,
                qc_reviewed_at = ?5,
                updated_at = ?5
            WHERE container_id = ?1 AND qc_status = 'held'
            "#,
            params![
                container_id,
                new_status.as_str(),
                clear_inspection,
                reviewer,
                fmt_datetime(&now),
            ],
        )?;
        Ok(rows == 1)
    }

    /// 分配追踪码（仅当尚未分配，事务内）
    pub fn assign_tracking_code_tx(
        conn: &Connection,
        container_id: i64,
        code: &str,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "UPDATE container SET tracking_code = ?2 WHERE container_id = ?1 AND tracking_code IS NULL",
            params![container_id, code],
        )?;
        Ok(rows == 1)
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn push_country_filter(builder: &mut SqlQueryBuilder, country: &str) {
        builder.push_where(
            "LOWER(TRIM(r.import_country)) = LOWER(TRIM(?))",
            vec![sql_param(country.to_string())],
        );
    }

    /// 内部执照范围: 国别 + 需求已接受
    fn push_country_scope(builder: &mut SqlQueryBuilder, country: &str) {
        Self::push_country_filter(builder, country);
        builder.push_where("LOWER(r.status) = 'accepted'", vec![]);
    }

    /// 除状态外的公共过滤条件
    fn scoped_builder(query: &ContainerQuery) -> SqlQueryBuilder {
        let mut builder = SqlQueryBuilder::new(&format!(
            "SELECT {}, p.plan_date, u.display_name, r.import_country {}",
            CONTAINER_COLUMNS, SCOPED_FROM
        ));
        Self::push_country_scope(&mut builder, &query.country);

        if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            builder.push_where(
                r"(CAST(c.container_no AS TEXT) LIKE ? ESCAPE '\'
                   OR c.tracking_code LIKE ? ESCAPE '\'
                   OR CAST(c.container_id AS TEXT) = ?)",
                vec![
                    sql_param(pattern.clone()),
                    sql_param(pattern),
                    sql_param(term.to_string()),
                ],
            );
        }

        if let Some(supplier) = query.supplier.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            builder.push_where(
                r"u.display_name LIKE ? ESCAPE '\'",
                vec![sql_param(like_pattern(supplier))],
            );
        }

        if let Some(from) = query.created_from {
            builder.push_where("c.created_at >= ?", vec![sql_param(format!("{} 00:00:00", fmt_date(&from)))]);
        }
        if let Some(to) = query.created_to {
            // 闭区间：到 created_to 当天结束
            builder.push_where("c.created_at <= ?", vec![sql_param(format!("{} 23:59:59", fmt_date(&to)))]);
        }

        builder
    }

    pub(crate) fn map_container(row: &rusqlite::Row<'_>) -> rusqlite::Result<Container> {
        let status_raw: String = row.get(3)?;
        let qc_status = QcStatus::from_str(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("未知的 qc_status: {}", status_raw).into(),
            )
        })?;

        let arrival = match (get_opt_datetime(row, 6)?, row.get::<_, Option<String>>(7)?) {
            (Some(arrived_at), place) => Some(ArrivalInfo {
                arrived_at,
                place: place.unwrap_or_default(),
            }),
            _ => None,
        };

        let inspection = get_opt_json::<InspectionInfo>(row, 8)?.map(|info| InspectionRecord {
            info,
            inspected_by: None,
            inspected_at: None,
        });
        let inspection = match inspection {
            Some(mut record) => {
                record.inspected_by = row.get(9)?;
                record.inspected_at = get_opt_datetime(row, 10)?;
                Some(record)
            }
            None => None,
        };

        let hold = row.get::<_, Option<String>>(11)?.map(|reason| HoldInfo {
            reason,
            details: None,
        });
        let hold = match hold {
            Some(mut h) => {
                h.details = row.get(12)?;
                Some(h)
            }
            None => None,
        };

        Ok(Container {
            container_id: row.get(0)?,
            plan_id: row.get(1)?,
            container_no: row.get(2)?,
            qc_status,
            qc_reviewed_by: row.get(4)?,
            qc_reviewed_at: get_opt_datetime(row, 5)?,
            arrival,
            inspection,
            hold,
            tracking_code: row.get(13)?,
            supplier_id: row.get(14)?,
            buyer_request_id: row.get(15)?,
            metadata: get_opt_json(row, 16)?,
            admin_metadata: get_opt_json(row, 17)?,
            created_at: get_datetime(row, 18)?,
            updated_at: get_datetime(row, 19)?,
        })
    }

    pub(crate) fn map_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContainerSummary> {
        Ok(ContainerSummary {
            container: Self::map_container(row)?,
            plan_date: get_date(row, 20)?,
            supplier_name: row.get(21)?,
            import_country: row.get(22)?,
        })
    }
}
