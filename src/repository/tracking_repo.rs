// ==========================================
// 出口集装箱质检追踪系统 - 追踪台账仓储
// ==========================================
// 键: (container_id, tracking_code)，NULL 追踪码自成一键（IS 比较）
// ==========================================

use crate::domain::tracking::{TrackingLookup, TrackingStatus, TrackingWriteKind, TrackingWriteOutcome};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_support::{fmt_datetime, get_date, get_datetime};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const TRACKING_COLUMNS: &str = r#"
    t.tracking_id, t.container_id, t.tracking_code, t.status, t.note,
    t.created_by, t.created_at, t.updated_at
"#;

/// 追踪事件写入参数
#[derive(Debug, Clone)]
pub struct TrackingEventWrite<'a> {
    pub container_id: i64,
    pub tracking_code: Option<&'a str>,
    pub status: &'a str,
    pub note: Option<&'a str>,
    pub actor_id: &'a str,
    pub now: NaiveDateTime,
}

pub struct TrackingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TrackingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 按 (container_id, tracking_code) upsert（事务内）
    ///
    /// 已存在则原地更新 status/note/updated_at，否则新增
    pub fn upsert_tx(conn: &Connection, event: &TrackingEventWrite<'_>) -> RepositoryResult<TrackingWriteOutcome> {
        let now_str = fmt_datetime(&event.now);
        let existing: Option<i64> = conn
            .query_row(
                r#"
                SELECT tracking_id FROM container_tracking_status
                WHERE container_id = ?1 AND tracking_code IS ?2
                ORDER BY tracking_id DESC
                LIMIT 1
                "#,
                params![event.container_id, event.tracking_code],
                |row| row.get(0),
            )
            .optional()?;

        let (kind, tracking_id) = match existing {
            Some(id) => {
                conn.execute(
                    r#"
                    UPDATE container_tracking_status
                    SET status = ?2, note = ?3, updated_at = ?4
                    WHERE tracking_id = ?1
                    "#,
                    params![id, event.status, event.note, &now_str],
                )?;
                (TrackingWriteKind::Updated, id)
            }
            None => {
                conn.execute(
                    r#"
                    INSERT INTO container_tracking_status (
                        container_id, tracking_code, status, note, created_by, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                    "#,
                    params![
                        event.container_id,
                        event.tracking_code,
                        event.status,
                        event.note,
                        event.actor_id,
                        &now_str,
                    ],
                )?;
                (TrackingWriteKind::Created, conn.last_insert_rowid())
            }
        };

        let record = Self::find_by_id_tx(conn, tracking_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "ContainerTrackingStatus".to_string(),
            id: tracking_id.to_string(),
        })?;
        Ok(TrackingWriteOutcome { kind, record })
    }

    // ==========================================
    // 查询
    // ==========================================

    fn find_by_id_tx(conn: &Connection, tracking_id: i64) -> RepositoryResult<Option<TrackingStatus>> {
        let sql = format!(
            "SELECT {} FROM container_tracking_status t WHERE t.tracking_id = ?1",
            TRACKING_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![tracking_id], |row| Self::map_row(row, 0))
            .optional()?)
    }

    /// 每个集装箱最新的一条追踪事件（按 container_id 升序）
    pub fn latest_per_container(&self) -> RepositoryResult<Vec<TrackingStatus>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {cols} FROM (
                SELECT t.*, ROW_NUMBER() OVER (
                    PARTITION BY t.container_id
                    ORDER BY t.updated_at DESC, t.tracking_id DESC
                ) AS rn
                FROM container_tracking_status t
            ) t
            WHERE t.rn = 1
            ORDER BY t.container_id ASC
            "#,
            cols = TRACKING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| Self::map_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 单个集装箱的追踪事件（按更新时间倒序）
    pub fn history(&self, container_id: i64) -> RepositoryResult<Vec<TrackingStatus>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM container_tracking_status t WHERE t.container_id = ?1 \
             ORDER BY t.updated_at DESC, t.tracking_id DESC",
            TRACKING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![container_id], |row| Self::map_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 按追踪码查询（不区分大小写）
    ///
    /// 同时匹配集装箱上的追踪码与追踪事件上的追踪码，并带出计划/需求/供应商信息
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<TrackingLookup>> {
        let conn = self.get_conn()?;
        let lookup = conn
            .query_row(
                r#"
                SELECT c.container_id, c.container_no, c.tracking_code, c.qc_status,
                       p.plan_id, p.plan_date, r.request_id, c.supplier_id,
                       u.display_name, r.import_country
                FROM container c
                JOIN production_plan p ON p.plan_id = c.plan_id
                JOIN capacity_request r ON r.request_id = p.request_id
                LEFT JOIN app_user u ON u.user_id = c.supplier_id
                WHERE c.tracking_code = ?1 COLLATE NOCASE
                   OR EXISTS (
                        SELECT 1 FROM container_tracking_status t
                        WHERE t.container_id = c.container_id
                          AND t.tracking_code = ?1 COLLATE NOCASE
                   )
                ORDER BY c.updated_at DESC, c.container_id DESC
                LIMIT 1
                "#,
                params![code.trim()],
                |row| {
                    Ok(TrackingLookup {
                        container_id: row.get(0)?,
                        container_no: row.get(1)?,
                        tracking_code: row.get(2)?,
                        qc_status: row.get(3)?,
                        plan_id: row.get(4)?,
                        plan_date: get_date(row, 5)?,
                        request_id: row.get(6)?,
                        supplier_id: row.get(7)?,
                        supplier_name: row.get(8)?,
                        import_country: row.get(9)?,
                        latest: None,
                    })
                },
            )
            .optional()?;

        let Some(mut lookup) = lookup else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM container_tracking_status t WHERE t.container_id = ?1 \
             ORDER BY t.updated_at DESC, t.tracking_id DESC LIMIT 1",
            TRACKING_COLUMNS
        );
        lookup.latest = conn
            .query_row(&sql, params![lookup.container_id], |row| Self::map_row(row, 0))
            .optional()?;
        Ok(Some(lookup))
    }

    fn map_row(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<TrackingStatus> {
        Ok(TrackingStatus {
            tracking_id: row.get(base)?,
            container_id: row.get(base + 1)?,
            tracking_code: row.get(base + 2)?,
            status: row.get(base + 3)?,
            note: row.get(base + 4)?,
            created_by: row.get(base + 5)?,
            created_at: get_datetime(row, base + 6)?,
            updated_at: get_datetime(row, base + 7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO app_user (user_id, display_name, role) VALUES ('S1', 'Green Farm', 'supplier');
            INSERT INTO capacity_request (request_id, container_amount, import_country, status)
            VALUES ('R1', 3, 'Qatar', 'accepted');
            INSERT INTO production_plan (plan_id, request_id, plan_date, created_by, created_at, updated_at)
            VALUES ('P1', 'R1', '2025-01-10', 'S1', '2025-01-01 08:00:00', '2025-01-01 08:00:00');
            INSERT INTO container (container_id, plan_id, container_no, supplier_id, buyer_request_id,
                                   tracking_code, created_at, updated_at)
            VALUES (1, 'P1', 1, 'S1', 'R1', 'CTR-ABCDEF0123', '2025-01-01 08:00:00', '2025-01-01 08:00:00'),
                   (2, 'P1', 2, 'S1', 'R1', NULL, '2025-01-01 08:00:00', '2025-01-01 08:00:00');
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn event<'a>(container_id: i64, code: Option<&'a str>, status: &'a str, minute: u32) -> TrackingEventWrite<'a> {
        TrackingEventWrite {
            container_id,
            tracking_code: code,
            status,
            note: None,
            actor_id: "ADMIN",
            now: chrono::NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(10, minute, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_upsert_updates_same_key() {
        let conn = setup();
        let guard = conn.lock().unwrap();

        let first = TrackingRepository::upsert_tx(&guard, &event(1, Some("CTR-ABCDEF0123"), "loading", 0)).unwrap();
        let second = TrackingRepository::upsert_tx(&guard, &event(1, Some("CTR-ABCDEF0123"), "shipped", 5)).unwrap();

        assert_eq!(first.kind, TrackingWriteKind::Created);
        assert_eq!(second.kind, TrackingWriteKind::Updated);
        assert_eq!(first.record.tracking_id, second.record.tracking_id);
        assert_eq!(second.record.status, "shipped");

        let n: i64 = guard
            .query_row("SELECT COUNT(*) FROM container_tracking_status", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_null_code_is_distinct_key() {
        let conn = setup();
        {
            let guard = conn.lock().unwrap();
            TrackingRepository::upsert_tx(&guard, &event(1, None, "loading", 0)).unwrap();
            TrackingRepository::upsert_tx(&guard, &event(1, Some("CTR-ABCDEF0123"), "shipped", 1)).unwrap();
            let again = TrackingRepository::upsert_tx(&guard, &event(1, None, "sealed", 2)).unwrap();
            assert_eq!(again.kind, TrackingWriteKind::Updated);
        }

        let repo = TrackingRepository::new(conn);
        let history = repo.history(1).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, "sealed");
    }

    #[test]
    fn test_latest_per_container_and_lookup() {
        let conn = setup();
        {
            let guard = conn.lock().unwrap();
            TrackingRepository::upsert_tx(&guard, &event(1, None, "loading", 0)).unwrap();
            TrackingRepository::upsert_tx(&guard, &event(1, Some("CTR-ABCDEF0123"), "shipped", 9)).unwrap();
            TrackingRepository::upsert_tx(&guard, &event(2, None, "loading", 3)).unwrap();
        }

        let repo = TrackingRepository::new(conn);
        let latest = repo.latest_per_container().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].container_id, 1);
        assert_eq!(latest[0].status, "shipped");

        let lookup = repo.find_by_code("ctr-abcdef0123").unwrap().unwrap();
        assert_eq!(lookup.container_id, 1);
        assert_eq!(lookup.supplier_name.as_deref(), Some("Green Farm"));
        assert_eq!(lookup.import_country, "Qatar");
        assert_eq!(lookup.latest.unwrap().status, "shipped");

        assert!(repo.find_by_code("CTR-NOPE").unwrap().is_none());
    }
}
