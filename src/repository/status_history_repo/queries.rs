use super::StatusHistoryRepository;
use crate::domain::status_history::StatusHistoryEntry;
use crate::domain::types::QcStatus;
use crate::repository::error::RepositoryResult;
use crate::repository::sql_support::{get_datetime, get_opt_json};
use rusqlite::params;
use rusqlite::types::Type;

impl StatusHistoryRepository {
    /// 查询集装箱的状态轨迹（按时间升序）
    pub fn list_by_container(&self, container_id: i64) -> RepositoryResult<Vec<StatusHistoryEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT history_id, container_id, from_status, to_status, actor, payload_json, action_ts
            FROM container_status_history
            WHERE container_id = ?1
            ORDER BY action_ts ASC, rowid ASC
            "#,
        )?;

        let entries = stmt
            .query_map(params![container_id], |row| {
                Ok(StatusHistoryEntry {
                    history_id: row.get(0)?,
                    container_id: row.get(1)?,
                    from_status: parse_status(row, 2)?,
                    to_status: parse_status(row, 3)?,
                    actor: row.get(4)?,
                    payload_json: get_opt_json(row, 5)?,
                    action_ts: get_datetime(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

fn parse_status(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<QcStatus> {
    let raw: String = row.get(idx)?;
    QcStatus::from_str(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("未知的 qc_status: {}", raw).into())
    })
}
