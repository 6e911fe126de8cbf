// ==========================================
// 出口集装箱质检追踪系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式，按键排序）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 追踪码 =====

    /// 追踪码前缀
    pub fn tracking_code_prefix(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::TRACKING_CODE_PREFIX, "CTR-")?;
        Ok(value.trim().to_string())
    }

    // ===== 分页 =====

    /// 默认每页条数（默认 20）
    pub fn default_page_size(&self) -> ConfigResult<i64> {
        let value = self.get_config_or_default(config_keys::DEFAULT_PAGE_SIZE, "20")?;
        Ok(parse_positive(config_keys::DEFAULT_PAGE_SIZE, &value, 20))
    }

    /// 每页条数上限（默认 100）
    pub fn max_page_size(&self) -> ConfigResult<i64> {
        let value = self.get_config_or_default(config_keys::MAX_PAGE_SIZE, "100")?;
        Ok(parse_positive(config_keys::MAX_PAGE_SIZE, &value, 100))
    }

    // ===== 计划替换 =====

    /// 集装箱进入质检后是否禁止替换计划（默认 true）
    pub fn block_plan_replacement_after_qc(&self) -> ConfigResult<bool> {
        let value =
            self.get_config_or_default(config_keys::BLOCK_PLAN_REPLACEMENT_AFTER_QC, "true")?;
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "false" | "0" | "no" | "off" => false,
            "true" | "1" | "yes" | "on" => true,
            other => {
                tracing::warn!(
                    config_key = config_keys::BLOCK_PLAN_REPLACEMENT_AFTER_QC,
                    raw_value = %other,
                    "配置值无法解析，使用默认值 true"
                );
                true
            }
        })
    }
}

fn parse_positive(key: &str, raw: &str, default: i64) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(v) if v > 0 => v,
        _ => {
            tracing::warn!(config_key = key, raw_value = %raw, default, "配置值无效，使用默认值");
            default
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const TRACKING_CODE_PREFIX: &str = "tracking_code_prefix";
    pub const DEFAULT_PAGE_SIZE: &str = "default_page_size";
    pub const MAX_PAGE_SIZE: &str = "max_page_size";
    pub const BLOCK_PLAN_REPLACEMENT_AFTER_QC: &str = "block_plan_replacement_after_qc";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults() {
        let config = manager();
        assert_eq!(config.tracking_code_prefix().unwrap(), "CTR-");
        assert_eq!(config.default_page_size().unwrap(), 20);
        assert_eq!(config.max_page_size().unwrap(), 100);
        assert!(config.block_plan_replacement_after_qc().unwrap());
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = manager();
        config.set_config_value(config_keys::TRACKING_CODE_PREFIX, "QC-").unwrap();
        config.set_config_value(config_keys::BLOCK_PLAN_REPLACEMENT_AFTER_QC, "off").unwrap();
        config.set_config_value(config_keys::MAX_PAGE_SIZE, "-5").unwrap();

        assert_eq!(config.tracking_code_prefix().unwrap(), "QC-");
        assert!(!config.block_plan_replacement_after_qc().unwrap());
        assert_eq!(config.max_page_size().unwrap(), 100);
    }

    #[test]
    fn test_snapshot_is_sorted_json() {
        let config = manager();
        config.set_config_value("b_key", "2").unwrap();
        config.set_config_value("a_key", "1").unwrap();
        config.set_config_value("a_key", "3").unwrap();

        let snapshot: serde_json::Value =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot["a_key"], "3");
        assert_eq!(snapshot["b_key"], "2");
    }
}
