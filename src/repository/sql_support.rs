// ==========================================
// 出口集装箱质检追踪系统 - SQL 构建与行映射工具
// ==========================================
// 职责: 动态过滤 SQL 构建、参数收集、日期/JSON 列解析
// 约束: 所有用户输入只走参数绑定，列名/排序只来自白名单
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{ToSql, Type};
use serde::de::DeserializeOwned;

/// 数据库时间格式
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
/// 数据库日期格式
pub const DATE_FMT: &str = "%Y-%m-%d";

pub fn fmt_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}

pub fn fmt_date(d: &NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

/// 读取必填时间列
pub fn get_datetime(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FMT)
        .map_err(|e| conversion_error(idx, format!("时间格式错误 '{}': {}", raw, e)))
}

/// 读取可空时间列
pub fn get_opt_datetime(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, DATETIME_FMT)
            .map_err(|e| conversion_error(idx, format!("时间格式错误 '{}': {}", s, e)))
    })
    .transpose()
}

/// 读取必填日期列
pub fn get_date(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FMT)
        .map_err(|e| conversion_error(idx, format!("日期格式错误 '{}': {}", raw, e)))
}

/// 读取可空日期列
pub fn get_opt_date(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FMT)
            .map_err(|e| conversion_error(idx, format!("日期格式错误 '{}': {}", s, e)))
    })
    .transpose()
}

/// 读取可空 JSON 列
pub fn get_opt_json<T: DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) if !s.trim().is_empty() => serde_json::from_str(&s)
            .map(Some)
            .map_err(|e| conversion_error(idx, format!("JSON 解析失败: {}", e))),
        _ => Ok(None),
    }
}

/// 读取 JSON 数组列，缺失或解析失败时返回空数组
pub fn get_json_array<T: DeserializeOwned>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Vec<T>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default())
}

/// 装箱绑定参数
pub fn sql_param<T: ToSql + 'static>(value: T) -> Box<dyn ToSql> {
    Box::new(value)
}

/// 转义 LIKE 通配符，配合 `ESCAPE '\'` 使用
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// SQL 查询构建器（流式 API）
///
/// 条件与参数成对登记，保证占位符顺序与参数顺序一致
///
/// # 示例
/// ```
/// use container_qc::repository::sql_support::{sql_param, SqlQueryBuilder};
///
/// let mut builder = SqlQueryBuilder::new("SELECT * FROM container c");
/// builder.push_where("c.qc_status = ?", vec![sql_param("approved".to_string())]);
/// builder.push_where_if(None);
/// let sql = builder.order_by("c.container_id DESC").limit_offset(20, 40).build();
/// assert_eq!(
///     sql,
///     "SELECT * FROM container c WHERE c.qc_status = ? ORDER BY c.container_id DESC LIMIT 20 OFFSET 40"
/// );
/// ```
pub struct SqlQueryBuilder {
    select_clause: String,
    where_clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
    order_by_clause: Option<String>,
    limit_clause: Option<(i64, i64)>,
}

impl SqlQueryBuilder {
    /// 创建新的 SQL 查询构建器
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_clause: None,
            limit_clause: None,
        }
    }

    /// 添加 WHERE 条件及其参数
    pub fn push_where(&mut self, condition: &str, params: Vec<Box<dyn ToSql>>) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.params.extend(params);
        self
    }

    /// 条件添加 WHERE 子句
    pub fn push_where_if(&mut self, clause: Option<(&str, Vec<Box<dyn ToSql>>)>) -> &mut Self {
        if let Some((condition, params)) = clause {
            self.push_where(condition, params);
        }
        self
    }

    /// 添加 ORDER BY 子句（调用方保证来自白名单）
    pub fn order_by(&mut self, order: &str) -> &mut Self {
        self.order_by_clause = Some(order.to_string());
        self
    }

    /// 添加 LIMIT/OFFSET 子句
    pub fn limit_offset(&mut self, limit: i64, offset: i64) -> &mut Self {
        self.limit_clause = Some((limit, offset));
        self
    }

    /// 只含 WHERE 的 SQL（用于 COUNT/GROUP BY 复用同一组过滤条件）
    pub fn build_with_select(&self, select: &str, suffix: &str) -> String {
        let mut sql = select.to_string();
        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }
        if !suffix.is_empty() {
            sql.push(' ');
            sql.push_str(suffix);
        }
        sql
    }

    /// 构建最终的 SQL 语句
    pub fn build(&self) -> String {
        let mut sql = self.build_with_select(&self.select_clause, "");

        if let Some(order) = &self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        if let Some((limit, offset)) = self.limit_clause {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        sql
    }

    /// 绑定参数视图
    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("abc"), "%abc%");
    }

    #[test]
    fn test_builder_params_follow_conditions() {
        let mut builder = SqlQueryBuilder::new("SELECT c.container_id FROM container c");
        builder
            .push_where("c.buyer_request_id = ?", vec![sql_param("R1".to_string())])
            .push_where_if(Some(("c.qc_status = ?", vec![sql_param("held".to_string())])))
            .push_where_if(None);

        assert_eq!(
            builder.build(),
            "SELECT c.container_id FROM container c WHERE c.buyer_request_id = ? AND c.qc_status = ?"
        );
        assert_eq!(builder.params().len(), 2);

        let count_sql = builder.build_with_select("SELECT COUNT(*) FROM container c", "");
        assert!(count_sql.ends_with("c.qc_status = ?"));
    }

    #[test]
    fn test_builder_without_conditions() {
        let mut builder = SqlQueryBuilder::new("SELECT 1");
        builder.order_by("1").limit_offset(10, 0);
        assert_eq!(builder.build(), "SELECT 1 ORDER BY 1 LIMIT 10 OFFSET 0");
    }
}
