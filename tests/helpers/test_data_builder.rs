// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDate;
use rusqlite::{params, Connection};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("非法日期")
}

// ==========================================
// CapacityRequest 构建器
// ==========================================

pub struct RequestBuilder {
    request_id: String,
    buyer_id: Option<String>,
    container_amount: i64,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    deadline_date: Option<NaiveDate>,
    import_country: String,
    status: String,
}

impl RequestBuilder {
    /// 默认: 配额 5，窗口 2025-01-01..=2025-01-31，进口国 Oman，已接受
    pub fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            buyer_id: None,
            container_amount: 5,
            start_date: Some(date(2025, 1, 1)),
            end_date: Some(date(2025, 1, 31)),
            deadline_date: None,
            import_country: "Oman".to_string(),
            status: "accepted".to_string(),
        }
    }

    pub fn buyer(mut self, buyer_id: &str) -> Self {
        self.buyer_id = Some(buyer_id.to_string());
        self
    }

    pub fn quota(mut self, amount: i64) -> Self {
        self.container_amount = amount;
        self
    }

    pub fn window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn country(mut self, import_country: &str) -> Self {
        self.import_country = import_country.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn insert(self, conn: &Connection) -> String {
        conn.execute(
            r#"INSERT INTO capacity_request (
                request_id, buyer_id, container_amount, start_date, end_date,
                deadline_date, import_country, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                &self.request_id,
                &self.buyer_id,
                self.container_amount,
                self.start_date.map(|d| d.format("%Y-%m-%d").to_string()),
                self.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
                self.deadline_date.map(|d| d.format("%Y-%m-%d").to_string()),
                &self.import_country,
                &self.status,
            ],
        )
        .expect("插入需求失败");
        self.request_id
    }
}
