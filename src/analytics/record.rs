//! 分析记录 (上报 `analytics_data` 字段)

use super::table::TableStatus;
use crate::config::TableId;
use serde::Serialize;

/// 单张餐桌的快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub id: TableId,
    pub status: TableStatus,
    pub people_count: usize,
    pub capacity: u32,
}

/// 序列化为 `{}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Empty {}

/// 按区域类型区分的单帧分析结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalyticsRecord {
    Entrance {
        people_in: u64,
        people_out: u64,
    },
    Dining {
        total_customers: usize,
        tables: Vec<TableSnapshot>,
    },
    Cashier {
        queue_length: usize,
        wait_time_avg: u64,
    },
    Kitchen {
        staff_active_count: usize,
        staff_total_scheduled: u32,
    },
    Empty(Empty),
}

impl AnalyticsRecord {
    pub fn empty() -> Self {
        AnalyticsRecord::Empty(Empty {})
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AnalyticsRecord::Empty(_))
    }
}

/// `POST logs/` 请求体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsPayload {
    pub camera: u64,
    pub analytics_data: AnalyticsRecord,
}

impl AnalyticsPayload {
    pub fn new(camera: u64, analytics_data: AnalyticsRecord) -> Self {
        Self {
            camera,
            analytics_data,
        }
    }
}
