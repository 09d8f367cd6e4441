//! 餐桌生命周期状态机
//! Table lifecycle: AVAILABLE → OCCUPIED → DIRTY → CLEANING → AVAILABLE

use crate::config::TableId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
    Dirty,
    Cleaning,
}

impl TableStatus {
    pub const ALL: [TableStatus; 4] = [
        TableStatus::Available,
        TableStatus::Occupied,
        TableStatus::Dirty,
        TableStatus::Cleaning,
    ];

    /// 单帧状态转移, 规则按优先级匹配
    pub fn next(self, has_customers: bool, has_staff: bool) -> TableStatus {
        use TableStatus::*;
        if has_customers {
            Occupied
        } else if has_staff && self == Dirty {
            Cleaning
        } else if !has_staff && self == Cleaning {
            Available
        } else if self == Occupied {
            Dirty
        } else {
            self
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableStatus::Available => "AVAILABLE",
            TableStatus::Occupied => "OCCUPIED",
            TableStatus::Dirty => "DIRTY",
            TableStatus::Cleaning => "CLEANING",
        };
        f.write_str(s)
    }
}

/// 所有餐桌的当前状态, 首次引用时惰性创建为 AVAILABLE
///
/// 仅驻留内存, 进程重启后全部回到 AVAILABLE
#[derive(Debug, Clone, Default)]
pub struct TableBoard {
    states: HashMap<TableId, TableStatus>,
}

impl TableBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, id: &TableId) -> TableStatus {
        self.states.get(id).copied().unwrap_or_default()
    }

    /// 直接写入状态 (恢复或测试注入)
    pub fn set(&mut self, id: TableId, status: TableStatus) {
        self.states.insert(id, status);
    }

    /// 按本帧人数推进一张桌子的状态, 返回新状态
    pub fn advance(&mut self, id: &TableId, customers: usize, staff: usize) -> TableStatus {
        let entry = self.states.entry(id.clone()).or_default();
        *entry = entry.next(customers > 0, staff > 0);
        *entry
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn reset(&mut self) {
        self.states.clear();
    }
}
