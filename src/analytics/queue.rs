//! 排队停留时间 (收银台)
//! Presence-keyed dwell bookkeeping

use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// 一帧的排队统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub queue_length: usize,
    /// 平均等待秒数 (向下取整), 空队列为 0
    pub wait_time_avg: u64,
}

/// 跟踪ID → 进入排队区的时刻
///
/// 每帧结束后键集合恰好等于当前在区内的跟踪ID
#[derive(Debug, Clone, Default)]
pub struct QueueTracker {
    entries: HashMap<u32, Instant>,
}

impl QueueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用本帧在区内的跟踪ID更新, 重复ID只计一次
    pub fn update(&mut self, visible: &[u32], now: Instant) -> QueueStats {
        let visible: HashSet<u32> = visible.iter().copied().collect();

        let mut total_secs = 0.0f64;
        for id in &visible {
            let entered = *self.entries.entry(*id).or_insert(now);
            total_secs += now.saturating_duration_since(entered).as_secs_f64();
        }
        self.entries.retain(|id, _| visible.contains(id));

        let queue_length = visible.len();
        let wait_time_avg = if queue_length > 0 {
            (total_secs / queue_length as f64).floor() as u64
        } else {
            0
        };
        QueueStats {
            queue_length,
            wait_time_avg,
        }
    }

    /// 某个ID当前的停留时长
    pub fn dwell(&self, id: u32, now: Instant) -> Option<f64> {
        self.entries
            .get(&id)
            .map(|t| now.saturating_duration_since(*t).as_secs_f64())
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
