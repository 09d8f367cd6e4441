//! 越线计数器 (入口摄像头)
//! Line-crossing counter for entrance cameras
//!
//! 方向约定: 有向线段 start → end, 图像坐标系 (y 向下) 中叉积为正的一侧是"内侧"。
//! 例如从左到右画的水平线, 从上往下穿过记为 in。
//!
//! 防抖: 距离线段不超过 `hysteresis` 像素的点不改变该轨迹已记录的一侧,
//! 只有到达另一侧带外才算一次越线, 所以压线抖动不会重复计数。

use super::polygon::Anchor;
use crate::detection::types::Detection;
use std::collections::{HashMap, HashSet};

/// 默认防抖带宽 (像素)
pub const DEFAULT_HYSTERESIS_PX: f32 = 4.0;

/// 越线方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Outside,
    Inside,
}

/// 累计越线计数 (单调递增)
#[derive(Debug, Clone)]
pub struct LineCounter {
    start: (f32, f32),
    end: (f32, f32),
    hysteresis: f32,
    anchor: Anchor,
    in_count: u64,
    out_count: u64,
    /// 每个轨迹最近一次确认的一侧, 每帧裁剪到当前可见ID
    sides: HashMap<u32, Side>,
}

impl LineCounter {
    pub fn new(start: [f32; 2], end: [f32; 2]) -> Self {
        Self {
            start: (start[0], start[1]),
            end: (end[0], end[1]),
            hysteresis: DEFAULT_HYSTERESIS_PX,
            anchor: Anchor::BottomCenter,
            in_count: 0,
            out_count: 0,
            sides: HashMap::new(),
        }
    }

    pub fn with_hysteresis(mut self, px: f32) -> Self {
        self.hysteresis = px.max(0.0);
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn in_count(&self) -> u64 {
        self.in_count
    }

    pub fn out_count(&self) -> u64 {
        self.out_count
    }

    /// 起点终点重合的线段不计数
    pub fn is_degenerate(&self) -> bool {
        self.length() <= f32::EPSILON
    }

    fn length(&self) -> f32 {
        (self.end.0 - self.start.0).hypot(self.end.1 - self.start.1)
    }

    /// 判断点所在一侧; 线段投影范围外或在防抖带内返回 None
    fn side_of(&self, x: f32, y: f32) -> Option<Side> {
        let len = self.length();
        let (dx, dy) = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let (px, py) = (x - self.start.0, y - self.start.1);

        let t = (px * dx + py * dy) / (len * len);
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        let distance = (dx * py - dy * px) / len;
        if distance.abs() <= self.hysteresis {
            None
        } else if distance > 0.0 {
            Some(Side::Inside)
        } else {
            Some(Side::Outside)
        }
    }

    /// 处理一帧检测, 返回本帧产生的越线事件
    ///
    /// 无跟踪ID的检测被忽略
    pub fn trigger(&mut self, detections: &[Detection]) -> Vec<(u32, Crossing)> {
        let mut events = Vec::new();
        if self.is_degenerate() {
            self.sides.clear();
            return events;
        }

        let mut visible = HashSet::new();
        for det in detections {
            let Some(id) = det.track_id else {
                continue;
            };
            visible.insert(id);

            let (x, y) = self.anchor.point(&det.bbox);
            let Some(side) = self.side_of(x, y) else {
                continue;
            };

            match self.sides.insert(id, side) {
                Some(Side::Outside) if side == Side::Inside => {
                    self.in_count += 1;
                    events.push((id, Crossing::In));
                }
                Some(Side::Inside) if side == Side::Outside => {
                    self.out_count += 1;
                    events.push((id, Crossing::Out));
                }
                _ => {}
            }
        }

        self.sides.retain(|id, _| visible.contains(id));
        events
    }

    /// 清空计数与轨迹状态
    pub fn reset(&mut self) {
        self.in_count = 0;
        self.out_count = 0;
        self.sides.clear();
    }

    pub fn tracked_ids(&self) -> usize {
        self.sides.len()
    }
}
