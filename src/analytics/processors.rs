//! 区域处理器 (入口 / 餐区 / 收银台 / 厨房)
//!
//! 每个摄像头在启动时根据区域类型与 ROI 形状选定一个处理器, 之后每帧调用 `process`。

use super::engine::FrameContext;
use super::queue::QueueTracker;
use super::record::{AnalyticsRecord, TableSnapshot};
use super::table::TableBoard;
use crate::config::{AreaType, RoiSettings, TableId};
use crate::detection::types::Detection;
use crate::roles::RoleClassifier;
use crate::zones::{detections_in, Anchor, LineCounter, Polygon};
use image::RgbImage;
use std::collections::HashSet;
use tracing::warn;

/// 入口: 越线累计计数
#[derive(Debug, Clone)]
pub struct EntranceProcessor {
    line: LineCounter,
}

impl EntranceProcessor {
    pub fn new(start: [f32; 2], end: [f32; 2], anchor: Anchor) -> Self {
        Self {
            line: LineCounter::new(start, end).with_anchor(anchor),
        }
    }

    pub fn process(&mut self, detections: &[Detection]) -> AnalyticsRecord {
        self.line.trigger(detections);
        AnalyticsRecord::Entrance {
            people_in: self.line.in_count(),
            people_out: self.line.out_count(),
        }
    }

    pub fn line(&self) -> &LineCounter {
        &self.line
    }
}

#[derive(Debug, Clone)]
struct TableZone {
    id: TableId,
    polygon: Polygon,
    capacity: u32,
}

/// 餐区: 每张桌子的顾客/员工人数驱动状态机
#[derive(Debug, Clone)]
pub struct DiningProcessor {
    tables: Vec<TableZone>,
    board: TableBoard,
    anchor: Anchor,
}

impl DiningProcessor {
    pub fn new(roi: &RoiSettings, anchor: Anchor) -> Self {
        let mut seen = HashSet::new();
        let tables = roi
            .tables()
            .into_iter()
            .filter(|t| {
                // 同一餐桌每帧只推进一次状态
                let fresh = seen.insert(t.id.clone());
                if !fresh {
                    warn!(table = %t.id, "⚠️ duplicate table id, extra zone ignored");
                }
                fresh
            })
            .map(|t| {
                let polygon = match &t.points {
                    Some(points) => Polygon::new(points),
                    None => Polygon::new(&[]),
                };
                if polygon.is_degenerate() {
                    warn!(table = %t.id, "⚠️ table zone is degenerate and will never match");
                }
                TableZone {
                    id: t.id,
                    polygon,
                    capacity: t.capacity,
                }
            })
            .collect();

        Self {
            tables,
            board: TableBoard::new(),
            anchor,
        }
    }

    pub fn process(
        &mut self,
        frame: &RgbImage,
        detections: &[Detection],
        roles: &RoleClassifier,
        ctx: &FrameContext,
    ) -> AnalyticsRecord {
        let mut total_customers = 0;
        let mut snapshots = Vec::with_capacity(self.tables.len());

        for table in &self.tables {
            let (mut staff, mut customers) = (0usize, 0usize);
            for det in detections_in(&table.polygon, detections, self.anchor) {
                if roles.is_staff(frame, &det.bbox, ctx.weekday) {
                    staff += 1;
                } else {
                    customers += 1;
                }
            }

            let status = self.board.advance(&table.id, customers, staff);
            total_customers += customers;
            snapshots.push(TableSnapshot {
                id: table.id.clone(),
                status,
                people_count: customers,
                capacity: table.capacity,
            });
        }

        AnalyticsRecord::Dining {
            total_customers,
            tables: snapshots,
        }
    }

    pub fn board(&self) -> &TableBoard {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut TableBoard {
        &mut self.board
    }
}

/// 收银台: 排队人数与平均等待时间
#[derive(Debug, Clone)]
pub struct CashierProcessor {
    /// None ⇒ 区域配置非法, 恒输出全零记录
    zone: Option<Polygon>,
    queue: QueueTracker,
    anchor: Anchor,
}

impl CashierProcessor {
    pub fn new(roi: &RoiSettings, anchor: Anchor) -> Self {
        let zone = roi.points().map(|p| Polygon::new(&p));
        if zone.is_none() {
            warn!("⚠️ cashier queue zone is malformed, reporting an empty queue");
        }
        Self {
            zone,
            queue: QueueTracker::new(),
            anchor,
        }
    }

    pub fn process(&mut self, detections: &[Detection], ctx: &FrameContext) -> AnalyticsRecord {
        let Some(zone) = &self.zone else {
            return AnalyticsRecord::Cashier {
                queue_length: 0,
                wait_time_avg: 0,
            };
        };

        let visible: Vec<u32> = detections_in(zone, detections, self.anchor)
            .into_iter()
            .filter_map(|d| d.track_id)
            .collect();
        let stats = self.queue.update(&visible, ctx.now);

        AnalyticsRecord::Cashier {
            queue_length: stats.queue_length,
            wait_time_avg: stats.wait_time_avg,
        }
    }

    pub fn queue(&self) -> &QueueTracker {
        &self.queue
    }
}

/// 厨房: 区域内按制服颜色识别的在岗员工
#[derive(Debug, Clone)]
pub struct KitchenProcessor {
    zone: Option<Polygon>,
    total_staff: u32,
    anchor: Anchor,
}

impl KitchenProcessor {
    pub fn new(roi: &RoiSettings, anchor: Anchor) -> Self {
        let zone = roi.points().map(|p| Polygon::new(&p));
        if zone.is_none() {
            warn!("⚠️ kitchen zone is malformed, reporting zero active staff");
        }
        Self {
            zone,
            total_staff: roi.total_staff(),
            anchor,
        }
    }

    pub fn process(
        &self,
        frame: &RgbImage,
        detections: &[Detection],
        roles: &RoleClassifier,
        ctx: &FrameContext,
    ) -> AnalyticsRecord {
        let staff_active_count = match &self.zone {
            Some(zone) => detections_in(zone, detections, self.anchor)
                .into_iter()
                .filter(|d| roles.is_staff(frame, &d.bbox, ctx.weekday))
                .count(),
            None => 0,
        };

        AnalyticsRecord::Kitchen {
            staff_active_count,
            staff_total_scheduled: self.total_staff,
        }
    }
}

/// 摄像头处理器, 启动时选定, 不按帧切换
#[derive(Debug, Clone)]
pub enum AreaProcessor {
    Entrance(EntranceProcessor),
    Dining(DiningProcessor),
    Cashier(CashierProcessor),
    Kitchen(KitchenProcessor),
    /// 未知区域类型或 ROI 形状不符, 每帧输出空记录
    Unsupported,
}

impl AreaProcessor {
    pub fn from_config(area: &AreaType, roi: &RoiSettings, anchor: Anchor) -> Self {
        match area {
            AreaType::Entrance => match roi.line() {
                Some((start, end)) => AreaProcessor::Entrance(EntranceProcessor::new(start, end, anchor)),
                None => {
                    warn!("⚠️ entrance camera has no LINE zone, analytics will be empty");
                    AreaProcessor::Unsupported
                }
            },
            AreaType::Dining => AreaProcessor::Dining(DiningProcessor::new(roi, anchor)),
            AreaType::Cashier => AreaProcessor::Cashier(CashierProcessor::new(roi, anchor)),
            AreaType::Kitchen => AreaProcessor::Kitchen(KitchenProcessor::new(roi, anchor)),
            AreaType::Unknown(raw) => {
                warn!(area = %raw, "⚠️ unsupported area type, analytics will be empty");
                AreaProcessor::Unsupported
            }
        }
    }

    pub fn process(
        &mut self,
        frame: &RgbImage,
        detections: &[Detection],
        roles: &RoleClassifier,
        ctx: &FrameContext,
    ) -> AnalyticsRecord {
        match self {
            AreaProcessor::Entrance(p) => p.process(detections),
            AreaProcessor::Dining(p) => p.process(frame, detections, roles, ctx),
            AreaProcessor::Cashier(p) => p.process(detections, ctx),
            AreaProcessor::Kitchen(p) => p.process(frame, detections, roles, ctx),
            AreaProcessor::Unsupported => AnalyticsRecord::empty(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AreaProcessor::Entrance(_) => "entrance",
            AreaProcessor::Dining(_) => "dining",
            AreaProcessor::Cashier(_) => "cashier",
            AreaProcessor::Kitchen(_) => "kitchen",
            AreaProcessor::Unsupported => "unsupported",
        }
    }
}
