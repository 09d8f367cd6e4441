/// 区域分类 (Zone Classifier)
///
/// 所有几何都定义在 1280x720 坐标系中:
/// - Polygon: 多边形包含测试 (餐桌、排队区、厨房)
/// - LineCounter: 越线计数 (入口)
pub mod line;
pub mod polygon;

pub use line::{Crossing, LineCounter, DEFAULT_HYSTERESIS_PX};
pub use polygon::{Anchor, Polygon};

use crate::detection::types::Detection;

/// 筛选参考点落在多边形内的检测
pub fn detections_in<'a>(
    polygon: &Polygon,
    detections: &'a [Detection],
    anchor: Anchor,
) -> Vec<&'a Detection> {
    detections
        .iter()
        .filter(|d| polygon.contains(&d.bbox, anchor))
        .collect()
}
