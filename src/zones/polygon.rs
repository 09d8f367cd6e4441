//! 多边形区域 (餐桌 / 排队区 / 厨房)
//! Polygon zone membership

use crate::detection::types::BBox;
use serde::{Deserialize, Serialize};

/// 边界容差 (像素), 落在边上的点视为区域内
const EDGE_EPSILON: f64 = 1e-3;

/// 检测框参考点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// 框中心
    Center,
    /// 底边中点 (脚部落地位置)
    #[default]
    BottomCenter,
}

impl Anchor {
    pub fn point(&self, bbox: &BBox) -> (f32, f32) {
        match self {
            Anchor::Center => bbox.center(),
            Anchor::BottomCenter => bbox.bottom_center(),
        }
    }
}

/// 多边形区域
///
/// 少于3个顶点或面积为0的多边形是退化的, 不匹配任何点
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    points: Vec<(f64, f64)>,
    degenerate: bool,
}

impl Polygon {
    pub fn new(points: &[[f32; 2]]) -> Self {
        let points: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (p[0] as f64, p[1] as f64))
            .collect();
        let degenerate = points.len() < 3 || signed_area(&points).abs() < f64::EPSILON;
        Self { points, degenerate }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    /// 点是否在多边形内 (边界上视为在内)
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        if self.degenerate {
            return false;
        }
        let (x, y) = (x as f64, y as f64);
        let n = self.points.len();

        if (0..n).any(|i| on_segment(self.points[i], self.points[(i + 1) % n], (x, y))) {
            return true;
        }

        // 射线法 (even-odd)
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.points[i];
            let (xj, yj) = self.points[j];
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    pub fn contains(&self, bbox: &BBox, anchor: Anchor) -> bool {
        let (x, y) = anchor.point(bbox);
        self.contains_point(x, y)
    }
}

/// 鞋带公式
fn signed_area(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum::<f64>()
        / 2.0
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    let len = (b.0 - a.0).hypot(b.1 - a.1);
    if cross.abs() > EDGE_EPSILON * len.max(1.0) {
        return false;
    }
    p.0 >= a.0.min(b.0) - EDGE_EPSILON
        && p.0 <= a.0.max(b.0) + EDGE_EPSILON
        && p.1 >= a.1.min(b.1) - EDGE_EPSILON
        && p.1 <= a.1.max(b.1) + EDGE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(&[[100.0, 100.0], [300.0, 100.0], [300.0, 300.0], [100.0, 300.0]])
    }

    #[test]
    fn test_inside_and_outside() {
        let poly = square();
        assert!(poly.contains_point(200.0, 200.0));
        assert!(!poly.contains_point(50.0, 200.0));
        assert!(!poly.contains_point(200.0, 301.0));
    }

    #[test]
    fn test_edge_and_vertex_points_are_inside_consistently() {
        let poly = square();
        for _ in 0..5 {
            assert!(poly.contains_point(300.0, 200.0));
            assert!(poly.contains_point(200.0, 100.0));
            assert!(poly.contains_point(100.0, 300.0));
        }
    }

    #[test]
    fn test_degenerate_polygons_match_nothing() {
        let two = Polygon::new(&[[0.0, 0.0], [100.0, 100.0]]);
        assert!(two.is_degenerate());
        assert!(!two.contains_point(50.0, 50.0));
        assert!(!two.contains_point(0.0, 0.0));

        let collinear = Polygon::new(&[[0.0, 0.0], [50.0, 50.0], [100.0, 100.0]]);
        assert!(collinear.is_degenerate());
        assert!(!collinear.contains_point(50.0, 50.0));

        assert!(Polygon::new(&[]).is_degenerate());
        assert_eq!(collinear.vertex_count(), 3);
        assert_eq!(square().vertex_count(), 4);
    }

    #[test]
    fn test_anchor_selects_reference_point() {
        let poly = square();
        // 中心在区域内, 脚部在区域外
        let bbox = BBox::person(150.0, 150.0, 250.0, 350.0, 0.9);
        assert!(poly.contains(&bbox, Anchor::Center));
        assert!(!poly.contains(&bbox, Anchor::BottomCenter));
    }

    #[test]
    fn test_concave_polygon() {
        // L 形
        let poly = Polygon::new(&[
            [0.0, 0.0],
            [200.0, 0.0],
            [200.0, 100.0],
            [100.0, 100.0],
            [100.0, 200.0],
            [0.0, 200.0],
        ]);
        assert!(poly.contains_point(50.0, 150.0));
        assert!(!poly.contains_point(150.0, 150.0));
    }
}
