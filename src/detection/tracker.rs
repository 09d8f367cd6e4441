//! 多目标跟踪公共组件
//! Common components for multi-object tracking

use super::types::{BBox, Detection};

// ========== 卡尔曼滤波器 ==========

/// 简化卡尔曼滤波器 (单个边界框的位置和尺寸平滑)
/// 状态向量: [x_center, y_center, width, height, vx, vy, vw, vh]
#[derive(Clone, Debug)]
pub struct KalmanBoxFilter {
    state: [f32; 8],

    /// 估计误差协方差 (简化为对角阵)
    p: [f32; 8],

    /// 过程噪声
    q: f32,

    /// 观测噪声
    r: f32,

    /// 速度衰减因子 (0.9-0.99)
    velocity_decay: f32,

    /// 静止阈值 (像素/帧)
    stationary_threshold: f32,

    stationary_count: u32,
}

impl KalmanBoxFilter {
    /// # 参数
    /// - `q`: 过程噪声 (0.1-1.0, 越小越平滑)
    /// - `r`: 观测噪声 (0.5-50.0, 越大越平滑)
    pub fn new(bbox: &BBox, q: f32, r: f32, velocity_decay: f32, stationary_threshold: f32) -> Self {
        let (cx, cy) = bbox.center();
        Self {
            state: [cx, cy, bbox.width(), bbox.height(), 0.0, 0.0, 0.0, 0.0],
            p: [10.0; 8],
            q,
            r,
            velocity_decay,
            stationary_threshold,
            stationary_count: 0,
        }
    }

    /// 预测下一帧状态 (匀速运动模型 + 速度衰减)
    pub fn predict(&mut self) {
        let speed = self.state[4].hypot(self.state[5]);
        let is_stationary = speed < self.stationary_threshold;

        let (pos_decay, size_decay) = if is_stationary {
            self.stationary_count += 1;
            // 连续静止3帧后大幅衰减速度
            let d = if self.stationary_count > 3 {
                0.7
            } else {
                self.velocity_decay
            };
            (d, d)
        } else {
            self.stationary_count = 0;
            (self.velocity_decay, 0.98)
        };
        self.state[4] *= pos_decay;
        self.state[5] *= pos_decay;
        self.state[6] *= size_decay;
        self.state[7] *= size_decay;

        for i in 0..4 {
            self.state[i] += self.state[i + 4];
        }

        let q_factor = if is_stationary { 0.5 } else { 1.0 };
        for p in self.p.iter_mut() {
            *p += self.q * q_factor;
        }
    }

    /// 融合观测值 (残差自适应观测噪声)
    pub fn update(&mut self, bbox: &BBox) {
        let (cx, cy) = bbox.center();
        let y = [
            cx - self.state[0],
            cy - self.state[1],
            bbox.width() - self.state[2],
            bbox.height() - self.state[3],
        ];

        let residual = y[0].hypot(y[1]);
        let adaptive_r = if residual < self.stationary_threshold {
            self.r * 0.3
        } else if residual < 10.0 {
            self.r
        } else {
            // 大幅跳变: 更信任预测值
            self.r * 3.0
        };
        let velocity_gain = if residual < self.stationary_threshold {
            0.3
        } else {
            1.0
        };

        for i in 0..4 {
            let k_pos = self.p[i] / (self.p[i] + adaptive_r);
            let k_vel = self.p[i + 4] / (self.p[i + 4] + adaptive_r * 10.0);
            self.state[i] += k_pos * y[i];
            self.state[i + 4] += k_vel * y[i] * velocity_gain;
            self.p[i] *= 1.0 - k_pos;
            self.p[i + 4] *= 1.0 - k_vel;
        }

        if residual >= self.stationary_threshold {
            self.stationary_count = 0;
        }
    }

    /// 当前状态的边界框
    pub fn state_bbox(&self) -> BBox {
        Self::to_bbox(self.state[0], self.state[1], self.state[2], self.state[3])
    }

    /// 预测的边界框 (用于匹配)
    pub fn predicted_bbox(&self) -> BBox {
        Self::to_bbox(
            self.state[0] + self.state[4],
            self.state[1] + self.state[5],
            self.state[2] + self.state[6],
            self.state[3] + self.state[7],
        )
    }

    fn to_bbox(cx: f32, cy: f32, w: f32, h: f32) -> BBox {
        let w = w.max(1.0);
        let h = h.max(1.0);
        BBox::person(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0, 1.0)
    }
}

// ========== 跟踪器统一接口 ==========

/// 多目标跟踪器 Trait
///
/// 输入当前帧检测框, 输出带稳定 `track_id` 的检测结果。
/// 跟踪丢失时可能丢弃或重新分配ID。
pub trait Tracker {
    /// 更新跟踪器, 返回本帧匹配上的检测 (未确认的检测 `track_id` 为空)
    fn update(&mut self, detections: &[BBox]) -> Vec<Detection>;

    /// 清除所有跟踪
    fn reset(&mut self);

    /// 当前活跃跟踪数量
    fn track_count(&self) -> usize;
}

// ========== 工具函数 ==========

/// 两个边界框的IOU (Intersection over Union)
pub fn compute_iou(a: &BBox, b: &BBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = a.width() * a.height() + b.width() * b.height() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = BBox::person(0.0, 0.0, 10.0, 10.0, 0.9);
        let b = BBox::person(20.0, 20.0, 30.0, 30.0, 0.9);
        assert!((compute_iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(compute_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_kalman_converges_on_static_box() {
        let bbox = BBox::person(100.0, 100.0, 150.0, 250.0, 0.9);
        let mut kf = KalmanBoxFilter::new(&bbox, 0.1, 0.5, 0.95, 2.0);
        for _ in 0..20 {
            kf.predict();
            kf.update(&bbox);
        }
        let s = kf.state_bbox();
        assert!((s.x1 - bbox.x1).abs() < 1.0);
        assert!((s.y2 - bbox.y2).abs() < 1.0);
    }
}
