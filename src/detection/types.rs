/// 检测系统数据结构定义
/// Data structures shared by detector, tracker and analytics
use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// 区域坐标系宽度 (所有ROI都基于 1280x720 定义)
pub const FRAME_WIDTH: u32 = 1280;

/// 区域坐标系高度
pub const FRAME_HEIGHT: u32 = 720;

/// COCO "person" 类别ID
pub const PERSON_CLASS_ID: u32 = 0;

// ========== 数据结构 ==========

/// 检测框 (Detection bounding box), 坐标在 1280x720 坐标系内
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl BBox {
    /// 人体检测框
    pub fn person(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id: PERSON_CLASS_ID,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// 中心点
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// 底边中点 (脚部位置)
    pub fn bottom_center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, self.y2)
    }
}

/// 跟踪后的检测结果
///
/// `track_id` 为空时不能参与基于身份的逻辑 (排队计时、越线方向)
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub track_id: Option<u32>,
}

impl Detection {
    pub fn new(bbox: BBox, track_id: Option<u32>) -> Self {
        Self { bbox, track_id }
    }

    pub fn anonymous(bbox: BBox) -> Self {
        Self {
            bbox,
            track_id: None,
        }
    }

    pub fn tracked(bbox: BBox, track_id: u32) -> Self {
        Self {
            bbox,
            track_id: Some(track_id),
        }
    }

    pub fn is_person(&self) -> bool {
        self.bbox.class_id == PERSON_CLASS_ID
    }
}
