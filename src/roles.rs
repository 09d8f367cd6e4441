//! 员工/顾客区分 (Role Classifier)
//!
//! 按星期几的制服颜色表, 在检测框躯干区域统计 HSV 命中比例。
//! HSV 采用 8 位约定: H ∈ [0, 179] (角度/2), S、V ∈ [0, 255]。

use crate::detection::types::BBox;
use chrono::Weekday;
use image::RgbImage;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// 默认命中比例阈值 (严格大于才算员工)
pub const DEFAULT_STAFF_RATIO: f64 = 0.30;

/// 躯干裁剪比例 (相对检测框自身原点)
const TORSO_Y: (f32, f32) = (0.2, 0.6);
const TORSO_X: (f32, f32) = (0.2, 0.8);

/// HSV 上下界 (闭区间)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// 制服颜色排班表: 星期名 (大写英文) → HSV 范围
///
/// 缺少当天条目 ⇒ 当天没有人被识别为员工
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "HashMap<String, Value>")]
pub struct ColorSchedule {
    days: HashMap<String, HsvRange>,
}

impl From<HashMap<String, Value>> for ColorSchedule {
    fn from(raw: HashMap<String, Value>) -> Self {
        let mut days = HashMap::new();
        for (day, entry) in raw {
            match serde_json::from_value::<HsvRange>(entry) {
                Ok(range) => {
                    days.insert(day.to_uppercase(), range);
                }
                Err(e) => warn!(day = %day, error = %e, "⚠️ ignoring malformed uniform schedule entry"),
            }
        }
        Self { days }
    }
}

impl ColorSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, day: Weekday, range: HsvRange) -> Self {
        self.days.insert(day_name(day).to_string(), range);
        self
    }

    pub fn for_day(&self, day: Weekday) -> Option<&HsvRange> {
        self.days.get(day_name(day))
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// chrono 星期 → 排班表键名
pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// 员工识别器
#[derive(Debug, Clone)]
pub struct RoleClassifier {
    schedule: ColorSchedule,
    threshold: f64,
}

impl RoleClassifier {
    pub fn new(schedule: ColorSchedule) -> Self {
        Self {
            schedule,
            threshold: DEFAULT_STAFF_RATIO,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn schedule(&self) -> &ColorSchedule {
        &self.schedule
    }

    /// 命中比例是否达到员工判定 (严格 `>`)
    pub fn classify_ratio(&self, ratio: f64) -> bool {
        ratio > self.threshold
    }

    /// 检测框是否为当天制服颜色的员工
    pub fn is_staff(&self, frame: &RgbImage, bbox: &BBox, day: Weekday) -> bool {
        let Some(range) = self.schedule.for_day(day) else {
            return false;
        };
        match torso_match_ratio(frame, bbox, range) {
            Some(ratio) => self.classify_ratio(ratio),
            None => false,
        }
    }
}

/// 躯干区域像素范围 `(x0, y0, x1, y1)`, 已裁剪到画面内; 空区域返回 None
pub fn torso_crop(bbox: &BBox, frame_w: u32, frame_h: u32) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (bbox.width(), bbox.height());
    if !(w > 0.0 && h > 0.0) {
        return None;
    }

    let clamp = |v: f32, max: u32| v.floor().clamp(0.0, max as f32) as u32;
    let x0 = clamp(bbox.x1 + w * TORSO_X.0, frame_w);
    let x1 = clamp(bbox.x1 + w * TORSO_X.1, frame_w);
    let y0 = clamp(bbox.y1 + h * TORSO_Y.0, frame_h);
    let y1 = clamp(bbox.y1 + h * TORSO_Y.1, frame_h);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1, y1))
}

/// 躯干区域内 HSV 落在范围内的像素比例
pub fn torso_match_ratio(frame: &RgbImage, bbox: &BBox, range: &HsvRange) -> Option<f64> {
    let (x0, y0, x1, y1) = torso_crop(bbox, frame.width(), frame.height())?;

    let mut hits = 0usize;
    for y in y0..y1 {
        for x in x0..x1 {
            if range.contains(rgb_to_hsv(frame.get_pixel(x, y).0)) {
                hits += 1;
            }
        }
    }
    let total = ((x1 - x0) * (y1 - y0)) as usize;
    Some(hits as f64 / total as f64)
}

/// RGB → HSV (8 位约定)
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = v - min;

    let s = if v > 0.0 { 255.0 * delta / v } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / delta
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / delta
    } else {
        240.0 + 60.0 * (rf - gf) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = ((h / 2.0).round() as u32 % 180) as u8;
    [h, s.round().min(255.0) as u8, v as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const RED: Rgb<u8> = Rgb([220, 20, 20]);
    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    fn red_range() -> HsvRange {
        HsvRange {
            lower: [0, 120, 70],
            upper: [10, 255, 255],
        }
    }

    /// 50x250 检测框 → 躯干区域 x∈[10,40), y∈[50,150) 共 3000 像素
    fn frame_with_hits(hits: usize) -> (RgbImage, BBox) {
        let mut frame = RgbImage::from_pixel(200, 300, GRAY);
        let mut painted = 0;
        'outer: for y in 50..150 {
            for x in 10..40 {
                if painted == hits {
                    break 'outer;
                }
                frame.put_pixel(x, y, RED);
                painted += 1;
            }
        }
        (frame, BBox::person(0.0, 0.0, 50.0, 250.0, 0.9))
    }

    fn classifier() -> RoleClassifier {
        RoleClassifier::new(ColorSchedule::new().with_day(Weekday::Mon, red_range()))
    }

    #[test]
    fn test_hsv_conversion() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let hsv = rgb_to_hsv([220, 20, 20]);
        assert_eq!(hsv, [0, 232, 220]);

        let exact = HsvRange {
            lower: hsv,
            upper: hsv,
        };
        assert!(exact.contains(hsv));
        assert!(red_range().contains(hsv));
    }

    #[test]
    fn test_one_unit_outside_any_channel_is_rejected() {
        let hsv = [5, 232, 220];
        for c in 0..3 {
            let mut above = HsvRange {
                lower: hsv,
                upper: hsv,
            };
            above.lower[c] += 1;
            above.upper[c] = 255;
            assert!(!above.contains(hsv), "channel {} lower bound", c);

            let mut below = HsvRange {
                lower: [0, 0, 0],
                upper: hsv,
            };
            below.upper[c] -= 1;
            assert!(!below.contains(hsv), "channel {} upper bound", c);
        }
    }

    #[test]
    fn test_torso_crop_uses_box_origin() {
        let bbox = BBox::person(100.0, 200.0, 150.0, 450.0, 0.9);
        assert_eq!(torso_crop(&bbox, 1280, 720), Some((110, 250, 140, 350)));
    }

    #[test]
    fn test_threshold_is_strict() {
        let c = classifier();
        assert!(!c.classify_ratio(0.30));
        assert!(c.classify_ratio(0.301));
    }

    #[test]
    fn test_exactly_thirty_percent_is_not_staff() {
        let (frame, bbox) = frame_with_hits(900);
        assert_eq!(torso_match_ratio(&frame, &bbox, &red_range()), Some(0.3));
        assert!(!classifier().is_staff(&frame, &bbox, Weekday::Mon));
    }

    #[test]
    fn test_just_above_thirty_percent_is_staff() {
        let (frame, bbox) = frame_with_hits(903);
        assert!(classifier().is_staff(&frame, &bbox, Weekday::Mon));
    }

    #[test]
    fn test_missing_day_is_never_staff() {
        let (frame, bbox) = frame_with_hits(3000);
        assert!(classifier().is_staff(&frame, &bbox, Weekday::Mon));
        assert!(!classifier().is_staff(&frame, &bbox, Weekday::Tue));
    }

    #[test]
    fn test_empty_or_out_of_frame_crop_is_not_staff() {
        let frame = RgbImage::from_pixel(100, 100, RED);
        let c = classifier();
        let zero = BBox::person(10.0, 10.0, 10.0, 50.0, 0.9);
        let outside = BBox::person(500.0, 500.0, 600.0, 700.0, 0.9);
        assert!(!c.is_staff(&frame, &zero, Weekday::Mon));
        assert!(!c.is_staff(&frame, &outside, Weekday::Mon));
    }

    #[test]
    fn test_schedule_parsing_skips_malformed_entries() {
        let schedule: ColorSchedule = serde_json::from_str(
            r#"{
                "monday": {"lower": [0, 120, 70], "upper": [10, 255, 255]},
                "TUESDAY": {"lower": [100, 50, 50]},
                "WEDNESDAY": "blue"
            }"#,
        )
        .unwrap();
        assert_eq!(schedule.for_day(Weekday::Mon), Some(&red_range()));
        assert!(schedule.for_day(Weekday::Tue).is_none());
        assert!(schedule.for_day(Weekday::Wed).is_none());
    }
}
