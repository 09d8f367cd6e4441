//! 单摄像头分析引擎
//! Per-camera analytics engine: owns the processor, role classifier and all cross-frame state

use super::processors::AreaProcessor;
use super::queue::QueueTracker;
use super::record::AnalyticsRecord;
use super::table::TableBoard;
use crate::config::{AreaType, RoiSettings, WorkerConfig};
use crate::detection::types::Detection;
use crate::roles::{ColorSchedule, RoleClassifier};
use crate::zones::Anchor;
use chrono::{Datelike, Local, Weekday};
use image::RgbImage;
use std::time::Instant;
use tracing::{debug, info};

/// 每帧的时间输入 (可注入, 便于测试)
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub now: Instant,
    pub weekday: Weekday,
}

impl FrameContext {
    pub fn new(now: Instant, weekday: Weekday) -> Self {
        Self { now, weekday }
    }

    /// 当前时刻与本地星期
    pub fn current() -> Self {
        Self {
            now: Instant::now(),
            weekday: Local::now().weekday(),
        }
    }
}

/// 摄像头引擎
///
/// 构造后所有状态为空 (桌子全部 AVAILABLE, 无排队记录, 越线计数为0),
/// `reset()` 恢复到这一状态。多个引擎互不共享状态, 可在同一进程中并存。
#[derive(Debug, Clone)]
pub struct CameraEngine {
    area: AreaType,
    roi: RoiSettings,
    anchor: Anchor,
    processor: AreaProcessor,
    roles: RoleClassifier,
    frames: u64,
}

impl CameraEngine {
    pub fn new(area: AreaType, roi: RoiSettings, schedule: ColorSchedule) -> Self {
        Self::with_anchor(area, roi, schedule, Anchor::default())
    }

    pub fn with_anchor(area: AreaType, roi: RoiSettings, schedule: ColorSchedule, anchor: Anchor) -> Self {
        let processor = AreaProcessor::from_config(&area, &roi, anchor);
        info!(area = %area, processor = processor.name(), "🧠 camera engine ready");
        Self {
            area,
            roi,
            anchor,
            processor,
            roles: RoleClassifier::new(schedule),
            frames: 0,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            config.camera.area_type.clone(),
            config.camera.roi_settings.clone(),
            config.uniform_schedule.clone(),
        )
    }

    /// 处理一帧: 帧已归一化到 1280x720, 检测已经过跟踪器
    pub fn process_frame(
        &mut self,
        frame: &RgbImage,
        detections: &[Detection],
        ctx: &FrameContext,
    ) -> AnalyticsRecord {
        let people: Vec<Detection> = detections.iter().filter(|d| d.is_person()).cloned().collect();
        self.frames += 1;

        let record = self.processor.process(frame, &people, &self.roles, ctx);
        debug!(frame = self.frames, people = people.len(), record = ?record, "frame analysed");
        record
    }

    /// 丢弃所有跨帧状态
    pub fn reset(&mut self) {
        self.processor = AreaProcessor::from_config(&self.area, &self.roi, self.anchor);
        self.frames = 0;
    }

    pub fn area(&self) -> &AreaType {
        &self.area
    }

    pub fn processor(&self) -> &AreaProcessor {
        &self.processor
    }

    pub fn roles(&self) -> &RoleClassifier {
        &self.roles
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn table_board(&self) -> Option<&TableBoard> {
        match &self.processor {
            AreaProcessor::Dining(p) => Some(p.board()),
            _ => None,
        }
    }

    pub fn table_board_mut(&mut self) -> Option<&mut TableBoard> {
        match &mut self.processor {
            AreaProcessor::Dining(p) => Some(p.board_mut()),
            _ => None,
        }
    }

    pub fn queue(&self) -> Option<&QueueTracker> {
        match &self.processor {
            AreaProcessor::Cashier(p) => Some(p.queue()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::record::TableSnapshot;
    use crate::analytics::table::TableStatus;
    use crate::config::TableId;
    use crate::detection::types::BBox;
    use crate::roles::HsvRange;
    use image::Rgb;
    use serde_json::json;
    use std::time::Duration;

    const UNIFORM_RED: Rgb<u8> = Rgb([220, 20, 20]);

    fn red_schedule() -> ColorSchedule {
        ColorSchedule::new().with_day(
            Weekday::Mon,
            HsvRange {
                lower: [0, 120, 70],
                upper: [10, 255, 255],
            },
        )
    }

    fn dining_engine() -> CameraEngine {
        let roi = RoiSettings::new(json!({
            "zones": [{"id": "T1", "points": [[100, 100], [600, 100], [600, 600], [100, 600]], "capacity": 4}]
        }));
        CameraEngine::new(AreaType::Dining, roi, red_schedule())
    }

    fn staff_box() -> BBox {
        BBox::person(150.0, 200.0, 250.0, 500.0, 0.9)
    }

    fn customer_box() -> BBox {
        BBox::person(350.0, 200.0, 450.0, 500.0, 0.9)
    }

    /// 黑底画面, 员工框整体涂成制服红色
    fn frame_with_staff() -> RgbImage {
        let mut frame = RgbImage::new(1280, 720);
        for y in 200..500 {
            for x in 150..250 {
                frame.put_pixel(x, y, UNIFORM_RED);
            }
        }
        frame
    }

    fn monday(now: Instant) -> FrameContext {
        FrameContext::new(now, Weekday::Mon)
    }

    fn t1_snapshot(record: &AnalyticsRecord) -> TableSnapshot {
        match record {
            AnalyticsRecord::Dining { tables, .. } => tables[0].clone(),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_dining_staff_and_customer_occupy_table() {
        let mut engine = dining_engine();
        let dets = [
            Detection::anonymous(staff_box()),
            Detection::anonymous(customer_box()),
        ];
        let record = engine.process_frame(&frame_with_staff(), &dets, &monday(Instant::now()));

        let t1 = t1_snapshot(&record);
        assert_eq!(t1.status, TableStatus::Occupied);
        assert_eq!(t1.people_count, 1);
        assert_eq!(t1.capacity, 4);
        match record {
            AnalyticsRecord::Dining { total_customers, .. } => assert_eq!(total_customers, 1),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_dining_full_cleaning_cycle() {
        let mut engine = dining_engine();
        let t1 = TableId::from("T1");
        engine
            .table_board_mut()
            .unwrap()
            .set(t1.clone(), TableStatus::Occupied);

        let now = Instant::now();
        let frame = frame_with_staff();

        let record = engine.process_frame(&frame, &[], &monday(now));
        assert_eq!(t1_snapshot(&record).status, TableStatus::Dirty);

        let record = engine.process_frame(&frame, &[Detection::anonymous(staff_box())], &monday(now));
        assert_eq!(t1_snapshot(&record).status, TableStatus::Cleaning);
        assert_eq!(t1_snapshot(&record).people_count, 0);

        let record = engine.process_frame(&frame, &[], &monday(now));
        assert_eq!(t1_snapshot(&record).status, TableStatus::Available);
        assert_eq!(engine.table_board().unwrap().status(&t1), TableStatus::Available);
    }

    #[test]
    fn test_staff_is_a_customer_on_unscheduled_day() {
        let mut engine = dining_engine();
        let ctx = FrameContext::new(Instant::now(), Weekday::Sun);
        let record = engine.process_frame(&frame_with_staff(), &[Detection::anonymous(staff_box())], &ctx);
        assert_eq!(t1_snapshot(&record).people_count, 1);
    }

    #[test]
    fn test_cashier_three_enter_one_leaves() {
        let roi = RoiSettings::new(json!({"points": [[0, 0], [640, 0], [640, 720], [0, 720]]}));
        let mut engine = CameraEngine::new(AreaType::Cashier, roi, ColorSchedule::new());
        let frame = RgbImage::new(1280, 720);
        let person = |id: u32, x: f32| Detection::tracked(BBox::person(x, 100.0, x + 60.0, 400.0, 0.8), id);

        let t0 = Instant::now();
        engine.process_frame(
            &frame,
            &[person(1, 50.0), person(2, 200.0), person(3, 350.0)],
            &monday(t0),
        );
        let record = engine.process_frame(
            &frame,
            &[person(1, 50.0), person(3, 350.0)],
            &monday(t0 + Duration::from_secs(10)),
        );
        assert_eq!(
            record,
            AnalyticsRecord::Cashier {
                queue_length: 2,
                wait_time_avg: 10
            }
        );
        assert_eq!(engine.queue().unwrap().len(), 2);
    }

    #[test]
    fn test_entrance_counts_and_reset() {
        let roi = RoiSettings::new(json!({"type": "LINE", "start": [0, 360], "end": [1280, 360]}));
        let mut engine = CameraEngine::new(AreaType::Entrance, roi, ColorSchedule::new());
        let frame = RgbImage::new(1280, 720);
        let ctx = monday(Instant::now());
        let at = |foot_y: f32| [Detection::tracked(BBox::person(600.0, foot_y - 150.0, 680.0, foot_y, 0.9), 5)];

        engine.process_frame(&frame, &at(300.0), &ctx);
        let record = engine.process_frame(&frame, &at(450.0), &ctx);
        assert_eq!(
            record,
            AnalyticsRecord::Entrance {
                people_in: 1,
                people_out: 0
            }
        );

        engine.reset();
        assert_eq!(engine.frames_processed(), 0);
        let record = engine.process_frame(&frame, &at(450.0), &ctx);
        assert_eq!(
            record,
            AnalyticsRecord::Entrance {
                people_in: 0,
                people_out: 0
            }
        );
    }

    #[test]
    fn test_reset_restores_available_tables() {
        let mut engine = dining_engine();
        let t1 = TableId::from("T1");
        engine.table_board_mut().unwrap().set(t1.clone(), TableStatus::Dirty);
        engine.reset();
        assert_eq!(engine.table_board().unwrap().status(&t1), TableStatus::Available);
        assert!(engine.table_board().unwrap().is_empty());
    }

    #[test]
    fn test_engines_do_not_share_state() {
        let mut a = dining_engine();
        let b = dining_engine();
        a.table_board_mut()
            .unwrap()
            .set(TableId::from("T1"), TableStatus::Cleaning);
        assert!(b.table_board().unwrap().is_empty());
    }

    #[test]
    fn test_non_person_detections_are_dropped() {
        let mut engine = dining_engine();
        let mut chair = customer_box();
        chair.class_id = 56;
        let record = engine.process_frame(&frame_with_staff(), &[Detection::anonymous(chair)], &monday(Instant::now()));
        assert_eq!(t1_snapshot(&record).status, TableStatus::Available);
    }
}
