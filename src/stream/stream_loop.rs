//! 单摄像头主循环: 读帧 → 归一化 → 检测 → 跟踪 → 区域分析 → 最新结果槽
//! Per-camera frame loop with infinite reconnect

use super::reporter::LatestSlot;
use crate::analytics::{CameraEngine, FrameContext};
use crate::detection::detector::PersonDetector;
use crate::detection::tracker::Tracker;
use crate::input::{FrameNormalizer, FrameSource};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// 默认重连等待
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Reconnecting,
}

/// 单步结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// 新的分析结果已写入槽
    Processed,
    /// 帧已读到, 但检测或归一化失败, 本帧跳过
    Skipped,
    /// 读失败, 已等待并尝试重开
    ReadFailed,
}

pub struct StreamLoop<S, D, T> {
    camera_id: u64,
    source: S,
    detector: D,
    tracker: T,
    engine: CameraEngine,
    normalizer: FrameNormalizer,
    slot: LatestSlot,
    state: LinkState,
    backoff: Duration,
    reconnects: u64,
}

impl<S, D, T> StreamLoop<S, D, T>
where
    S: FrameSource,
    D: PersonDetector,
    T: Tracker,
{
    pub fn new(camera_id: u64, source: S, detector: D, tracker: T, engine: CameraEngine, slot: LatestSlot) -> Self {
        Self {
            camera_id,
            source,
            detector,
            tracker,
            engine,
            normalizer: FrameNormalizer::new(),
            slot,
            state: LinkState::Connected,
            backoff: DEFAULT_RECONNECT_BACKOFF,
            reconnects: 0,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    pub fn engine(&self) -> &CameraEngine {
        &self.engine
    }

    /// 处理一帧或一次重连
    pub fn step(&mut self, ctx: FrameContext) -> StepOutcome {
        let frame = match self.source.read() {
            Ok(frame) => frame,
            Err(e) => {
                self.reconnect(&e);
                return StepOutcome::ReadFailed;
            }
        };

        if self.state == LinkState::Reconnecting {
            info!(camera_id = self.camera_id, attempts = self.reconnects, "✅ stream reconnected");
            self.state = LinkState::Connected;
        }

        let frame = match self.normalizer.normalize(frame) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(camera_id = self.camera_id, error = %e, "⚠️ frame normalisation failed");
                return StepOutcome::Skipped;
            }
        };

        let boxes = match self.detector.detect(&frame) {
            Ok(boxes) => boxes,
            Err(e) => {
                warn!(camera_id = self.camera_id, error = %e, "⚠️ detection failed, frame skipped");
                return StepOutcome::Skipped;
            }
        };
        let detections = self.tracker.update(&boxes);

        let record = self.engine.process_frame(&frame, &detections, &ctx);
        self.slot.store(record);
        StepOutcome::Processed
    }

    fn reconnect(&mut self, cause: &crate::error::Error) {
        if self.state == LinkState::Connected {
            warn!(camera_id = self.camera_id, error = %cause, "📡 stream read failed, reconnecting");
        }
        self.state = LinkState::Reconnecting;
        self.reconnects += 1;

        if !self.backoff.is_zero() {
            thread::sleep(self.backoff);
        }
        if let Err(e) = self.source.reopen() {
            warn!(camera_id = self.camera_id, attempt = self.reconnects, error = %e, "⚠️ reopen failed, will retry");
        }
    }

    /// 无限循环, 流故障不会让进程退出
    pub fn run(&mut self) -> ! {
        info!(camera_id = self.camera_id, area = %self.engine.area(), "▶️ stream loop started");
        loop {
            self.step(FrameContext::current());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsRecord;
    use crate::config::{AreaType, RoiSettings};
    use crate::detection::bytetrack::ByteTracker;
    use crate::detection::types::BBox;
    use crate::error::{Error, Result};
    use crate::roles::ColorSchedule;
    use chrono::Weekday;
    use image::RgbImage;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::time::Instant;

    /// 按脚本返回帧或读失败
    struct ScriptedSource {
        script: VecDeque<Option<(u32, u32)>>,
        reopened: usize,
    }

    impl ScriptedSource {
        fn new(script: &[Option<(u32, u32)>]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                reopened: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> Result<RgbImage> {
            match self.script.pop_front() {
                Some(Some((w, h))) => Ok(RgbImage::new(w, h)),
                _ => Err(Error::Source("stream down".into())),
            }
        }

        fn reopen(&mut self) -> Result<()> {
            self.reopened += 1;
            Ok(())
        }
    }

    /// 依次输出预设检测框, 并记录看到的帧尺寸
    struct ScriptedDetector {
        frames: VecDeque<Vec<BBox>>,
        seen: Vec<(u32, u32)>,
    }

    impl PersonDetector for ScriptedDetector {
        fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<BBox>> {
            self.seen.push(frame.dimensions());
            Ok(self.frames.pop_front().unwrap_or_default())
        }
    }

    fn entrance_engine() -> CameraEngine {
        CameraEngine::new(
            AreaType::Entrance,
            RoiSettings::new(json!({"type": "LINE", "start": [0, 360], "end": [1280, 360]})),
            ColorSchedule::new(),
        )
    }

    fn ctx() -> FrameContext {
        FrameContext::new(Instant::now(), Weekday::Wed)
    }

    fn person_at(foot_y: f32) -> BBox {
        BBox::person(600.0, foot_y - 150.0, 680.0, foot_y, 0.9)
    }

    #[test]
    fn test_crossing_survives_reconnect() {
        let source = ScriptedSource::new(&[Some((1280, 720)), None, None, Some((1920, 1080))]);
        let detector = ScriptedDetector {
            frames: VecDeque::from(vec![vec![person_at(350.0)], vec![person_at(370.0)]]),
            seen: Vec::new(),
        };
        let slot = LatestSlot::new();
        let mut stream = StreamLoop::new(1, source, detector, ByteTracker::default(), entrance_engine(), slot.clone())
            .with_backoff(Duration::ZERO);

        assert_eq!(stream.step(ctx()), StepOutcome::Processed);
        assert_eq!(stream.step(ctx()), StepOutcome::ReadFailed);
        assert_eq!(stream.state(), LinkState::Reconnecting);
        assert_eq!(stream.step(ctx()), StepOutcome::ReadFailed);
        assert_eq!(stream.source.reopened, 2);

        // 重连后状态保留, 越线照常计数
        assert_eq!(stream.step(ctx()), StepOutcome::Processed);
        assert_eq!(stream.state(), LinkState::Connected);
        assert_eq!(stream.reconnects(), 2);
        assert_eq!(
            slot.peek(),
            Some(AnalyticsRecord::Entrance {
                people_in: 1,
                people_out: 0
            })
        );
    }

    #[test]
    fn test_every_frame_is_normalised_before_detection() {
        let source = ScriptedSource::new(&[Some((640, 480)), Some((1280, 720)), Some((2560, 1440))]);
        let detector = ScriptedDetector {
            frames: VecDeque::new(),
            seen: Vec::new(),
        };
        let mut stream = StreamLoop::new(
            1,
            source,
            detector,
            ByteTracker::default(),
            entrance_engine(),
            LatestSlot::new(),
        );
        for _ in 0..3 {
            stream.step(ctx());
        }
        assert_eq!(stream.detector.seen, vec![(1280, 720); 3]);
    }

    #[test]
    fn test_read_failure_keeps_previous_snapshot() {
        let source = ScriptedSource::new(&[Some((1280, 720)), None]);
        let detector = ScriptedDetector {
            frames: VecDeque::new(),
            seen: Vec::new(),
        };
        let slot = LatestSlot::new();
        let mut stream = StreamLoop::new(3, source, detector, ByteTracker::default(), entrance_engine(), slot.clone())
            .with_backoff(Duration::ZERO);

        stream.step(ctx());
        assert!(slot.peek().is_some());
        stream.step(ctx());
        assert!(slot.peek().is_some());
        assert_eq!(stream.engine().frames_processed(), 1);
    }

    #[test]
    fn test_detector_failure_skips_frame() {
        struct Broken;
        impl PersonDetector for Broken {
            fn detect(&mut self, _frame: &RgbImage) -> anyhow::Result<Vec<BBox>> {
                anyhow::bail!("session lost")
            }
        }

        let slot = LatestSlot::new();
        let mut stream = StreamLoop::new(
            1,
            ScriptedSource::new(&[Some((1280, 720))]),
            Broken,
            ByteTracker::default(),
            entrance_engine(),
            slot.clone(),
        );
        assert_eq!(stream.step(ctx()), StepOutcome::Skipped);
        assert!(slot.peek().is_none());
        assert_eq!(stream.state(), LinkState::Connected);
    }
}
