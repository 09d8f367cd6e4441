//! 周期上报 (独立线程)
//! Best-effort periodic reporting of the latest analytics snapshot
//!
//! 帧循环只写入单槽 `LatestSlot`, 不会被网络阻塞。上报线程每个周期取走槽内记录提交一次:
//! 槽为空则不发送, 提交失败记 warn 后丢弃, 不排队不重试。

use crate::analytics::{AnalyticsPayload, AnalyticsRecord};
use crate::api::ApiClient;
use crate::error::Result;
use crossbeam_channel::{bounded, select, tick, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认上报周期
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// 分析结果接收端
pub trait AnalyticsSink: Send {
    fn submit(&self, payload: &AnalyticsPayload) -> Result<()>;
}

/// `POST logs/`
#[derive(Debug, Clone)]
pub struct HttpSink {
    api: ApiClient,
}

impl HttpSink {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl AnalyticsSink for HttpSink {
    fn submit(&self, payload: &AnalyticsPayload) -> Result<()> {
        self.api.post_json("logs/", payload)
    }
}

/// 最新一帧的分析结果 (单槽, 新值覆盖旧值)
#[derive(Debug, Clone, Default)]
pub struct LatestSlot {
    inner: Arc<Mutex<Option<AnalyticsRecord>>>,
}

impl LatestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, record: AnalyticsRecord) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(record);
    }

    pub fn take(&self) -> Option<AnalyticsRecord> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn peek(&self) -> Option<AnalyticsRecord> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// 单次上报的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Sent,
    /// 上个周期以来没有新帧
    Skipped,
    /// 提交失败, 快照已丢弃
    Dropped,
}

pub struct Reporter {
    camera_id: u64,
    slot: LatestSlot,
    sink: Box<dyn AnalyticsSink>,
    interval: Duration,
}

impl Reporter {
    pub fn new(camera_id: u64, slot: LatestSlot, sink: Box<dyn AnalyticsSink>) -> Self {
        Self {
            camera_id,
            slot,
            sink,
            interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn report_once(&self) -> ReportOutcome {
        let Some(record) = self.slot.take() else {
            debug!(camera_id = self.camera_id, "no new analytics since last report");
            return ReportOutcome::Skipped;
        };

        let payload = AnalyticsPayload::new(self.camera_id, record);
        match self.sink.submit(&payload) {
            Ok(()) => {
                debug!(camera_id = self.camera_id, "📤 analytics reported");
                ReportOutcome::Sent
            }
            Err(e) => {
                warn!(camera_id = self.camera_id, error = %e, "⚠️ analytics report failed, snapshot dropped");
                ReportOutcome::Dropped
            }
        }
    }

    /// 启动上报线程
    pub fn spawn(self) -> Result<ReporterHandle> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(format!("reporter-{}", self.camera_id))
            .spawn(move || {
                let ticker = tick(self.interval);
                info!(camera_id = self.camera_id, interval = ?self.interval, "📡 reporter started");
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            self.report_once();
                        }
                        recv(stop_rx) -> _ => break,
                    }
                }
                info!(camera_id = self.camera_id, "reporter stopped");
            })?;

        Ok(ReporterHandle {
            stop: stop_tx,
            handle,
        })
    }
}

pub struct ReporterHandle {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl ReporterHandle {
    /// 停止并等待线程退出 (不再发送剩余快照)
    pub fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            warn!("reporter thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// 记录所有提交, 可切换为失败
    #[derive(Clone, Default)]
    struct RecordingSink {
        sent: Arc<Mutex<Vec<AnalyticsPayload>>>,
        failing: Arc<AtomicBool>,
    }

    impl AnalyticsSink for RecordingSink {
        fn submit(&self, payload: &AnalyticsPayload) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(Error::Http("backend down".into()));
            }
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn entrance(n: u64) -> AnalyticsRecord {
        AnalyticsRecord::Entrance {
            people_in: n,
            people_out: 0,
        }
    }

    #[test]
    fn test_reports_latest_only() {
        let slot = LatestSlot::new();
        let sink = RecordingSink::default();
        let reporter = Reporter::new(7, slot.clone(), Box::new(sink.clone()));

        slot.store(entrance(1));
        slot.store(entrance(2));
        assert_eq!(reporter.report_once(), ReportOutcome::Sent);

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], AnalyticsPayload::new(7, entrance(2)));
    }

    #[test]
    fn test_empty_slot_sends_nothing() {
        let slot = LatestSlot::new();
        let sink = RecordingSink::default();
        let reporter = Reporter::new(1, slot.clone(), Box::new(sink.clone()));

        assert_eq!(reporter.report_once(), ReportOutcome::Skipped);
        slot.store(entrance(1));
        reporter.report_once();
        assert_eq!(reporter.report_once(), ReportOutcome::Skipped);
        assert_eq!(sink.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_report_is_dropped_not_retried() {
        let slot = LatestSlot::new();
        let sink = RecordingSink::default();
        let reporter = Reporter::new(1, slot.clone(), Box::new(sink.clone()));

        sink.failing.store(true, Ordering::SeqCst);
        slot.store(entrance(3));
        assert_eq!(reporter.report_once(), ReportOutcome::Dropped);

        sink.failing.store(false, Ordering::SeqCst);
        assert_eq!(reporter.report_once(), ReportOutcome::Skipped);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_background_thread_reports_and_stops() {
        let slot = LatestSlot::new();
        let sink = RecordingSink::default();
        let handle = Reporter::new(2, slot.clone(), Box::new(sink.clone()))
            .with_interval(Duration::from_millis(10))
            .spawn()
            .unwrap();

        slot.store(entrance(4));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while sink.sent.lock().unwrap().is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.stop();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].analytics_data, entrance(4));
    }
}
