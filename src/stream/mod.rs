/// 运行时 (Stream)
///
/// - StreamLoop: 读帧与重连, 驱动检测/跟踪/分析
/// - Reporter:   独立线程周期上报最新结果
pub mod reporter;
pub mod stream_loop;

pub use reporter::{
    AnalyticsSink, HttpSink, LatestSlot, ReportOutcome, Reporter, ReporterHandle,
    DEFAULT_REPORT_INTERVAL,
};
pub use stream_loop::{LinkState, StepOutcome, StreamLoop, DEFAULT_RECONNECT_BACKOFF};
