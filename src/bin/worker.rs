/// 单摄像头分析进程 (Camera Worker)
///
/// 系统架构:
/// 1. 启动: 从后端拉取摄像头/分店配置 (失败即退出)
/// 2. 解码线程: RTSP 拉流解码 (ez-ffmpeg)
/// 3. 主线程:   检测 → 跟踪 → 区域分析, 写入最新结果槽
/// 4. 上报线程: 每个周期提交最新结果, 失败丢弃
use anyhow::Context;
use clap::Parser;
use dinewatch::api::{ApiClient, DEFAULT_API_URL};
use dinewatch::config::{ConfigProvider, HttpConfigProvider, TrackerConfig};
use dinewatch::detection::{ByteTracker, YoloConfig, YoloPersonDetector};
use dinewatch::input::FfmpegSource;
use dinewatch::stream::{HttpSink, LatestSlot, Reporter, StreamLoop};
use dinewatch::CameraEngine;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// 单摄像头分析进程参数
#[derive(Parser, Debug)]
#[command(author, version, about = "餐厅摄像头分析进程", long_about = None)]
struct Args {
    /// 摄像头ID
    camera_id: u64,

    /// 分店ID
    branch_id: u64,

    /// 后端 API 根地址
    #[arg(long, env = "FASTAPI_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Bearer token
    #[arg(long, env = "JWT_ACCESS_TOKEN", default_value = "fallback_token", hide_env_values = true)]
    token: String,

    /// YOLOv8 ONNX 模型路径
    #[arg(short, long, default_value = "models/yolov8n.onnx")]
    model: String,

    /// ByteTrack 参数文件 (JSON)
    #[arg(long)]
    tracker_config: Option<String>,

    /// 读帧失败后的重连等待 (秒)
    #[arg(long, default_value_t = 5)]
    reconnect_backoff_secs: u64,

    /// 上报周期 (秒)
    #[arg(long, default_value_t = 5)]
    report_interval_secs: u64,

    /// 无新帧多久视为读失败 (秒)
    #[arg(long, default_value_t = 10)]
    read_timeout_secs: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dinewatch=info,ort=warn")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!(error = %format!("{:#}", e), "❌ worker aborted");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    info!(camera_id = args.camera_id, branch_id = args.branch_id, api = %args.api_url, "🚀 worker starting");

    let api = ApiClient::new(&args.api_url, &args.token);
    let config = HttpConfigProvider::new(api.clone())
        .fetch(args.camera_id, args.branch_id)
        .context("failed to load camera configuration")?;

    let tracker_config = match &args.tracker_config {
        Some(path) => TrackerConfig::load(path),
        None => TrackerConfig::default(),
    };

    let detector = YoloPersonDetector::new(YoloConfig {
        model_path: args.model.clone(),
        ..YoloConfig::default()
    })?;

    let camera_label = config.camera_id().to_string();
    let source = FfmpegSource::open(
        &config.camera.rtsp_url,
        &camera_label,
        Duration::from_secs(args.read_timeout_secs),
    )
    .context("failed to start stream decoder")?;

    let slot = LatestSlot::new();
    let _reporter = Reporter::new(config.camera_id(), slot.clone(), Box::new(HttpSink::new(api)))
        .with_interval(Duration::from_secs(args.report_interval_secs.max(1)))
        .spawn()
        .context("failed to start reporter")?;

    let engine = CameraEngine::from_config(&config);
    let mut stream = StreamLoop::new(
        config.camera_id(),
        source,
        detector,
        ByteTracker::new(tracker_config),
        engine,
        slot,
    )
    .with_backoff(Duration::from_secs(args.reconnect_backoff_secs));

    stream.run()
}
