//! RTSP 拉流 (ez-ffmpeg 软件解码)
//! RTSP source decoding on a background thread

use super::decode_filter::DecodeFilter;
use super::source::FrameSource;
use crate::error::{Error, Result};
use anyhow::{anyhow, Context};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// 解码线程与读取端之间的缓冲帧数
const FRAME_BUFFER: usize = 2;

/// 后台解码的视频源
///
/// 每次 `reopen` 递增代数, 旧解码线程在下一帧检查时退出。
pub struct FfmpegSource {
    url: String,
    camera: String,
    read_timeout: Duration,
    generation: Arc<AtomicUsize>,
    rx: Option<Receiver<RgbImage>>,
}

impl FfmpegSource {
    pub fn open(url: &str, camera: &str, read_timeout: Duration) -> Result<Self> {
        let mut source = Self {
            url: url.to_string(),
            camera: camera.to_string(),
            read_timeout,
            generation: Arc::new(AtomicUsize::new(0)),
            rx: None,
        };
        source.spawn()?;
        Ok(source)
    }

    fn spawn(&mut self) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = bounded(FRAME_BUFFER);
        let filter = DecodeFilter::new(tx, generation, Arc::clone(&self.generation), self.camera.clone());
        let url = self.url.clone();
        let camera = self.camera.clone();

        thread::Builder::new()
            .name(format!("decode-{}-{}", self.camera, generation))
            .spawn(move || {
                info!(camera = %camera, generation, "🎬 RTSP decoder starting");
                if let Err(e) = decode(&url, filter) {
                    warn!(camera = %camera, generation, error = %e, "❌ RTSP decoder failed");
                }
            })?;

        self.rx = Some(rx);
        Ok(())
    }
}

/// 阻塞直到流结束或过滤器报错
fn decode(url: &str, filter: DecodeFilter) -> anyhow::Result<()> {
    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("decode", Box::new(filter));
    let out = create_null_output().add_frame_pipeline(pipe);

    let input = Input::new(url).set_input_opts(
        [
            ("rtsp_transport", "tcp"),
            ("rtsp_flags", "prefer_tcp"),
            ("buffer_size", "67108864"),
        ]
        .into(),
    );

    let ctx = FfmpegContext::builder()
        .input(input)
        .filter_descs(["format=yuv420p"].into())
        .output(out)
        .build()
        .map_err(|e| anyhow!("{}", e))
        .context("building ffmpeg context")?;

    let scheduler = ctx
        .start()
        .map_err(|e| anyhow!("{}", e))
        .context("starting ffmpeg")?;
    scheduler
        .wait()
        .map_err(|e| anyhow!("{}", e))
        .context("ffmpeg stream ended with error")?;
    Ok(())
}

impl FrameSource for FfmpegSource {
    fn read(&mut self) -> Result<RgbImage> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| Error::Source("stream not open".to_string()))?;

        match rx.recv_timeout(self.read_timeout) {
            Ok(frame) => Ok(frame),
            Err(RecvTimeoutError::Timeout) => Err(Error::Source(format!(
                "no frame within {:?}",
                self.read_timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(Error::Source("decoder thread stopped".to_string()))
            }
        }
    }

    fn reopen(&mut self) -> Result<()> {
        self.rx = None;
        self.spawn()
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        // 让当前解码线程在下一帧退出
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}
