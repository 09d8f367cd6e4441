//! FFmpeg解码过滤器: YUV420P 帧 → RgbImage → 有界通道
//! Decode filter feeding RGB frames into a bounded channel

use crossbeam_channel::{Sender, TrySendError};
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 最大可接受分辨率
const MAX_DIMENSION: u32 = 4096;
/// 只对前几帧打印丢帧原因
const VERBOSE_DROPS: usize = 10;

pub struct DecodeFilter {
    tx: Sender<RgbImage>,
    /// 本解码器的代数; 与 `active` 不一致时停止
    generation: usize,
    active: Arc<AtomicUsize>,
    camera: String,
    count: usize,
    last: Instant,
    dropped_frames: usize,
    total_frames: usize,
}

impl DecodeFilter {
    pub fn new(tx: Sender<RgbImage>, generation: usize, active: Arc<AtomicUsize>, camera: String) -> Self {
        Self {
            tx,
            generation,
            active,
            camera,
            count: 0,
            last: Instant::now(),
            dropped_frames: 0,
            total_frames: 0,
        }
    }

    fn drop_frame(&mut self, reason: &str) {
        self.dropped_frames += 1;
        if self.total_frames <= VERBOSE_DROPS {
            warn!(camera = %self.camera, frame = self.total_frames, reason, "⚠️ frame dropped");
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        info!(camera = %self.camera, generation = self.generation, "✅ decode thread started");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        let current = self.active.load(Ordering::Relaxed);
        if self.generation != current {
            info!(
                camera = %self.camera,
                generation = self.generation,
                current,
                "🛑 decoder superseded, stopping"
            );
            return Err("decoder expired".to_string());
        }

        self.total_frames += 1;

        let rgb = unsafe {
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                self.drop_frame("empty or corrupt");
                return Ok(None);
            }

            let av = &*frame.as_ptr();
            let (w, h) = (av.width as u32, av.height as u32);
            if w == 0 || h == 0 || w > MAX_DIMENSION || h > MAX_DIMENSION {
                self.drop_frame("invalid resolution");
                return Ok(None);
            }

            // 缺少参考帧或比特流无效
            if av.decode_error_flags & 0x03 != 0 {
                self.drop_frame("decode error flags");
                return Ok(None);
            }

            let (y_plane, u_plane, v_plane) = (av.data[0], av.data[1], av.data[2]);
            let y_stride = av.linesize[0] as usize;
            let uv_stride = av.linesize[1] as usize;

            if y_plane.is_null() || u_plane.is_null() || v_plane.is_null() {
                self.drop_frame("null plane");
                return Ok(None);
            }
            if y_stride < w as usize || uv_stride < (w as usize).div_ceil(2) {
                self.drop_frame("bad stride");
                return Ok(None);
            }

            let mut buffer = vec![0u8; (w * h * 3) as usize];
            yuv420p_to_rgb(
                y_plane,
                u_plane,
                v_plane,
                y_stride,
                uv_stride,
                &mut buffer,
                w as usize,
                h as usize,
            );
            RgbImage::from_raw(w, h, buffer)
        };

        let Some(rgb) = rgb else {
            self.drop_frame("buffer size mismatch");
            return Ok(None);
        };

        match self.tx.try_send(rgb) {
            Ok(()) => self.count += 1,
            // 消费端处理不过来, 丢弃新帧
            Err(TrySendError::Full(_)) => self.dropped_frames += 1,
            Err(TrySendError::Disconnected(_)) => return Err("frame receiver closed".to_string()),
        }

        let elapsed = self.last.elapsed().as_secs_f64();
        if elapsed >= 10.0 {
            debug!(
                camera = %self.camera,
                fps = self.count as f64 / elapsed,
                total = self.total_frames,
                dropped = self.dropped_frames,
                "📺 decode stats"
            );
            self.last = Instant::now();
            self.count = 0;
        }

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!(camera = %self.camera, generation = self.generation, "decode thread exited");
    }
}

/// BT.601 整数近似 (系数 ×128)
#[allow(clippy::too_many_arguments)]
unsafe fn yuv420p_to_rgb(
    y_plane: *const u8,
    u_plane: *const u8,
    v_plane: *const u8,
    y_stride: usize,
    uv_stride: usize,
    buffer: &mut [u8],
    width: usize,
    height: usize,
) {
    let mut out = 0;
    for y in 0..height {
        let y_row = y * y_stride;
        let uv_row = (y >> 1) * uv_stride;

        for x in 0..width {
            let (r, g, b) = yuv_to_rgb(
                *y_plane.add(y_row + x),
                *u_plane.add(uv_row + (x >> 1)),
                *v_plane.add(uv_row + (x >> 1)),
            );
            buffer[out] = r;
            buffer[out + 1] = g;
            buffer[out + 2] = b;
            out += 3;
        }
    }
}

#[inline]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    (
        (y + ((v * 179) >> 7)).clamp(0, 255) as u8,
        (y - ((u * 44) >> 7) - ((v * 91) >> 7)).clamp(0, 255) as u8,
        (y + ((u * 227) >> 7)).clamp(0, 255) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_chroma_is_gray() {
        assert_eq!(yuv_to_rgb(128, 128, 128), (128, 128, 128));
        assert_eq!(yuv_to_rgb(0, 128, 128), (0, 0, 0));
        assert_eq!(yuv_to_rgb(255, 128, 128), (255, 255, 255));
    }

    #[test]
    fn test_red_chroma() {
        let (r, g, b) = yuv_to_rgb(76, 85, 255);
        assert!(r > 240 && g < 20 && b < 20, "{:?}", (r, g, b));
    }
}
