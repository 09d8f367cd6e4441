//! 视频源抽象与帧归一化
//! Frame source seam and resolution normalisation

use crate::detection::types::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::error::{Error, Result};
use fast_image_resize as fr;
use image::RgbImage;

/// 视频源: 读下一帧或返回读失败
pub trait FrameSource {
    fn read(&mut self) -> Result<RgbImage>;

    /// 读失败后重新打开流
    fn reopen(&mut self) -> Result<()>;
}

/// 将任意分辨率的帧缩放到 1280x720 (区域坐标系)
pub struct FrameNormalizer {
    resizer: fr::Resizer,
    options: fr::ResizeOptions,
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameNormalizer {
    pub fn new() -> Self {
        Self {
            resizer: fr::Resizer::new(),
            options: fr::ResizeOptions::new()
                .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
        }
    }

    /// 已是目标分辨率的帧直接返回
    pub fn normalize(&mut self, frame: RgbImage) -> Result<RgbImage> {
        let (w, h) = frame.dimensions();
        if (w, h) == (FRAME_WIDTH, FRAME_HEIGHT) {
            return Ok(frame);
        }
        if w == 0 || h == 0 {
            return Err(Error::Source(format!("empty frame {}x{}", w, h)));
        }

        let src = fr::images::Image::from_vec_u8(w, h, frame.into_raw(), fr::PixelType::U8x3)
            .map_err(|e| Error::Source(format!("frame buffer: {:?}", e)))?;
        let mut dst = fr::images::Image::new(FRAME_WIDTH, FRAME_HEIGHT, fr::PixelType::U8x3);

        self.resizer
            .resize(&src, &mut dst, &self.options)
            .map_err(|e| Error::Source(format!("resize {}x{}: {:?}", w, h, e)))?;

        RgbImage::from_raw(FRAME_WIDTH, FRAME_HEIGHT, dst.buffer().to_vec())
            .ok_or_else(|| Error::Source("resized buffer has unexpected length".to_string()))
    }
}
