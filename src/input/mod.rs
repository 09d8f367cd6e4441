/// 视频输入 (Input)
///
/// - FrameSource: 读帧 / 重连接口
/// - FrameNormalizer: 缩放到 1280x720
/// - FfmpegSource: RTSP 拉流 (`ffmpeg` feature)
#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod source;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegSource;
pub use source::{FrameNormalizer, FrameSource};
