/// 检测系统 (Detection System)
///
/// 外部协作者, 每帧输出带跟踪ID的人体检测框
/// - Detector: 人体检测 (YOLOv8 ONNX, `onnx` feature)
/// - Tracker:  目标追踪 (ByteTrack)
pub mod bytetrack;
pub mod detector;
pub mod tracker;
pub mod types;

pub use bytetrack::ByteTracker;
pub use detector::{non_max_suppression, PersonDetector};
#[cfg(feature = "onnx")]
pub use detector::{YoloConfig, YoloPersonDetector};
pub use tracker::{compute_iou, KalmanBoxFilter, Tracker};
pub use types::{BBox, Detection, FRAME_HEIGHT, FRAME_WIDTH, PERSON_CLASS_ID};
