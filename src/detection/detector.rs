// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 检测器 (Detector)
//! 职责: 1280x720 RGB 帧 → 人体检测框

use super::tracker::compute_iou;
use super::types::BBox;
use image::RgbImage;

/// 人体检测器接口
///
/// 只返回 "person" 类别的检测框, 坐标与输入帧一致
pub trait PersonDetector {
    fn detect(&mut self, frame: &RgbImage) -> anyhow::Result<Vec<BBox>>;
}

/// 非极大值抑制 (按置信度降序, 贪心保留)
pub fn non_max_suppression(boxes: &mut Vec<BBox>, iou_threshold: f32) {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..boxes.len() {
        let drop = (0..kept).any(|prev| compute_iou(&boxes[prev], &boxes[index]) > iou_threshold);
        if !drop {
            boxes.swap(kept, index);
            kept += 1;
        }
    }
    boxes.truncate(kept);
}

#[cfg(feature = "onnx")]
pub use self::onnx::{YoloConfig, YoloPersonDetector};

#[cfg(feature = "onnx")]
mod onnx {
    use super::{non_max_suppression, PersonDetector};
    use crate::detection::types::{BBox, PERSON_CLASS_ID};
    use anyhow::{bail, Context, Result};
    use image::{imageops, RgbImage};
    use ndarray::Array4;
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::Tensor;
    use tracing::{debug, info};

    /// YOLOv8 检测参数
    #[derive(Debug, Clone)]
    pub struct YoloConfig {
        pub model_path: String,
        pub input_size: u32,
        pub conf_threshold: f32,
        pub iou_threshold: f32,
        pub intra_threads: usize,
    }

    impl Default for YoloConfig {
        fn default() -> Self {
            Self {
                model_path: "models/yolov8n.onnx".to_string(),
                input_size: 640,
                conf_threshold: 0.25,
                iou_threshold: 0.45,
                intra_threads: 4,
            }
        }
    }

    /// YOLOv8 ONNX 人体检测器
    pub struct YoloPersonDetector {
        session: Session,
        config: YoloConfig,
    }

    impl YoloPersonDetector {
        pub fn new(config: YoloConfig) -> Result<Self> {
            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(config.intra_threads)?
                .commit_from_file(&config.model_path)
                .with_context(|| format!("failed to load model {}", config.model_path))?;
            info!(model = %config.model_path, size = config.input_size, "✅ detector model loaded");
            Ok(Self { session, config })
        }

        fn scale_wh(&self, w0: f32, h0: f32) -> (f32, u32, u32) {
            let size = self.config.input_size as f32;
            let r = (size / w0).min(size / h0);
            (r, (w0 * r).round() as u32, (h0 * r).round() as u32)
        }

        /// Letterbox (左上对齐, 灰色填充) → NCHW f32
        fn preprocess(&self, frame: &RgbImage) -> (Array4<f32>, f32) {
            let size = self.config.input_size as usize;
            let (ratio, w_new, h_new) = self.scale_wh(frame.width() as f32, frame.height() as f32);
            let resized = imageops::resize(frame, w_new.max(1), h_new.max(1), imageops::FilterType::Triangle);

            let mut input = Array4::<f32>::from_elem((1, 3, size, size), 144.0 / 255.0);
            for (x, y, rgb) in resized.enumerate_pixels() {
                let (x, y) = (x as usize, y as usize);
                if x >= size || y >= size {
                    continue;
                }
                let [r, g, b] = rgb.0;
                input[[0, 0, y, x]] = r as f32 / 255.0;
                input[[0, 1, y, x]] = g as f32 / 255.0;
                input[[0, 2, y, x]] = b as f32 / 255.0;
            }
            (input, ratio)
        }
    }

    impl PersonDetector for YoloPersonDetector {
        fn detect(&mut self, frame: &RgbImage) -> Result<Vec<BBox>> {
            let (input, ratio) = self.preprocess(frame);
            let tensor = Tensor::from_array(input)?;
            let outputs = self.session.run(ort::inputs![tensor])?;
            let output = outputs
                .get("output0")
                .context("detector produced no output0 tensor")?;
            let (shape, data) = output.try_extract_tensor::<f32>()?;

            // 输出: [1, 4 + nc, anchors]
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            if dims.len() != 3 || dims[1] <= 4 {
                bail!("unexpected detector output shape {:?}", dims);
            }
            let anchors = dims[2];
            let (w0, h0) = (frame.width() as f32, frame.height() as f32);
            let person_row = 4 + PERSON_CLASS_ID as usize;

            let mut boxes = Vec::new();
            for i in 0..anchors {
                let confidence = data[person_row * anchors + i];
                if confidence < self.config.conf_threshold {
                    continue;
                }
                let cx = data[i] / ratio;
                let cy = data[anchors + i] / ratio;
                let w = data[2 * anchors + i] / ratio;
                let h = data[3 * anchors + i] / ratio;
                boxes.push(BBox::person(
                    (cx - w / 2.0).clamp(0.0, w0),
                    (cy - h / 2.0).clamp(0.0, h0),
                    (cx + w / 2.0).clamp(0.0, w0),
                    (cy + h / 2.0).clamp(0.0, h0),
                    confidence,
                ));
            }

            non_max_suppression(&mut boxes, self.config.iou_threshold);
            debug!(count = boxes.len(), "persons detected");
            Ok(boxes)
        }
    }
}
