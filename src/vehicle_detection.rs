// src/vehicle_detection.rs

use crate::types::{Detection, ModelConfig};
use crate::vehicle_classes::VehicleClass;
use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat, Rect, Scalar, Size},
    imgproc,
    prelude::*,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

const YOLO_INPUT_SIZE: usize = 640;
const YOLO_CLASSES: usize = 80;

/// YOLOv8-style single-class-per-box detector over an ONNX session.
/// Emits only registry vehicle classes; track ids are assigned later by
/// the tracker.
pub struct YoloDetector {
    session: Session,
    confidence_threshold: f32,
    nms_iou_threshold: f32,
}

impl YoloDetector {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        info!("Loading YOLO model: {}", config.path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.num_threads)?
            .commit_from_file(&config.path)
            .context("Failed to load model")?;

        info!("✓ YOLO detector initialized");
        Ok(Self {
            session,
            confidence_threshold: config.confidence_threshold,
            nms_iou_threshold: config.nms_iou_threshold,
        })
    }

    pub fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let (input, scale, pad_x, pad_y) = self.preprocess(frame)?;
        let output = self.infer(&input)?;
        let detections = self.postprocess(&output, scale, pad_x, pad_y);

        debug!("Detected {} vehicles", detections.len());
        Ok(detections)
    }

    /// Letterbox the BGR frame onto a gray 640x640 canvas, then normalize
    /// to RGB CHW in [0, 1].
    fn preprocess(&self, frame: &Mat) -> Result<(Vec<f32>, f32, f32, f32)> {
        let src_w = frame.cols();
        let src_h = frame.rows();
        let target = YOLO_INPUT_SIZE as i32;

        let (scale, pad_x, pad_y) = letterbox_params(src_w, src_h, target);
        let scaled_w = ((src_w as f32 * scale) as i32).max(1);
        let scaled_h = ((src_h as f32 * scale) as i32).max(1);

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(scaled_w, scaled_h),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut canvas =
            Mat::new_rows_cols_with_default(target, target, core::CV_8UC3, Scalar::all(114.0))?;
        let mut roi = Mat::roi_mut(
            &mut canvas,
            Rect::new(pad_x as i32, pad_y as i32, scaled_w, scaled_h),
        )?;
        resized.copy_to(&mut roi)?;
        drop(roi);

        let bytes = canvas.data_bytes()?;
        let size = YOLO_INPUT_SIZE;
        let mut input = vec![0.0f32; 3 * size * size];
        for c in 0..3 {
            for y in 0..size {
                for x in 0..size {
                    // BGR HWC -> RGB CHW
                    let hwc_idx = (y * size + x) * 3 + (2 - c);
                    let chw_idx = c * size * size + y * size + x;
                    input[chw_idx] = bytes[hwc_idx] as f32 / 255.0;
                }
            }
        }

        Ok((input, scale, pad_x, pad_y))
    }

    fn infer(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let shape = [1, 3, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.to_vec().into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs!["images" => input_value])?;
        let output = &outputs[0];
        let (_, data) = output.try_extract_tensor::<f32>()?;

        Ok(data.to_vec())
    }

    /// Decode the [1, 84, N] output: center-format box plus 80 class
    /// scores per prediction. Keeps registry classes above the confidence
    /// threshold, maps back to frame coordinates, then applies NMS.
    fn postprocess(&self, output: &[f32], scale: f32, pad_x: f32, pad_y: f32) -> Vec<Detection> {
        let preds = output.len() / (4 + YOLO_CLASSES);
        let mut detections = Vec::new();

        for i in 0..preds {
            let cx = output[i];
            let cy = output[preds + i];
            let w = output[preds * 2 + i];
            let h = output[preds * 3 + i];

            let mut max_conf = 0.0f32;
            let mut best_class = 0;
            for c in 0..YOLO_CLASSES {
                let conf = output[preds * (4 + c) + i];
                if conf > max_conf {
                    max_conf = conf;
                    best_class = c;
                }
            }

            if max_conf < self.confidence_threshold
                || VehicleClass::from_class_id(best_class as u32).is_none()
            {
                continue;
            }

            // Center format -> corners, then reverse the letterbox transform
            let x1 = (cx - w / 2.0 - pad_x) / scale;
            let y1 = (cy - h / 2.0 - pad_y) / scale;
            let x2 = (cx + w / 2.0 - pad_x) / scale;
            let y2 = (cy + h / 2.0 - pad_y) / scale;

            detections.push(Detection {
                bbox: [x1, y1, x2, y2],
                confidence: max_conf,
                class_id: best_class as u32,
                track_id: None,
            });
        }

        nms(detections, self.nms_iou_threshold)
    }
}

fn letterbox_params(src_w: i32, src_h: i32, target: i32) -> (f32, f32, f32) {
    let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
    let scaled_w = (src_w as f32 * scale) as i32;
    let scaled_h = (src_h as f32 * scale) as i32;
    let pad_x = (target - scaled_w) as f32 / 2.0;
    let pad_y = (target - scaled_h) as f32 / 2.0;
    (scale, pad_x, pad_y)
}

fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    while !detections.is_empty() {
        let current = detections.remove(0);
        detections.retain(|det| iou(&current.bbox, &det.bbox) < iou_threshold);
        keep.push(current);
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter <= 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(bbox: [f32; 4], confidence: f32) -> Detection {
        Detection {
            bbox,
            confidence,
            class_id: 2,
            track_id: None,
        }
    }

    #[test]
    fn test_letterbox_landscape() {
        // 1280x720 -> scale 0.5, 640x360 scaled, padded vertically
        let (scale, pad_x, pad_y) = letterbox_params(1280, 720, 640);
        assert_eq!(scale, 0.5);
        assert_eq!(pad_x, 0.0);
        assert_eq!(pad_y, 140.0);
    }

    #[test]
    fn test_letterbox_square_is_identity() {
        let (scale, pad_x, pad_y) = letterbox_params(640, 640, 640);
        assert_eq!(scale, 1.0);
        assert_eq!(pad_x, 0.0);
        assert_eq!(pad_y, 0.0);
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        let detections = vec![
            det([0.0, 0.0, 100.0, 100.0], 0.9),
            det([5.0, 5.0, 105.0, 105.0], 0.7), // mostly the same box
            det([300.0, 300.0, 400.0, 400.0], 0.8),
        ];
        let kept = nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
        // Highest-confidence box of the pair survives
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        assert_eq!(
            iou(&[0.0, 0.0, 50.0, 50.0], &[100.0, 100.0, 200.0, 200.0]),
            0.0
        );
    }

    #[test]
    fn test_iou_half_overlap() {
        let score = iou(&[0.0, 0.0, 100.0, 100.0], &[50.0, 0.0, 150.0, 100.0]);
        assert!((score - 5000.0 / 15000.0).abs() < 1e-6);
    }
}
