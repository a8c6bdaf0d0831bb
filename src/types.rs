// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub video: VideoConfig,
    pub model: ModelConfig,
    pub tracker: TrackerConfig,
    pub counting: CountingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub input_path: String,
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    pub confidence_threshold: f32,
    pub nms_iou_threshold: f32,
    pub num_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub min_iou: f32,
    pub max_coast_frames: u32,
    pub min_hits_to_confirm: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountingConfig {
    #[serde(default)]
    pub lane_side: LaneSide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Half of the frame selected for counting, split at the vertical midline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneSide {
    Left,
    Right,
}

impl Default for LaneSide {
    fn default() -> Self {
        LaneSide::Left
    }
}

/// One detected object in one frame. `track_id` is `None` when the tracker
/// could not associate the object with a prior track.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // [x1, y1, x2, y2] in frame coordinates
    pub confidence: f32,
    pub class_id: u32,
    pub track_id: Option<u32>,
}

impl Detection {
    /// Corner coordinates truncated to integer pixels.
    pub fn corners(&self) -> (i32, i32, i32, i32) {
        (
            self.bbox[0] as i32,
            self.bbox[1] as i32,
            self.bbox[2] as i32,
            self.bbox[3] as i32,
        )
    }
}

/// Width, height and frame rate, read once from the frame source and fixed
/// for the run.
#[derive(Debug, Clone, Copy)]
pub struct FrameGeometry {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
}

impl FrameGeometry {
    pub fn mid_x(&self) -> i32 {
        self.width / 2
    }
}
