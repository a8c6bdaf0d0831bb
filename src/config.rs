// src/config.rs

use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LaneSide;

    #[test]
    fn test_lane_side_defaults_to_left() {
        let yaml = r#"
video:
  input_path: data/raw/traffic.mp4
  output_path: data/processed/traffic_annotated.mp4
model:
  path: models/yolov8n.onnx
  confidence_threshold: 0.25
  nms_iou_threshold: 0.45
  num_threads: 4
tracker:
  min_iou: 0.3
  max_coast_frames: 30
  min_hits_to_confirm: 3
counting: {}
logging:
  level: info
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.counting.lane_side, LaneSide::Left);
    }

    #[test]
    fn test_lane_side_parses_right() {
        let yaml = "lane_side: right";
        let counting: crate::types::CountingConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(counting.lane_side, LaneSide::Right);
    }
}
