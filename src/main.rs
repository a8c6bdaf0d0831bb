// src/main.rs

mod annotator;
mod config;
mod counter;
mod error;
mod lane_classifier;
mod pipeline;
mod tracker;
mod types;
mod vehicle_classes;
mod vehicle_detection;
mod video_processor;

use anyhow::Result;
use pipeline::CountingPipeline;
use tracing::info;
use tracker::VehicleTracker;
use types::Config;
use vehicle_classes::VehicleClass;
use vehicle_detection::YoloDetector;
use video_processor::{VideoReader, VideoSink};

fn main() -> Result<()> {
    let config = Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!(
            "lane_vehicle_counter={},ort=warn",
            config.logging.level
        )))
        .init();

    info!("🚗 Lane Vehicle Counter Starting");
    info!("✓ Configuration loaded");

    let detector = YoloDetector::new(&config.model)?;
    let tracker = VehicleTracker::new(detector, config.tracker.clone());

    let mut pipeline = CountingPipeline::new(config.counting.lane_side, tracker);
    let summary = pipeline.run(
        || VideoReader::open(&config.video.input_path),
        |geometry| VideoSink::create(&config.video.output_path, geometry),
    )?;

    info!("✓ Processing completed successfully!");
    info!("  Frames processed: {}", summary.frames);
    for class in VehicleClass::ALL {
        info!(
            "  {}: {}",
            class.display_name(),
            summary.tally.get(class)
        );
    }
    info!("  Total: {}", summary.total());

    Ok(())
}
