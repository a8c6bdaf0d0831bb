// src/video_processor.rs

use crate::types::FrameGeometry;
use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use tracing::info;

/// Sequential pull interface over the input video. `read_frame` returns
/// `None` at end-of-stream.
pub trait FrameSource {
    fn geometry(&self) -> FrameGeometry;
    fn read_frame(&mut self) -> Result<Option<Mat>>;
    fn release(&mut self) -> Result<()>;
}

/// Sequential push interface over the output video. Append-only: frames
/// already written stay written even if the run aborts.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()>;
    fn release(&mut self) -> Result<()>;
}

pub struct VideoReader {
    cap: VideoCapture,
    geometry: FrameGeometry,
}

impl VideoReader {
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening video: {}", path);

        let cap = VideoCapture::from_file(path, videoio::CAP_ANY)
            .with_context(|| format!("Failed to open video source {}", path))?;

        if !cap.is_opened()? {
            anyhow::bail!("Failed to open video source {}", path);
        }

        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;
        let fps = cap.get(videoio::CAP_PROP_FPS)?;

        info!("Video properties: {}x{} @ {:.1} FPS", width, height, fps);

        Ok(Self {
            cap,
            geometry: FrameGeometry { width, height, fps },
        })
    }
}

impl FrameSource for VideoReader {
    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.cap.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        self.cap.release()?;
        Ok(())
    }
}

pub struct VideoSink {
    writer: VideoWriter,
}

impl VideoSink {
    pub fn create(path: &str, geometry: FrameGeometry) -> Result<Self> {
        info!("Output video: {}", path);

        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            path,
            fourcc,
            geometry.fps,
            Size::new(geometry.width, geometry.height),
            true,
        )
        .with_context(|| format!("Failed to open video sink {}", path))?;

        if !writer.is_opened()? {
            anyhow::bail!("Failed to open video sink {}", path);
        }

        Ok(Self { writer })
    }
}

impl FrameSink for VideoSink {
    fn write_frame(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame)?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.writer.release()?;
        Ok(())
    }
}
