// src/pipeline.rs

use crate::annotator;
use crate::counter::{DedupCounter, TallySnapshot};
use crate::error::{PipelineError, PipelineResult};
use crate::lane_classifier;
use crate::tracker::Tracker;
use crate::types::{Detection, FrameGeometry, LaneSide};
use crate::vehicle_classes::VehicleClass;
use crate::video_processor::{FrameSink, FrameSource};
use anyhow::Result;
use opencv::core::Mat;
use tracing::{debug, info, warn};

/// Lifecycle of one counting run. `Aborted` is terminal and reachable from
/// any acquisition or I/O failure; `Done` is only reached after both
/// handles are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Draining,
    Done,
    Aborted,
}

/// Final report of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub tally: TallySnapshot,
}

impl RunSummary {
    pub fn total(&self) -> u64 {
        self.tally.total()
    }
}

/// Owns all per-run state: the dedup counter, the tracker, and the frame
/// cursor. Strictly sequential: no frame is read before the previous
/// frame's detection, counting, annotation, and emission are complete.
pub struct CountingPipeline<T: Tracker> {
    lane_side: LaneSide,
    tracker: T,
    counter: DedupCounter,
    state: RunState,
}

impl<T: Tracker> CountingPipeline<T> {
    pub fn new(lane_side: LaneSide, tracker: T) -> Self {
        Self {
            lane_side,
            tracker,
            counter: DedupCounter::new(),
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Acquire the source and sink, process every frame until end of
    /// stream, release both handles, and report the final tally.
    ///
    /// The sink is opened with the geometry read from the source. On any
    /// failure both handles are released and the run aborts; frames
    /// already written to the sink are left as-is.
    pub fn run<S, K, OS, OK>(&mut self, open_source: OS, open_sink: OK) -> PipelineResult<RunSummary>
    where
        S: FrameSource,
        K: FrameSink,
        OS: FnOnce() -> Result<S>,
        OK: FnOnce(FrameGeometry) -> Result<K>,
    {
        let mut source = match open_source() {
            Ok(source) => source,
            Err(e) => {
                self.state = RunState::Aborted;
                return Err(PipelineError::SourceOpen(e.into()));
            }
        };
        let geometry = source.geometry();

        let mut sink = match open_sink(geometry) {
            Ok(sink) => sink,
            Err(e) => {
                self.state = RunState::Aborted;
                release_or_warn(source.release(), "source");
                return Err(PipelineError::SinkOpen(e.into()));
            }
        };

        self.state = RunState::Running;
        info!(
            "Counting vehicles on the {} lane (midline at x={})",
            match self.lane_side {
                LaneSide::Left => "left",
                LaneSide::Right => "right",
            },
            geometry.mid_x()
        );

        let mut frames: u64 = 0;
        loop {
            let mut frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    let err = PipelineError::FrameRead {
                        frame: frames + 1,
                        source: e.into(),
                    };
                    return Err(self.abort(source, sink, err));
                }
            };
            frames += 1;

            let detections = match self.tracker.track(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    let err = PipelineError::Detector {
                        frame: frames,
                        source: e.into(),
                    };
                    return Err(self.abort(source, sink, err));
                }
            };

            let emit = self
                .process_frame(&mut frame, geometry, &detections)
                .and_then(|()| sink.write_frame(&frame));
            if let Err(e) = emit {
                let err = PipelineError::FrameWrite {
                    frame: frames,
                    source: e.into(),
                };
                return Err(self.abort(source, sink, err));
            }
        }

        self.state = RunState::Draining;
        debug!("End of stream after {} frames", frames);

        release_or_warn(source.release(), "source");
        if let Err(e) = sink.release() {
            self.state = RunState::Aborted;
            return Err(PipelineError::FrameWrite {
                frame: frames,
                source: e.into(),
            });
        }

        self.state = RunState::Done;
        Ok(RunSummary {
            frames,
            tally: self.counter.snapshot(),
        })
    }

    /// Route one frame's detections and paint the overlays, in fixed
    /// order: divider, then eligible boxes and labels, then the tally.
    ///
    /// A detection is eligible when its class is in the registry and its
    /// box center is on the configured lane side. Admission additionally
    /// requires a present track id, but drawing does not depend on the
    /// admission outcome.
    fn process_frame(
        &mut self,
        frame: &mut Mat,
        geometry: FrameGeometry,
        detections: &[Detection],
    ) -> Result<()> {
        annotator::draw_divider(frame, geometry)?;

        for detection in detections {
            let Some(class) = VehicleClass::from_class_id(detection.class_id) else {
                continue;
            };

            let (x1, _, x2, _) = detection.corners();
            if lane_classifier::side_of(x1, x2, geometry.width) != self.lane_side {
                continue;
            }

            if let Some(track_id) = detection.track_id {
                self.counter.admit(track_id, class);
            }

            annotator::draw_detection(frame, detection, class)?;
        }

        annotator::draw_tally(frame, &self.counter.snapshot())?;
        Ok(())
    }

    fn abort<S, K>(&mut self, mut source: S, mut sink: K, err: PipelineError) -> PipelineError
    where
        S: FrameSource,
        K: FrameSink,
    {
        self.state = RunState::Aborted;
        release_or_warn(source.release(), "source");
        release_or_warn(sink.release(), "sink");
        err
    }
}

fn release_or_warn(result: Result<()>, what: &str) {
    if let Err(e) = result {
        warn!("Failed to release frame {}: {:#}", what, e);
    }
}
