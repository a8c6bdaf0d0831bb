// src/tracker.rs
//
// Greedy IoU track-id assignment. The counting pipeline only needs the
// stable-identifier contract: the same physical object keeps the same id
// for as long as it is tracked, and ids are never reused within a run.
// Anything upholding that contract can replace this via the Tracker trait.

use crate::types::{Detection, TrackerConfig};
use crate::vehicle_detection::YoloDetector;
use anyhow::Result;
use opencv::core::Mat;
use tracing::debug;

/// Per-frame detector/tracker boundary: one blocking call per frame, a
/// detection list out. Detections carry `Some(track_id)` once the tracker
/// has associated them with a stable identity.
pub trait Tracker {
    fn track(&mut self, frame: &Mat) -> Result<Vec<Detection>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackState {
    Tentative,
    Confirmed,
}

#[derive(Debug, Clone)]
struct Track {
    id: u32,
    bbox: [f32; 4],
    class_id: u32,
    state: TrackState,
    consecutive_hits: u32,
    frames_since_hit: u32,
}

impl Track {
    fn new(id: u32, det: &Detection, min_hits_to_confirm: u32) -> Self {
        let mut track = Self {
            id,
            bbox: det.bbox,
            class_id: det.class_id,
            state: TrackState::Tentative,
            consecutive_hits: 1,
            frames_since_hit: 0,
        };
        track.maybe_confirm(min_hits_to_confirm);
        track
    }

    fn update_with_detection(&mut self, det: &Detection, min_hits_to_confirm: u32) {
        self.bbox = det.bbox;
        self.consecutive_hits += 1;
        self.frames_since_hit = 0;
        self.maybe_confirm(min_hits_to_confirm);
    }

    fn maybe_confirm(&mut self, min_hits_to_confirm: u32) {
        if self.state == TrackState::Tentative && self.consecutive_hits >= min_hits_to_confirm {
            self.state = TrackState::Confirmed;
            debug!("Track {} confirmed (class={})", self.id, self.class_id);
        }
    }

    fn mark_missed(&mut self) {
        self.frames_since_hit += 1;
        self.consecutive_hits = 0;
    }
}

/// Assigns track ids to raw detections by greedy best-IoU matching against
/// the previous frame's tracks. Matching requires class agreement; a class
/// flip on the same box starts a new track. Tentative tracks hold their id
/// back until confirmed, so their detections go out with no id.
pub struct IouTracker {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u32,
}

impl IouTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(32),
            next_id: 1,
        }
    }

    /// Process one frame of detections, filling in `track_id` for every
    /// detection whose track is confirmed.
    pub fn assign(&mut self, mut detections: Vec<Detection>) -> Vec<Detection> {
        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut det_track: Vec<Option<usize>> = vec![None; detections.len()];

        let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (di, det) in detections.iter().enumerate() {
                if det.class_id != track.class_id {
                    continue;
                }
                let score = iou(&track.bbox, &det.bbox);
                if score >= self.config.min_iou {
                    pairs.push((ti, di, score));
                }
            }
        }
        pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

        for (ti, di, _score) in pairs {
            if matched_tracks[ti] || det_track[di].is_some() {
                continue;
            }
            matched_tracks[ti] = true;
            det_track[di] = Some(ti);
            let det = detections[di].clone();
            self.tracks[ti].update_with_detection(&det, self.config.min_hits_to_confirm);
        }

        for (ti, matched) in matched_tracks.iter().enumerate() {
            if !matched {
                self.tracks[ti].mark_missed();
            }
        }

        for (di, slot) in det_track.iter_mut().enumerate() {
            if slot.is_none() {
                let track = Track::new(
                    self.next_id,
                    &detections[di],
                    self.config.min_hits_to_confirm,
                );
                debug!(
                    "New track {} (class={}, bbox=[{:.0},{:.0},{:.0},{:.0}])",
                    track.id,
                    track.class_id,
                    track.bbox[0],
                    track.bbox[1],
                    track.bbox[2],
                    track.bbox[3]
                );
                self.next_id += 1;
                self.tracks.push(track);
                *slot = Some(self.tracks.len() - 1);
            }
        }

        for (di, det) in detections.iter_mut().enumerate() {
            let track = &self.tracks[det_track[di].expect("every detection gets a track")];
            det.track_id = match track.state {
                TrackState::Confirmed => Some(track.id),
                TrackState::Tentative => None,
            };
        }

        let max_coast = self.config.max_coast_frames;
        self.tracks.retain(|t| {
            if t.frames_since_hit > max_coast {
                debug!("Track {} pruned (coasted {} frames)", t.id, t.frames_since_hit);
                return false;
            }
            true
        });

        detections
    }
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
    inter / (area_a + area_b - inter)
}

/// The production detector/tracker: YOLO detections fed through the IoU
/// id assigner, one blocking call per frame.
pub struct VehicleTracker {
    detector: YoloDetector,
    assigner: IouTracker,
}

impl VehicleTracker {
    pub fn new(detector: YoloDetector, config: TrackerConfig) -> Self {
        Self {
            detector,
            assigner: IouTracker::new(config),
        }
    }
}

impl Tracker for VehicleTracker {
    fn track(&mut self, frame: &Mat) -> Result<Vec<Detection>> {
        let detections = self.detector.detect(frame)?;
        Ok(self.assigner.assign(detections))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrackerConfig {
        TrackerConfig {
            min_iou: 0.3,
            max_coast_frames: 5,
            min_hits_to_confirm: 3,
        }
    }

    fn det(bbox: [f32; 4], class_id: u32) -> Detection {
        Detection {
            bbox,
            confidence: 0.8,
            class_id,
            track_id: None,
        }
    }

    #[test]
    fn test_id_withheld_until_confirmed() {
        let mut tracker = IouTracker::new(config());

        let out = tracker.assign(vec![det([100.0, 100.0, 200.0, 200.0], 2)]);
        assert_eq!(out[0].track_id, None);

        let out = tracker.assign(vec![det([102.0, 100.0, 202.0, 200.0], 2)]);
        assert_eq!(out[0].track_id, None);

        let out = tracker.assign(vec![det([104.0, 100.0, 204.0, 200.0], 2)]);
        assert_eq!(out[0].track_id, Some(1));
    }

    #[test]
    fn test_id_stable_across_frames() {
        let mut tracker = IouTracker::new(config());
        let mut last_id = None;

        for i in 0..10 {
            let shift = i as f32 * 3.0;
            let out = tracker.assign(vec![det([100.0 + shift, 100.0, 200.0 + shift, 200.0], 2)]);
            if let Some(id) = out[0].track_id {
                if let Some(prev) = last_id {
                    assert_eq!(id, prev, "id must stay stable while tracked");
                }
                last_id = Some(id);
            }
        }
        assert_eq!(last_id, Some(1));
    }

    #[test]
    fn test_separate_objects_get_separate_ids() {
        let mut tracker = IouTracker::new(config());

        for _ in 0..3 {
            let out = tracker.assign(vec![
                det([100.0, 100.0, 200.0, 200.0], 2),
                det([400.0, 100.0, 500.0, 200.0], 2),
            ]);
            if out[0].track_id.is_some() {
                assert_ne!(out[0].track_id, out[1].track_id);
            }
        }
    }

    #[test]
    fn test_class_flip_starts_new_track() {
        let mut tracker = IouTracker::new(config());

        for _ in 0..3 {
            tracker.assign(vec![det([100.0, 100.0, 200.0, 200.0], 2)]);
        }

        // Same box, different class: must not inherit the car's id
        let out = tracker.assign(vec![det([100.0, 100.0, 200.0, 200.0], 7)]);
        assert_eq!(out[0].track_id, None);
    }

    #[test]
    fn test_pruned_id_never_reused() {
        let mut tracker = IouTracker::new(config());

        for _ in 0..3 {
            tracker.assign(vec![det([100.0, 100.0, 200.0, 200.0], 2)]);
        }

        // Coast past the limit so track 1 is pruned
        for _ in 0..7 {
            tracker.assign(vec![]);
        }

        // A new object at the same spot confirms with a fresh id
        let mut confirmed = None;
        for _ in 0..3 {
            let out = tracker.assign(vec![det([100.0, 100.0, 200.0, 200.0], 2)]);
            confirmed = out[0].track_id;
        }
        assert_eq!(confirmed, Some(2));
    }

    #[test]
    fn test_immediate_confirmation_when_threshold_is_one() {
        let mut tracker = IouTracker::new(TrackerConfig {
            min_iou: 0.3,
            max_coast_frames: 5,
            min_hits_to_confirm: 1,
        });
        let out = tracker.assign(vec![det([100.0, 100.0, 200.0, 200.0], 2)]);
        assert_eq!(out[0].track_id, Some(1));
    }

    #[test]
    fn test_track_survives_brief_gap() {
        let mut tracker = IouTracker::new(config());

        for _ in 0..3 {
            tracker.assign(vec![det([100.0, 100.0, 200.0, 200.0], 2)]);
        }

        // Two missed frames, within max_coast_frames
        tracker.assign(vec![]);
        tracker.assign(vec![]);

        let out = tracker.assign(vec![det([105.0, 100.0, 205.0, 200.0], 2)]);
        assert_eq!(out[0].track_id, Some(1));
    }
}
