// src/annotator.rs

use crate::counter::TallySnapshot;
use crate::types::{Detection, FrameGeometry};
use crate::vehicle_classes::VehicleClass;
use anyhow::Result;
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc,
};

// Overlay palette (BGR)
const DIVIDER_COLOR: (f64, f64, f64) = (0.0, 255.0, 255.0); // yellow
const ACTIVE_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0); // green
const COUNT_COLOR: (f64, f64, f64) = (255.0, 0.0, 0.0); // blue
const TOTAL_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0); // red

const STROKE_WIDTH: i32 = 2;

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Vertical lane divider at the frame midline, spanning the full height.
pub fn draw_divider(frame: &mut Mat, geometry: FrameGeometry) -> Result<()> {
    let mid_x = geometry.mid_x();
    imgproc::line(
        frame,
        Point::new(mid_x, 0),
        Point::new(mid_x, geometry.height),
        scalar(DIVIDER_COLOR),
        STROKE_WIDTH,
        imgproc::LINE_8,
        0,
    )?;
    Ok(())
}

/// Bounding box plus `ID:{id} {label}` text just above the top-left corner.
/// The label position is not clamped; near the frame top it runs off-frame,
/// which OpenCV clips silently. A detection without a track id gets the
/// class label alone.
pub fn draw_detection(frame: &mut Mat, detection: &Detection, class: VehicleClass) -> Result<()> {
    let (x1, y1, x2, y2) = detection.corners();

    imgproc::rectangle(
        frame,
        Rect::new(x1, y1, x2 - x1, y2 - y1),
        scalar(ACTIVE_COLOR),
        STROKE_WIDTH,
        imgproc::LINE_8,
        0,
    )?;

    let text = match detection.track_id {
        Some(id) => format!("ID:{} {}", id, class.label()),
        None => class.label().to_string(),
    };
    imgproc::put_text(
        frame,
        &text,
        Point::new(x1, y1 - 10),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.6,
        scalar(ACTIVE_COLOR),
        STROKE_WIDTH,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

/// The five fixed-position count overlays: one row per vehicle class, then
/// the derived total below them.
pub fn draw_tally(frame: &mut Mat, tally: &TallySnapshot) -> Result<()> {
    let mut y = 40;
    for class in VehicleClass::ALL {
        imgproc::put_text(
            frame,
            &format!("{}: {}", class.display_name(), tally.get(class)),
            Point::new(20, y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.7,
            scalar(COUNT_COLOR),
            STROKE_WIDTH,
            imgproc::LINE_8,
            false,
        )?;
        y += 30;
    }

    imgproc::put_text(
        frame,
        &format!("Total: {}", tally.total()),
        Point::new(20, 170),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.8,
        scalar(TOTAL_COLOR),
        STROKE_WIDTH,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{CV_8UC3, Vec3b};
    use opencv::prelude::*;

    fn blank_frame(width: i32, height: i32) -> Mat {
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    #[test]
    fn test_divider_painted_at_midline() {
        let geometry = FrameGeometry {
            width: 640,
            height: 360,
            fps: 30.0,
        };
        let mut frame = blank_frame(geometry.width, geometry.height);
        draw_divider(&mut frame, geometry).unwrap();

        let px: &Vec3b = frame.at_2d(180, 320).unwrap();
        assert_eq!((px[0], px[1], px[2]), (0, 255, 255));

        // Away from the divider the frame is untouched
        let px: &Vec3b = frame.at_2d(180, 100).unwrap();
        assert_eq!((px[0], px[1], px[2]), (0, 0, 0));
    }

    #[test]
    fn test_detection_box_painted() {
        let mut frame = blank_frame(640, 360);
        let detection = Detection {
            bbox: [100.0, 100.0, 200.0, 200.0],
            confidence: 0.9,
            class_id: 2,
            track_id: Some(5),
        };
        draw_detection(&mut frame, &detection, VehicleClass::Car).unwrap();

        // Box edge is green
        let px: &Vec3b = frame.at_2d(150, 100).unwrap();
        assert_eq!((px[0], px[1], px[2]), (0, 255, 0));
    }

    #[test]
    fn test_label_near_frame_top_does_not_fail() {
        // y1 - 10 is negative here; placement is unclamped and must be a
        // silent clip, not an error.
        let mut frame = blank_frame(640, 360);
        let detection = Detection {
            bbox: [10.0, 4.0, 80.0, 60.0],
            confidence: 0.9,
            class_id: 7,
            track_id: None,
        };
        draw_detection(&mut frame, &detection, VehicleClass::Truck).unwrap();
    }

    #[test]
    fn test_tally_overlay_does_not_fail() {
        let mut frame = blank_frame(640, 360);
        let tally = TallySnapshot {
            car: 3,
            bicycle: 1,
            motorcycle: 0,
            truck: 12,
        };
        draw_tally(&mut frame, &tally).unwrap();
    }
}
