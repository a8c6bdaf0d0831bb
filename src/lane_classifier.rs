// src/lane_classifier.rs

use crate::types::LaneSide;

/// Which side of the vertical midline a bounding box's center falls on.
///
/// `center_x` and `mid_x` both use truncating integer division, and a
/// center exactly on the midline is Left: counting depends on this
/// tie-break, so it is fixed rather than left to rounding.
pub fn side_of(x1: i32, x2: i32, frame_width: i32) -> LaneSide {
    let center_x = (x1 + x2) / 2;
    let mid_x = frame_width / 2;

    if center_x <= mid_x {
        LaneSide::Left
    } else {
        LaneSide::Right
    }
}
