//! Viewport arithmetic for the spatial split layouts.
//!
//! All rectangles use bottom-left origin. Odd dimensions give the extra pixel
//! to the right view of a side-by-side split and to the top (left) view of a
//! top/bottom split.

use crate::types::Viewport;

/// Left and right halves of a side-by-side split.
pub fn side_by_side(viewport: Viewport) -> (Viewport, Viewport) {
    let half = viewport.width / 2;
    let left = Viewport {
        width: half,
        ..viewport
    };
    let right = Viewport {
        x: viewport.x + half as i32,
        width: viewport.width - half,
        ..viewport
    };
    (left, right)
}

/// Top (left view) and bottom (right view) halves of a top/bottom split.
pub fn top_bottom(viewport: Viewport) -> (Viewport, Viewport) {
    let half = viewport.height / 2;
    let top = Viewport {
        y: viewport.y + half as i32,
        height: viewport.height - half,
        ..viewport
    };
    let bottom = Viewport {
        height: half,
        ..viewport
    };
    (top, bottom)
}

/// HDMI 1.4a frame packing: both views stacked with a blank band of 1/49 of
/// the total height between them (30 lines for 720p, 45 for 1080p).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacking {
    pub left: Viewport,
    pub blank: Viewport,
    pub right: Viewport,
}

pub const FRAME_PACK_BLANK_DIVISOR: u32 = 49;

pub fn frame_packing(viewport: Viewport) -> FramePacking {
    let blank_lines = viewport.height / FRAME_PACK_BLANK_DIVISOR;
    let half = (viewport.height - blank_lines) / 2;
    let right = Viewport {
        height: half,
        ..viewport
    };
    let blank = Viewport {
        y: viewport.y + half as i32,
        height: blank_lines,
        ..viewport
    };
    let left = Viewport {
        y: viewport.y + (half + blank_lines) as i32,
        height: viewport.height - half - blank_lines,
        ..viewport
    };
    FramePacking { left, blank, right }
}
