//! DLP 3-D Ready sync markers.
//!
//! Projectors supporting the scheme look for a coloured scanline at the
//! bottom of the frame (and at half height for top/bottom output) to detect
//! the stereo layout and which view is which.

use crate::backend::Backend;
use crate::error::StereoError;
use crate::mode::Mode;
use crate::parity::{is_even, quarter};
use crate::types::Viewport;

pub const RED: u32 = 0xff << 16;
pub const GREEN: u32 = 0xff << 8;
pub const BLUE: u32 = 0xff;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMarker {
    /// Packed `0x00RRGGBB` colour of the scanlines.
    pub color: u32,
    /// Rows to paint, counted from the bottom of the viewport.
    pub rows: Vec<u32>,
}

/// Marker for `mode` at frame `counter`, if the mode defines one and the
/// viewport covers the framebuffer from its origin.
pub fn marker_for(mode: Mode, counter: u64, viewport: Viewport) -> Option<SyncMarker> {
    if !viewport.at_origin() {
        return None;
    }
    let marker = match mode {
        Mode::LeftRight => SyncMarker {
            color: if is_even(counter) { RED } else { GREEN | BLUE },
            rows: vec![0],
        },
        Mode::TopBottom => SyncMarker {
            color: if is_even(counter) { BLUE } else { RED | GREEN },
            rows: vec![0, viewport.height / 2],
        },
        Mode::Alternating => SyncMarker {
            color: if quarter(counter) < 2 { GREEN } else { RED | BLUE },
            rows: vec![0],
        },
        _ => return None,
    };
    Some(marker)
}

/// Paints the marker into the current draw buffer. `scratch` holds one row of
/// pixels and is reused across frames.
pub(crate) fn draw<B: Backend>(
    backend: &mut B,
    scratch: &mut Vec<u32>,
    mode: Mode,
    counter: u64,
) -> Result<bool, StereoError> {
    let viewport = backend.state().viewport;
    let Some(marker) = marker_for(mode, counter, viewport) else {
        return Ok(false);
    };

    let width = viewport.width as usize;
    scratch.clear();
    scratch.resize(width, marker.color);
    for row in marker.rows {
        backend.write_row(row, &scratch[..width])?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Command, RecordingBackend};

    const FULL: Viewport = Viewport::full(1920, 1080);

    #[test]
    fn top_bottom_alternates_blue_and_yellow() {
        assert_eq!(
            marker_for(Mode::TopBottom, 4, FULL),
            Some(SyncMarker {
                color: BLUE,
                rows: vec![0, 540]
            })
        );
        assert_eq!(marker_for(Mode::TopBottom, 5, FULL).unwrap().color, RED | GREEN);
    }

    #[test]
    fn left_right_alternates_red_and_cyan() {
        assert_eq!(marker_for(Mode::LeftRight, 0, FULL).unwrap().color, RED);
        assert_eq!(marker_for(Mode::LeftRight, 7, FULL).unwrap().color, GREEN | BLUE);
    }

    #[test]
    fn alternating_uses_a_four_frame_cycle() {
        let colors: Vec<u32> = (0..8)
            .map(|counter| marker_for(Mode::Alternating, counter, FULL).unwrap().color)
            .collect();
        let magenta = RED | BLUE;
        assert_eq!(
            colors,
            vec![GREEN, GREEN, magenta, magenta, GREEN, GREEN, magenta, magenta]
        );
    }

    #[test]
    fn no_marker_for_other_modes_or_offset_viewports() {
        assert_eq!(marker_for(Mode::Checkerboard, 0, FULL), None);
        assert_eq!(marker_for(Mode::HdmiFramePack, 0, FULL), None);
        assert_eq!(
            marker_for(Mode::LeftRight, 0, Viewport::new(0, 10, 1920, 1070)),
            None
        );
    }

    #[test]
    fn draw_writes_full_width_rows() {
        let mut backend = RecordingBackend::new(32, 20);
        let mut scratch = Vec::new();
        assert!(draw(&mut backend, &mut scratch, Mode::TopBottom, 5).unwrap());
        let rows: Vec<_> = backend
            .commands()
            .iter()
            .filter_map(|command| match command {
                Command::WriteRow { row, pixels } => Some((*row, pixels.len(), pixels[0])),
                _ => None,
            })
            .collect();
        assert_eq!(rows, vec![(0, 32, RED | GREEN), (10, 32, RED | GREEN)]);

        assert!(!draw(&mut backend, &mut scratch, Mode::MonoLeft, 5).unwrap());
        assert!(scratch.capacity() >= 32);
    }
}
