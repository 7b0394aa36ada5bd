//! Per-frame composition of the two views into the selected layout.

use tracing::trace;

use crate::backend::{
    Backend, DrawBuffer, DrawParams, RenderState, TextureId, LEFT_UNIT, MASK_UNIT, RIGHT_UNIT,
};
use crate::error::StereoError;
use crate::layout;
use crate::masks::MaskTextures;
use crate::parity::is_even;
use crate::mode::{Layout, Mode, RequiredEyes};
use crate::programs::{ProgramKey, ShaderVariantCache};
use crate::template::ProgramTemplate;
use crate::types::{Crosstalk, Eye, SessionSettings, Viewport};

/// The eye a single-eye mode shows this frame, before any swap.
fn shown_eye(mode: Mode, counter: u64) -> Option<Eye> {
    match mode.required_eyes() {
        RequiredEyes::Both => None,
        RequiredEyes::Only(eye) => Some(eye),
        RequiredEyes::Alternating => Some(if is_even(counter) {
            Eye::Left
        } else {
            Eye::Right
        }),
    }
}

/// Whether the host has to render `eye` this frame.
pub fn is_view_required(mode: Mode, swap_views: bool, eye: Eye, counter: u64) -> bool {
    match shown_eye(mode, counter) {
        None => true,
        Some(shown) if swap_views => eye == shown.other(),
        Some(shown) => eye == shown,
    }
}

/// Which interleave parity corrections apply for a viewport at `screen_origin`.
///
/// Rows swap when `(screen_y + viewport_y)` is even, columns when
/// `(screen_x + viewport_x)` is odd. Remainders keep their sign, so negative
/// odd positions never trigger the column rule.
pub fn parity_swaps(mode: Mode, screen_origin: (i32, i32), viewport: Viewport) -> (bool, bool) {
    let entry = mode.entry();
    let row = entry.row_parity && (screen_origin.1 as i64 + viewport.y as i64) % 2 == 0;
    let column = entry.column_parity && (screen_origin.0 as i64 + viewport.x as i64) % 2 == 1;
    (row, column)
}

/// Textures to bind as the (left, right) inputs, or `None` when neither view
/// is present.
///
/// A single present texture is used for both inputs. The swap flag and the
/// interleave parity corrections are applied on top, each one independently
/// exchanging the two inputs.
pub fn assign_views(
    textures: [Option<TextureId>; 2],
    swap_views: bool,
    mode: Mode,
    screen_origin: (i32, i32),
    viewport: Viewport,
) -> Option<(TextureId, TextureId)> {
    let mut left = if textures[0].is_none() { 1 } else { 0 };
    let mut right = if left == 0 { 1 } else { 0 };
    if textures[right].is_none() {
        right = left;
    }

    let (row_swap, column_swap) = parity_swaps(mode, screen_origin, viewport);
    for exchange in [swap_views, row_swap, column_swap] {
        if exchange {
            std::mem::swap(&mut left, &mut right);
        }
    }
    Some((textures[left]?, textures[right]?))
}

/// Draws view textures into the current viewport using a mode's layout.
#[derive(Debug)]
pub struct ModeCompositor {
    programs: ShaderVariantCache,
    masks: MaskTextures,
    screen_origin: (i32, i32),
    crosstalk: Crosstalk,
    ghostbust: f32,
    parallax_adjust: f32,
}

impl ModeCompositor {
    pub fn new(template: ProgramTemplate, settings: &SessionSettings) -> Self {
        Self {
            programs: ShaderVariantCache::new(template, settings.program_cache_capacity),
            masks: MaskTextures::default(),
            screen_origin: settings.screen_origin,
            crosstalk: settings.crosstalk,
            ghostbust: settings.ghostbust,
            parallax_adjust: settings.parallax_adjust,
        }
    }

    pub fn programs(&self) -> &ShaderVariantCache {
        &self.programs
    }

    pub fn programs_mut(&mut self) -> &mut ShaderVariantCache {
        &mut self.programs
    }

    pub fn screen_origin(&self) -> (i32, i32) {
        self.screen_origin
    }

    pub fn set_screen_origin(&mut self, x: i32, y: i32) {
        self.screen_origin = (x, y);
    }

    pub fn crosstalk(&self) -> (Crosstalk, f32) {
        (self.crosstalk, self.ghostbust)
    }

    pub fn set_crosstalk(&mut self, crosstalk: Crosstalk, ghostbust: f32) {
        self.crosstalk = crosstalk;
        self.ghostbust = ghostbust;
    }

    pub fn parallax_adjust(&self) -> f32 {
        self.parallax_adjust
    }

    pub fn set_parallax_adjust(&mut self, value: f32) {
        self.parallax_adjust = value;
    }

    /// Composites `textures` (left, right) for `mode`. The backend's render
    /// state is restored before returning, on success and on error.
    pub fn draw<B: Backend>(
        &mut self,
        backend: &mut B,
        mode: Mode,
        swap_views: bool,
        textures: [Option<TextureId>; 2],
        counter: u64,
    ) -> Result<(), StereoError> {
        let saved = backend.state();
        let result = self.draw_layout(backend, &saved, mode, swap_views, textures, counter);
        backend.restore(&saved);
        result
    }

    fn draw_layout<B: Backend>(
        &mut self,
        backend: &mut B,
        saved: &RenderState,
        mode: Mode,
        swap_views: bool,
        textures: [Option<TextureId>; 2],
        counter: u64,
    ) -> Result<(), StereoError> {
        let viewport = saved.viewport;
        let Some((left, right)) =
            assign_views(textures, swap_views, mode, self.screen_origin, viewport)
        else {
            return backend.clear(viewport);
        };

        let entry = mode.entry();
        let ghostbust = self.ghostbust > 0.0;
        let program = self.programs.get(backend, ProgramKey::new(mode, ghostbust))?;
        let mask = match entry.mask {
            Some(pattern) => Some(self.masks.get(backend, pattern)?),
            None => None,
        };

        backend.use_program(Some(program));
        backend.bind_texture(LEFT_UNIT, Some(left));
        backend.bind_texture(RIGHT_UNIT, Some(right));
        let mut params = DrawParams {
            channel: 0.0,
            parallax_adjust: self.parallax_adjust,
            crosstalk: if entry.crosstalk && ghostbust {
                self.crosstalk.scaled(self.ghostbust)
            } else {
                [0.0; 3]
            },
            mask_step: [0.0; 2],
        };
        if let Some(mask) = mask {
            backend.bind_texture(MASK_UNIT, Some(mask));
            params.mask_step = [1.0 / viewport.width as f32, 1.0 / viewport.height as f32];
        }
        trace!(%mode, %viewport, %left, %right, "compositing views");

        match entry.layout {
            Layout::QuadBuffer => {
                backend.set_draw_buffer(DrawBuffer::BackLeft);
                backend.draw(&params)?;
                params.channel = Eye::Right.channel();
                backend.set_draw_buffer(DrawBuffer::BackRight);
                backend.draw(&params)?;
            }
            Layout::Combined => backend.draw(&params)?,
            Layout::SingleEye => {
                let eye = shown_eye(mode, counter).unwrap_or(Eye::Left);
                params.channel = eye.channel();
                backend.draw(&params)?;
            }
            Layout::SideBySide => {
                let (left_half, right_half) = layout::side_by_side(viewport);
                draw_pair(backend, &mut params, left_half, right_half)?;
            }
            Layout::TopBottom => {
                let (top, bottom) = layout::top_bottom(viewport);
                draw_pair(backend, &mut params, top, bottom)?;
            }
            Layout::HdmiFramePack => {
                let packing = layout::frame_packing(viewport);
                backend.set_viewport(packing.blank);
                backend.clear(packing.blank)?;
                draw_pair(backend, &mut params, packing.left, packing.right)?;
            }
        }
        Ok(())
    }

    pub fn release<B: Backend>(&mut self, backend: &mut B) {
        self.programs.release(backend);
        self.masks.release(backend);
    }
}

/// Left view into `first`, right view into `second`.
fn draw_pair<B: Backend>(
    backend: &mut B,
    params: &mut DrawParams,
    first: Viewport,
    second: Viewport,
) -> Result<(), StereoError> {
    backend.set_viewport(first);
    params.channel = Eye::Left.channel();
    backend.draw(params)?;
    backend.set_viewport(second);
    params.channel = Eye::Right.channel();
    backend.draw(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    fn ids(backend: &mut RecordingBackend) -> (TextureId, TextureId) {
        (backend.import_texture(4, 4), backend.import_texture(4, 4))
    }

    #[test]
    fn mono_requires_one_eye_and_swap_flips_it() {
        assert!(is_view_required(Mode::MonoLeft, false, Eye::Left, 0));
        assert!(!is_view_required(Mode::MonoLeft, false, Eye::Right, 0));
        assert!(is_view_required(Mode::MonoLeft, true, Eye::Right, 0));
        assert!(is_view_required(Mode::MonoRight, false, Eye::Right, 3));
        assert!(is_view_required(Mode::MonoRight, true, Eye::Left, 3));
    }

    #[test]
    fn alternating_requires_exactly_one_eye_per_frame() {
        for counter in 0..6 {
            for swap in [false, true] {
                let required: Vec<Eye> = Eye::BOTH
                    .into_iter()
                    .filter(|eye| is_view_required(Mode::Alternating, swap, *eye, counter))
                    .collect();
                assert_eq!(required.len(), 1);
                let expected = if (counter % 2 == 0) != swap {
                    Eye::Left
                } else {
                    Eye::Right
                };
                assert_eq!(required[0], expected);
            }
        }
    }

    #[test]
    fn both_eyes_required_for_combined_modes() {
        for mode in [Mode::QuadBuffer, Mode::LeftRight, Mode::Checkerboard, Mode::RedCyanDubois] {
            for eye in Eye::BOTH {
                assert!(is_view_required(mode, true, eye, 1));
            }
        }
    }

    #[test]
    fn single_texture_fills_both_inputs() {
        let mut backend = RecordingBackend::new(4, 4);
        let (a, b) = ids(&mut backend);
        let full = Viewport::full(4, 4);
        assert_eq!(assign_views([Some(a), None], false, Mode::LeftRight, (0, 0), full), Some((a, a)));
        assert_eq!(assign_views([None, Some(b)], true, Mode::LeftRight, (0, 0), full), Some((b, b)));
        assert_eq!(assign_views([None, None], false, Mode::LeftRight, (0, 0), full), None);
        assert_eq!(assign_views([Some(a), Some(b)], true, Mode::LeftRight, (0, 0), full), Some((b, a)));
    }

    #[test]
    fn row_rule_follows_absolute_row_parity() {
        let mut backend = RecordingBackend::new(4, 4);
        let (a, b) = ids(&mut backend);
        let at_origin = Viewport::full(4, 4);
        // origin y = 1, viewport y = 0: odd, no swap
        assert_eq!(parity_swaps(Mode::EvenOddRows, (0, 1), at_origin), (false, false));
        assert_eq!(
            assign_views([Some(a), Some(b)], false, Mode::EvenOddRows, (0, 1), at_origin),
            Some((a, b))
        );
        assert_eq!(
            assign_views([Some(a), Some(b)], false, Mode::EvenOddRows, (0, 1), Viewport::new(0, 1, 4, 4)),
            Some((b, a))
        );
    }

    #[test]
    fn checkerboard_at_origin_swaps_once() {
        let mut backend = RecordingBackend::new(4, 4);
        let (a, b) = ids(&mut backend);
        let full = Viewport::full(4, 4);
        assert_eq!(parity_swaps(Mode::Checkerboard, (0, 0), full), (true, false));
        assert_eq!(
            assign_views([Some(a), Some(b)], false, Mode::Checkerboard, (0, 0), full),
            Some((b, a))
        );
        // both rules fire at (1, 0) and cancel out
        assert_eq!(parity_swaps(Mode::Checkerboard, (1, 0), full), (true, true));
        assert_eq!(
            assign_views([Some(a), Some(b)], false, Mode::Checkerboard, (1, 0), full),
            Some((a, b))
        );
    }

    #[test]
    fn column_rule_ignores_negative_odd_positions() {
        assert_eq!(
            parity_swaps(Mode::EvenOddColumns, (-1, 0), Viewport::full(4, 4)),
            (false, false)
        );
        assert_eq!(
            parity_swaps(Mode::EvenOddColumns, (3, 0), Viewport::full(4, 4)),
            (false, true)
        );
    }
}
