use tracing::debug;

use crate::backend::{Backend, TextureId};
use crate::compositor::{self, ModeCompositor};
use crate::error::StereoError;
use crate::mode::Mode;
use crate::parity::{FrameParity, VsyncCounter};
use crate::programs::ShaderVariantCache;
use crate::sync_marker;
use crate::template::ProgramTemplate;
use crate::types::{Crosstalk, Eye, SessionSettings};
use crate::views::ViewTextureCache;

/// Long-lived stereo state bound to one rendering backend.
///
/// A frame looks like:
///
/// ```text
///   begin_frame()
///   for eye in [Left, Right]:
///       if is_view_required(mode, swap, eye):
///           render the eye's scene into the read target
///           submit_view(eye)
///   draw_submitted_views(mode, swap)
///   draw_sync_marker(mode)            (optional)
/// ```
///
/// Dropping the session releases the view textures, masks, and programs it
/// created.
#[derive(Debug)]
pub struct Session<B: Backend> {
    backend: B,
    views: ViewTextureCache,
    compositor: ModeCompositor,
    parity: FrameParity,
    marker_row: Vec<u32>,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, SessionSettings::default())
    }

    pub fn with_settings(backend: B, settings: SessionSettings) -> Self {
        Self::with_template(backend, settings, ProgramTemplate::builtin())
    }

    pub fn with_template(backend: B, settings: SessionSettings, template: ProgramTemplate) -> Self {
        debug!(
            capacity = settings.program_cache_capacity,
            builtin_template = template.is_builtin(),
            "creating stereo session"
        );
        Self {
            backend,
            views: ViewTextureCache::new(),
            compositor: ModeCompositor::new(template, &settings),
            parity: FrameParity::new(),
            marker_row: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Uses a hardware retrace counter for frame parity instead of counting
    /// `begin_frame` calls.
    pub fn set_vsync_counter(&mut self, counter: Option<Box<dyn VsyncCounter>>) {
        self.parity.set_vsync_counter(counter);
    }

    pub fn frame_counter(&self) -> u64 {
        self.parity.value()
    }

    /// Starts a frame: forgets last frame's submissions and advances parity.
    pub fn begin_frame(&mut self) {
        self.views.reset();
        self.parity.advance();
    }

    pub fn is_view_required(&self, mode: Mode, swap_views: bool, eye: Eye) -> bool {
        compositor::is_view_required(mode, swap_views, eye, self.parity.value())
    }

    /// Captures the current viewport of the read target as `eye`'s view.
    pub fn submit_view(&mut self, eye: Eye) -> Result<TextureId, StereoError> {
        let region = self.backend.state().viewport;
        self.views.capture(&mut self.backend, eye, region)
    }

    pub fn is_view_submitted(&self, eye: Eye) -> bool {
        self.views.is_submitted(eye)
    }

    /// Composites whatever views were submitted this frame.
    pub fn draw_submitted_views(&mut self, mode: Mode, swap_views: bool) -> Result<(), StereoError> {
        let textures = [
            self.views.submitted(Eye::Left),
            self.views.submitted(Eye::Right),
        ];
        self.draw_views(mode, swap_views, textures[0], textures[1])
    }

    /// Composites caller-provided view textures. Either may be absent; with
    /// neither present the viewport is cleared.
    pub fn draw_views(
        &mut self,
        mode: Mode,
        swap_views: bool,
        left: Option<TextureId>,
        right: Option<TextureId>,
    ) -> Result<(), StereoError> {
        let counter = self.parity.value();
        self.compositor
            .draw(&mut self.backend, mode, swap_views, [left, right], counter)
    }

    /// Paints the DLP 3-D Ready marker for `mode`. Returns whether anything was
    /// drawn.
    pub fn draw_sync_marker(&mut self, mode: Mode) -> Result<bool, StereoError> {
        let counter = self.parity.value();
        sync_marker::draw(&mut self.backend, &mut self.marker_row, mode, counter)
    }

    /// Screen position of the framebuffer origin; feeds the interleave parity.
    pub fn set_viewport_screen_origin(&mut self, x: i32, y: i32) {
        self.compositor.set_screen_origin(x, y);
    }

    pub fn set_crosstalk_ghostbust(&mut self, crosstalk: Crosstalk, ghostbust: f32) {
        self.compositor.set_crosstalk(crosstalk, ghostbust);
    }

    pub fn set_parallax_adjust(&mut self, value: f32) {
        self.compositor.set_parallax_adjust(value);
    }

    pub fn set_program_cache_capacity(&mut self, capacity: usize) {
        self.compositor
            .programs_mut()
            .set_capacity(&mut self.backend, capacity);
    }

    pub fn programs(&self) -> &ShaderVariantCache {
        self.compositor.programs()
    }

    /// Set once a composition program failed; every later draw reports it.
    pub fn is_unavailable(&self) -> bool {
        self.compositor.programs().failure().is_some()
    }

    /// Destroys every texture and program the session created. The session
    /// stays usable and recreates them on demand.
    pub fn release_resources(&mut self) {
        self.views.release(&mut self.backend);
        self.compositor.release(&mut self.backend);
    }
}

impl<B: Backend> Drop for Session<B> {
    fn drop(&mut self) {
        self.release_resources();
    }
}
