//! The rendering seam between the compositor and a GPU API.
//!
//! The compositor is written against an immediate-mode model: a current
//! viewport, an active program, a set of texture units, and a selected draw
//! buffer. Backends expose that state explicitly so the compositor can snapshot
//! it before drawing and put it back afterwards, whatever happened in between.

use std::fmt;

use crate::error::StereoError;
use crate::mode::MaskPattern;
use crate::types::Viewport;

/// Texture units used by composition programs: left view, right view, mask.
pub const TEXTURE_UNITS: usize = 3;
pub const LEFT_UNIT: u32 = 0;
pub const RIGHT_UNIT: u32 = 1;
pub const MASK_UNIT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) u32);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program#{}", self.0)
    }
}

/// Colour buffer that draws and clears land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawBuffer {
    /// The host's regular back buffer (the left one on quad-buffered targets).
    #[default]
    Back,
    BackLeft,
    BackRight,
}

impl DrawBuffer {
    pub fn name(self) -> &'static str {
        match self {
            DrawBuffer::Back => "back",
            DrawBuffer::BackLeft => "back-left",
            DrawBuffer::BackRight => "back-right",
        }
    }
}

impl fmt::Display for DrawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ambient render state the compositor promises to leave untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderState {
    pub viewport: Viewport,
    pub program: Option<ProgramId>,
    pub active_unit: u32,
    pub bindings: [Option<TextureId>; TEXTURE_UNITS],
    pub draw_buffer: DrawBuffer,
}

/// Uniform values for one composition draw.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawParams {
    /// Eye selector for single-eye programs: 0 draws the left unit, 1 the right.
    pub channel: f32,
    pub parallax_adjust: f32,
    /// Crosstalk scaled by the ghostbusting level; zero leaves colours untouched.
    pub crosstalk: [f32; 3],
    /// One pixel in texture coordinates, per axis, for the interleave masks.
    pub mask_step: [f32; 2],
}

/// A linked program plus whatever the compiler had to say about it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    pub id: ProgramId,
    pub diagnostic: Option<String>,
}

pub trait Backend {
    /// Current render state, used for the snapshot taken before each draw.
    fn state(&self) -> RenderState;
    /// Puts every field of `state` back in place.
    fn restore(&mut self, state: &RenderState);

    fn set_viewport(&mut self, viewport: Viewport);
    fn set_draw_buffer(&mut self, buffer: DrawBuffer);
    fn use_program(&mut self, program: Option<ProgramId>);
    /// Makes `unit` the active unit and binds `texture` to it.
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);

    /// Allocates an RGB view texture sampled with linear filtering and a
    /// transparent-black border.
    fn create_view_texture(&mut self, width: u32, height: u32) -> Result<TextureId, StereoError>;
    /// Uploads a 2x2 interleave mask sampled with nearest filtering and repeat
    /// wrapping.
    fn create_mask_texture(&mut self, pattern: MaskPattern) -> Result<TextureId, StereoError>;
    fn destroy_texture(&mut self, texture: TextureId);
    /// Copies `region` of the current read target into `texture` at its origin.
    fn copy_read_target(&mut self, texture: TextureId, region: Viewport)
        -> Result<(), StereoError>;

    fn compile_program(&mut self, label: &str, source: &str)
        -> Result<CompiledProgram, StereoError>;
    fn destroy_program(&mut self, program: ProgramId);

    /// Draws a viewport-filling quad with the active program and bindings.
    fn draw(&mut self, params: &DrawParams) -> Result<(), StereoError>;
    /// Clears `region` of the current draw buffer to black.
    fn clear(&mut self, region: Viewport) -> Result<(), StereoError>;
    /// Writes packed `0x00RRGGBB` pixels into one row of the current draw
    /// buffer, starting at column 0. Rows count from the bottom.
    fn write_row(&mut self, row: u32, pixels: &[u32]) -> Result<(), StereoError>;
}

/// Slot storage handing out small integer handles. Zero is never issued.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Arena<T> {
    pub fn insert(&mut self, value: T) -> u32 {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(value);
                index
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        };
        index as u32 + 1
    }

    pub fn get(&self, handle: u32) -> Option<&T> {
        let index = (handle as usize).checked_sub(1)?;
        self.slots.get(index)?.as_ref()
    }

    pub fn remove(&mut self, handle: u32) -> Option<T> {
        let index = (handle as usize).checked_sub(1)?;
        let value = self.slots.get_mut(index)?.take()?;
        self.free.push(index);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
