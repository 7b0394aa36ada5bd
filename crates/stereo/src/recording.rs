//! Device-free backend that records every command it receives.
//!
//! Useful for tests, dry runs, and inspecting what the compositor would issue
//! for a given mode and viewport without a GPU.

use std::fmt;

use crate::backend::{
    Arena, Backend, CompiledProgram, DrawBuffer, DrawParams, ProgramId, RenderState, TextureId,
};
use crate::error::StereoError;
use crate::mode::MaskPattern;
use crate::types::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    View { width: u32, height: u32 },
    Mask(MaskPattern),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTexture {
        texture: TextureId,
        kind: TextureKind,
    },
    DestroyTexture(TextureId),
    CopyReadTarget {
        texture: TextureId,
        region: Viewport,
    },
    CompileProgram {
        program: ProgramId,
        label: String,
    },
    DestroyProgram(ProgramId),
    SetViewport(Viewport),
    SetDrawBuffer(DrawBuffer),
    UseProgram(Option<ProgramId>),
    BindTexture {
        unit: u32,
        texture: Option<TextureId>,
    },
    Draw {
        state: RenderState,
        params: DrawParams,
    },
    Clear {
        region: Viewport,
        draw_buffer: DrawBuffer,
    },
    WriteRow {
        row: u32,
        pixels: Vec<u32>,
    },
    Restore(RenderState),
}

fn binding_name(texture: Option<TextureId>) -> String {
    texture.map_or_else(|| "-".to_string(), |texture| texture.to_string())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CreateTexture { texture, kind } => match kind {
                TextureKind::View { width, height } => {
                    write!(f, "create {texture} view {width}x{height}")
                }
                TextureKind::Mask(pattern) => write!(f, "create {texture} mask {pattern:?}"),
            },
            Command::DestroyTexture(texture) => write!(f, "destroy {texture}"),
            Command::CopyReadTarget { texture, region } => {
                write!(f, "copy read target {region} -> {texture}")
            }
            Command::CompileProgram { program, label } => write!(f, "compile {program} ({label})"),
            Command::DestroyProgram(program) => write!(f, "destroy {program}"),
            Command::SetViewport(viewport) => write!(f, "viewport {viewport}"),
            Command::SetDrawBuffer(buffer) => write!(f, "draw buffer {buffer}"),
            Command::UseProgram(program) => match program {
                Some(program) => write!(f, "use {program}"),
                None => f.write_str("use none"),
            },
            Command::BindTexture { unit, texture } => {
                write!(f, "bind unit {unit} <- {}", binding_name(*texture))
            }
            Command::Draw { state, params } => write!(
                f,
                "draw {} into {} [{} | {} | {}] channel={} crosstalk={:?} step={:?}",
                state.viewport,
                state.draw_buffer,
                binding_name(state.bindings[0]),
                binding_name(state.bindings[1]),
                binding_name(state.bindings[2]),
                params.channel,
                params.crosstalk,
                params.mask_step,
            ),
            Command::Clear {
                region,
                draw_buffer,
            } => write!(f, "clear {region} in {draw_buffer}"),
            Command::WriteRow { row, pixels } => {
                let color = pixels.first().copied().unwrap_or_default();
                write!(f, "row {row} x{} = #{color:06x}", pixels.len())
            }
            Command::Restore(state) => write!(
                f,
                "restore viewport {} unit {} draw buffer {}",
                state.viewport, state.active_unit, state.draw_buffer
            ),
        }
    }
}

/// How the next program compilations should turn out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CompileOutcome {
    #[default]
    Succeed,
    SucceedWithWarning(String),
    FailCompile(String),
    FailLink(String),
}

#[derive(Debug)]
pub struct RecordingBackend {
    state: RenderState,
    commands: Vec<Command>,
    textures: Arena<TextureKind>,
    programs: Arena<String>,
    compile_count: u64,
    compile_outcome: CompileOutcome,
    fail_allocations: bool,
    has_read_target: bool,
    has_right_buffer: bool,
}

impl RecordingBackend {
    /// A backend whose initial viewport covers a `width` x `height` framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: RenderState {
                viewport: Viewport::full(width, height),
                ..RenderState::default()
            },
            commands: Vec::new(),
            textures: Arena::default(),
            programs: Arena::default(),
            compile_count: 0,
            compile_outcome: CompileOutcome::Succeed,
            fail_allocations: false,
            has_read_target: true,
            has_right_buffer: true,
        }
    }

    pub fn with_state(mut self, state: RenderState) -> Self {
        self.state = state;
        self
    }

    pub fn set_compile_outcome(&mut self, outcome: CompileOutcome) {
        self.compile_outcome = outcome;
    }

    pub fn set_fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    pub fn set_read_target(&mut self, present: bool) {
        self.has_read_target = present;
    }

    /// Without a right back buffer, draws into [`DrawBuffer::BackRight`] fail.
    pub fn set_right_buffer(&mut self, present: bool) {
        self.has_right_buffer = present;
    }

    /// Registers a host-owned texture, e.g. one rendered outside the session
    /// and handed to `draw_views`.
    pub fn import_texture(&mut self, width: u32, height: u32) -> TextureId {
        TextureId(self.textures.insert(TextureKind::View { width, height }))
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Number of programs compiled over the backend's lifetime.
    pub fn compile_count(&self) -> u64 {
        self.compile_count
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn texture_kind(&self, texture: TextureId) -> Option<TextureKind> {
        self.textures.get(texture.0).copied()
    }

    /// Draw commands only, in issue order.
    pub fn draws(&self) -> impl Iterator<Item = (&RenderState, &DrawParams)> {
        self.commands.iter().filter_map(|command| match command {
            Command::Draw { state, params } => Some((state, params)),
            _ => None,
        })
    }

    fn allocate(&mut self, kind: TextureKind) -> Result<TextureId, StereoError> {
        if self.fail_allocations {
            return Err(StereoError::allocation("texture", "allocation disabled"));
        }
        let texture = TextureId(self.textures.insert(kind));
        self.commands.push(Command::CreateTexture { texture, kind });
        Ok(texture)
    }

    fn check_draw_target(&self) -> Result<(), StereoError> {
        if self.state.draw_buffer == DrawBuffer::BackRight && !self.has_right_buffer {
            return Err(StereoError::MissingDrawTarget(DrawBuffer::BackRight.name()));
        }
        Ok(())
    }

    fn check_texture(&self, texture: TextureId) -> Result<(), StereoError> {
        self.textures
            .get(texture.0)
            .map(|_| ())
            .ok_or(StereoError::UnknownTexture(texture))
    }
}

impl Backend for RecordingBackend {
    fn state(&self) -> RenderState {
        self.state
    }

    fn restore(&mut self, state: &RenderState) {
        self.state = *state;
        self.commands.push(Command::Restore(*state));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
        self.commands.push(Command::SetViewport(viewport));
    }

    fn set_draw_buffer(&mut self, buffer: DrawBuffer) {
        self.state.draw_buffer = buffer;
        self.commands.push(Command::SetDrawBuffer(buffer));
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.state.program = program;
        self.commands.push(Command::UseProgram(program));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.state.active_unit = unit;
        if let Some(slot) = self.state.bindings.get_mut(unit as usize) {
            *slot = texture;
        }
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn create_view_texture(&mut self, width: u32, height: u32) -> Result<TextureId, StereoError> {
        self.allocate(TextureKind::View { width, height })
    }

    fn create_mask_texture(&mut self, pattern: MaskPattern) -> Result<TextureId, StereoError> {
        self.allocate(TextureKind::Mask(pattern))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture.0).is_some() {
            self.commands.push(Command::DestroyTexture(texture));
        }
    }

    fn copy_read_target(
        &mut self,
        texture: TextureId,
        region: Viewport,
    ) -> Result<(), StereoError> {
        if !self.has_read_target {
            return Err(StereoError::MissingReadTarget);
        }
        self.check_texture(texture)?;
        self.commands.push(Command::CopyReadTarget { texture, region });
        Ok(())
    }

    fn compile_program(
        &mut self,
        label: &str,
        _source: &str,
    ) -> Result<CompiledProgram, StereoError> {
        self.compile_count += 1;
        let diagnostic = match &self.compile_outcome {
            CompileOutcome::Succeed => None,
            CompileOutcome::SucceedWithWarning(log) => Some(log.clone()),
            CompileOutcome::FailCompile(log) => {
                return Err(StereoError::ShaderCompile { log: log.clone() })
            }
            CompileOutcome::FailLink(log) => {
                return Err(StereoError::ShaderLink { log: log.clone() })
            }
        };
        let program = ProgramId(self.programs.insert(label.to_string()));
        self.commands.push(Command::CompileProgram {
            program,
            label: label.to_string(),
        });
        Ok(CompiledProgram {
            id: program,
            diagnostic,
        })
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if self.programs.remove(program.0).is_some() {
            self.commands.push(Command::DestroyProgram(program));
        }
    }

    fn draw(&mut self, params: &DrawParams) -> Result<(), StereoError> {
        if self.state.program.is_none() {
            return Err(StereoError::MissingProgram);
        }
        self.check_draw_target()?;
        for texture in self.state.bindings.iter().flatten() {
            self.check_texture(*texture)?;
        }
        self.commands.push(Command::Draw {
            state: self.state,
            params: *params,
        });
        Ok(())
    }

    fn clear(&mut self, region: Viewport) -> Result<(), StereoError> {
        self.check_draw_target()?;
        self.commands.push(Command::Clear {
            region,
            draw_buffer: self.state.draw_buffer,
        });
        Ok(())
    }

    fn write_row(&mut self, row: u32, pixels: &[u32]) -> Result<(), StereoError> {
        self.check_draw_target()?;
        self.commands.push(Command::WriteRow {
            row,
            pixels: pixels.to_vec(),
        });
        Ok(())
    }
}
