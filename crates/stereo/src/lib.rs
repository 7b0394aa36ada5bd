//! Stereoscopic output compositor.
//!
//! A host renders each eye's scene into its framebuffer, hands the result to
//! a [`Session`], and asks for the pair to be composed into one of the
//! [`Mode`]s: quad-buffered, interleaved, anaglyph, side-by-side,
//! top/bottom, frame-packed, or page-flipped.
//!
//! ```text
//!   host frame ──▶ Session::begin_frame ──▶ FrameParity
//!        │
//!        ├─▶ submit_view(eye) ──▶ ViewTextureCache ──▶ Backend::copy_read_target
//!        │
//!        └─▶ draw_submitted_views(mode) ──▶ ModeCompositor
//!                                              ├─▶ ShaderVariantCache ─▶ Backend::compile_program
//!                                              ├─▶ interleave masks
//!                                              └─▶ Backend::draw / clear
//! ```
//!
//! Rendering goes through the [`Backend`] trait. [`WgpuBackend`] drives a wgpu
//! device; [`RecordingBackend`] records commands without a GPU and is what
//! the tests and the `stereoctl plan` command use. Every composition restores
//! the backend's viewport, program, texture bindings, and draw buffer before
//! returning, whether it succeeded or not.
//!
//! [`projection`] holds the asymmetric-frustum helpers hosts use to render
//! each eye.

pub mod backend;
pub mod compositor;
mod error;
pub mod gpu;
pub mod layout;
mod masks;
mod mode;
pub mod parity;
pub mod programs;
pub mod projection;
pub mod recording;
mod session;
pub mod sync_marker;
pub mod template;
mod types;
pub mod views;

pub use backend::{Backend, DrawBuffer, ProgramId, RenderState, TextureId};
pub use compositor::ModeCompositor;
pub use error::StereoError;
pub use gpu::{GpuContext, GpuPowerPreference, WgpuBackend};
pub use mode::{Family, MaskPattern, Mode, RequiredEyes, UnknownMode};
pub use parity::{FrameParity, VsyncCounter};
pub use programs::{ProgramKey, ShaderVariantCache};
pub use projection::{stereo_frustum, stereo_look_at, stereo_perspective, Frustum};
pub use recording::{Command, CompileOutcome, RecordingBackend};
pub use session::Session;
pub use sync_marker::SyncMarker;
pub use template::{validate_fragment, ProgramTemplate};
pub use types::{version, Crosstalk, Eye, SessionSettings, Viewport};
pub use views::ViewTextureCache;
