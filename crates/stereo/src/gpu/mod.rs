//! wgpu implementation of the compositor's rendering backend.
//!
//! - `context` requests a headless adapter and device for hosts that do not
//!   bring their own.
//! - `textures` allocates view, mask, and placeholder textures with the
//!   samplers each kind needs.
//! - `pipeline` builds the shared layouts, the fullscreen vertex stage, the
//!   black fill used for clears, and one render pipeline per composition
//!   program.
//! - `uniforms` mirrors the `CompositeParams` block; every draw uploads its
//!   own copy through a staging buffer so passes in one encoder never share
//!   values.
//! - `backend` tracks the immediate-mode state and records passes.

mod backend;
mod context;
mod pipeline;
mod textures;
mod uniforms;

pub use backend::WgpuBackend;
pub use context::{GpuContext, GpuPowerPreference};
