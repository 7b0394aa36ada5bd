use thiserror::Error;

use crate::backend::TextureId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StereoError {
    #[error("failed to allocate {what}: {reason}")]
    ResourceAllocation { what: &'static str, reason: String },
    #[error("composition program failed to compile:\n{log}")]
    ShaderCompile { log: String },
    #[error("composition program failed to link:\n{log}")]
    ShaderLink { log: String },
    /// A composition program failed earlier; the session no longer draws.
    #[error("stereo output unavailable after program failure:\n{log}")]
    Unavailable { log: String },
    #[error("invalid program template: {0}")]
    Template(String),
    #[error("no read target is bound for view capture")]
    MissingReadTarget,
    #[error("draw issued with no composition program bound")]
    MissingProgram,
    #[error("draw buffer {0} has no render target bound")]
    MissingDrawTarget(&'static str),
    #[error("texture {0} is not known to the backend")]
    UnknownTexture(TextureId),
    #[error("unsupported texture: {0}")]
    UnsupportedFormat(String),
    #[error("texture readback failed: {0}")]
    Readback(String),
}

impl StereoError {
    pub(crate) fn allocation(what: &'static str, reason: impl Into<String>) -> Self {
        Self::ResourceAllocation {
            what,
            reason: reason.into(),
        }
    }

    /// Diagnostic log carried by program failures.
    pub fn shader_log(&self) -> Option<&str> {
        match self {
            Self::ShaderCompile { log } | Self::ShaderLink { log } | Self::Unavailable { log } => {
                Some(log)
            }
            _ => None,
        }
    }
}
