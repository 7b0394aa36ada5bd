use bytemuck::{Pod, Zeroable};

use crate::backend::DrawParams;

/// std140 mirror of the `CompositeParams` block in the program template.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct CompositeUniforms {
    pub crosstalk: [f32; 4],
    pub mask_step: [f32; 2],
    pub channel: f32,
    pub parallax_adjust: f32,
}

impl From<&DrawParams> for CompositeUniforms {
    fn from(params: &DrawParams) -> Self {
        let [r, g, b] = params.crosstalk;
        Self {
            crosstalk: [r, g, b, 0.0],
            mask_step: params.mask_step,
            channel: params.channel,
            parallax_adjust: params.parallax_adjust,
        }
    }
}

impl CompositeUniforms {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;
}
