use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::StereoError;
use crate::mode::MaskPattern;

pub(crate) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    /// Created by the backend, as opposed to imported from the host.
    pub owned: bool,
}

impl GpuTexture {
    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }
}

/// Sampling setup for captured views: linear filtering, transparent-black
/// border when the device supports it.
pub(crate) fn view_sampler(device: &wgpu::Device, border: bool) -> wgpu::Sampler {
    let (address_mode, border_color) = if border {
        (
            wgpu::AddressMode::ClampToBorder,
            Some(wgpu::SamplerBorderColor::TransparentBlack),
        )
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("view sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        border_color,
        ..Default::default()
    })
}

pub(crate) fn mask_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("mask sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Runs `create` inside validation and out-of-memory error scopes and turns a
/// captured error into [`StereoError::ResourceAllocation`].
pub(crate) fn scoped_allocation<T>(
    device: &wgpu::Device,
    what: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, StereoError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    let validation = pollster::block_on(device.pop_error_scope());
    let out_of_memory = pollster::block_on(device.pop_error_scope());
    match validation.or(out_of_memory) {
        Some(error) => Err(StereoError::allocation(what, error.to_string())),
        None => Ok(value),
    }
}

pub(crate) fn create_view_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    sampler: &wgpu::Sampler,
) -> Result<GpuTexture, StereoError> {
    let max_dimension = device.limits().max_texture_dimension_2d;
    if width == 0 || height == 0 || width > max_dimension || height > max_dimension {
        return Err(StereoError::allocation(
            "view texture",
            format!("{width}x{height} is outside 1..={max_dimension}"),
        ));
    }

    let texture = scoped_allocation(device, "view texture", || {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("stereo view texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    })?;
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    Ok(GpuTexture {
        texture,
        view,
        sampler: sampler.clone(),
        owned: true,
    })
}

pub(crate) fn create_mask_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pattern: MaskPattern,
    sampler: &wgpu::Sampler,
) -> Result<GpuTexture, StereoError> {
    let texels = pattern.texels();
    let label = format!("{pattern:?} mask");
    let texture = scoped_allocation(device, "mask texture", || {
        device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label.as_str()),
                size: wgpu::Extent3d {
                    width: 2,
                    height: 2,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &texels,
        )
    })?;
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    Ok(GpuTexture {
        texture,
        view,
        sampler: sampler.clone(),
        owned: true,
    })
}

/// 1x1 black texture bound to units the current program does not sample.
pub(crate) fn create_placeholder_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    sampler: &wgpu::Sampler,
) -> GpuTexture {
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("placeholder texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &[0u8, 0, 0, 255],
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    GpuTexture {
        texture,
        view,
        sampler: sampler.clone(),
        owned: true,
    }
}

/// Wraps a host texture so it can be bound or targeted by handle.
pub(crate) fn import_texture(texture: wgpu::Texture, sampler: &wgpu::Sampler) -> GpuTexture {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        sampler: sampler.clone(),
        owned: false,
    }
}

/// Converts packed `0x00RRGGBB` pixels into the byte layout of `format`.
pub(crate) fn pack_row(
    format: wgpu::TextureFormat,
    pixels: &[u32],
    out: &mut Vec<u8>,
) -> Result<(), StereoError> {
    use wgpu::TextureFormat as F;

    out.clear();
    out.reserve(pixels.len() * 4);
    let bgra = match format {
        F::Rgba8Unorm | F::Rgba8UnormSrgb => false,
        F::Bgra8Unorm | F::Bgra8UnormSrgb => true,
        other => {
            return Err(StereoError::UnsupportedFormat(format!(
                "sync markers need an 8-bit RGBA or BGRA target, got {other:?}"
            )))
        }
    };
    for pixel in pixels {
        let [b, g, r, _] = pixel.to_le_bytes();
        if bgra {
            out.extend_from_slice(&[b, g, r, 0xff]);
        } else {
            out.extend_from_slice(&[r, g, b, 0xff]);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_rows_for_both_byte_orders() {
        let mut out = Vec::new();
        pack_row(wgpu::TextureFormat::Rgba8Unorm, &[0xff0000, 0x00ffff], &mut out).unwrap();
        assert_eq!(out, vec![0xff, 0, 0, 0xff, 0, 0xff, 0xff, 0xff]);
        pack_row(wgpu::TextureFormat::Bgra8UnormSrgb, &[0xff0000], &mut out).unwrap();
        assert_eq!(out, vec![0, 0, 0xff, 0xff]);
    }

    #[test]
    fn rejects_float_targets() {
        let mut out = Vec::new();
        let err = pack_row(wgpu::TextureFormat::Rgba16Float, &[0], &mut out).unwrap_err();
        assert!(matches!(err, StereoError::UnsupportedFormat(_)));
    }
}
