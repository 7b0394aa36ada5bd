use std::sync::mpsc;

use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use crate::backend::{
    Arena, Backend, CompiledProgram, DrawBuffer, DrawParams, ProgramId, RenderState, TextureId,
    TEXTURE_UNITS,
};
use crate::error::StereoError;
use crate::mode::MaskPattern;
use crate::types::Viewport;

use super::context::GpuContext;
use super::pipeline::{self, CompositePipeline, PipelineLayouts};
use super::textures::{self, GpuTexture};
use super::uniforms::CompositeUniforms;

/// Pixel rectangle in wgpu's top-left-origin space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

/// Converts a bottom-left-origin viewport into the part of a `width` by
/// `height` target it covers. `None` when nothing is visible.
fn to_pixel_rect(region: Viewport, width: u32, height: u32) -> Option<PixelRect> {
    let (width, height) = (i64::from(width), i64::from(height));
    let x0 = i64::from(region.x).clamp(0, width);
    let x1 = (i64::from(region.x) + i64::from(region.width)).clamp(0, width);
    let top = (height - (i64::from(region.y) + i64::from(region.height))).clamp(0, height);
    let bottom = (height - i64::from(region.y)).clamp(0, height);
    if x1 <= x0 || bottom <= top {
        return None;
    }
    Some(PixelRect {
        x: x0 as u32,
        y: top as u32,
        width: (x1 - x0) as u32,
        height: (bottom - top) as u32,
    })
}

/// The whole viewport in top-left-origin space, unclipped, as wgpu viewport
/// bounds. Parts outside the target are cut off by the scissor rect.
fn viewport_bounds(region: Viewport, height: u32) -> [f32; 4] {
    let top = i64::from(height) - (i64::from(region.y) + i64::from(region.height));
    [
        region.x as f32,
        top as f32,
        region.width as f32,
        region.height as f32,
    ]
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

fn same_family(a: wgpu::TextureFormat, b: wgpu::TextureFormat) -> bool {
    a.remove_srgb_suffix() == b.remove_srgb_suffix()
}

/// [`Backend`] on a wgpu device.
///
/// The host registers its framebuffer textures with [`import_texture`] and
/// selects them with [`set_read_target`] and [`set_draw_target`]. Work is
/// recorded into one command encoder and submitted on [`flush`].
///
/// A partially off-screen viewport keeps its full extent and is cropped to
/// the draw target, so the visible part matches what the whole viewport
/// would show there.
///
/// [`import_texture`]: WgpuBackend::import_texture
/// [`set_read_target`]: WgpuBackend::set_read_target
/// [`set_draw_target`]: WgpuBackend::set_draw_target
/// [`flush`]: WgpuBackend::flush
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    layouts: PipelineLayouts,
    fill_pipeline: wgpu::RenderPipeline,
    view_sampler: wgpu::Sampler,
    mask_sampler: wgpu::Sampler,
    placeholder: GpuTexture,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    textures: Arena<GpuTexture>,
    programs: Arena<CompositePipeline>,
    read_target: Option<TextureId>,
    /// Back (also back-left) and back-right.
    draw_targets: [Option<TextureId>; 2],
    state: RenderState,
    encoder: Option<wgpu::CommandEncoder>,
    row_bytes: Vec<u8>,
}

impl WgpuBackend {
    /// `format` is the format of the host's draw targets; view textures are
    /// allocated in it too.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        clamp_to_border: bool,
    ) -> Self {
        if !clamp_to_border {
            debug!("clamp-to-border sampling unavailable; view edges clamp to the last texel");
        }
        let layouts = PipelineLayouts::new(device);
        let fill_pipeline = pipeline::fill_pipeline(device, &layouts, format);
        let view_sampler = textures::view_sampler(device, clamp_to_border);
        let mask_sampler = textures::mask_sampler(device);
        let placeholder = textures::create_placeholder_texture(device, queue, &view_sampler);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("composite uniforms"),
            size: CompositeUniforms::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("composite uniform bind group"),
            layout: &layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            device: device.clone(),
            queue: queue.clone(),
            format,
            layouts,
            fill_pipeline,
            view_sampler,
            mask_sampler,
            placeholder,
            uniform_buffer,
            uniform_bind_group,
            textures: Arena::default(),
            programs: Arena::default(),
            read_target: None,
            draw_targets: [None, None],
            state: RenderState::default(),
            encoder: None,
            row_bytes: Vec::new(),
        }
    }

    pub fn from_context(context: &GpuContext, format: wgpu::TextureFormat) -> Self {
        Self::new(
            &context.device,
            &context.queue,
            format,
            context.clamp_to_border,
        )
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Registers a host texture. Destroying the handle later forgets it
    /// without destroying the texture.
    pub fn import_texture(&mut self, texture: wgpu::Texture) -> TextureId {
        TextureId(
            self.textures
                .insert(textures::import_texture(texture, &self.view_sampler)),
        )
    }

    /// Allocates a backend-owned texture usable as both read and draw target.
    pub fn create_target_texture(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<TextureId, StereoError> {
        let texture = textures::scoped_allocation(&self.device, "target texture", || {
            self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("stereo target texture"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: self.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        })?;
        let mut gpu_texture = textures::import_texture(texture, &self.view_sampler);
        gpu_texture.owned = true;
        Ok(TextureId(self.textures.insert(gpu_texture)))
    }

    /// Writes tightly packed pixels in the texture's own format, top row first.
    pub fn upload(&mut self, texture: TextureId, data: &[u8]) -> Result<(), StereoError> {
        self.flush();
        let target = self.get(texture)?;
        let (width, height) = target.size();
        let bytes_per_pixel = target.format().block_copy_size(None).unwrap_or(4);
        let expected = width as usize * height as usize * bytes_per_pixel as usize;
        if data.len() != expected {
            return Err(StereoError::UnsupportedFormat(format!(
                "upload of {} bytes into a {width}x{height} texture expecting {expected}",
                data.len()
            )));
        }
        self.queue.write_texture(
            target.texture.as_image_copy(),
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * bytes_per_pixel),
                rows_per_image: Some(height),
            },
            target.texture.size(),
        );
        Ok(())
    }

    /// Selects the texture views are captured from.
    pub fn set_read_target(&mut self, texture: Option<TextureId>) -> Result<(), StereoError> {
        if let Some(id) = texture {
            let target = self.get(id)?;
            if !target.texture.usage().contains(wgpu::TextureUsages::COPY_SRC) {
                return Err(StereoError::UnsupportedFormat(format!(
                    "read target {id} lacks COPY_SRC usage"
                )));
            }
            if !same_family(target.format(), self.format) {
                return Err(StereoError::UnsupportedFormat(format!(
                    "read target {id} is {:?}, views are {:?}",
                    target.format(),
                    self.format
                )));
            }
        }
        self.read_target = texture;
        Ok(())
    }

    /// Binds the texture that draws into `buffer` land in. `Back` and
    /// `BackLeft` share one target.
    pub fn set_draw_target(
        &mut self,
        buffer: DrawBuffer,
        texture: Option<TextureId>,
    ) -> Result<(), StereoError> {
        if let Some(id) = texture {
            let target = self.get(id)?;
            if !target
                .texture
                .usage()
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
            {
                return Err(StereoError::UnsupportedFormat(format!(
                    "draw target {id} lacks RENDER_ATTACHMENT usage"
                )));
            }
            if target.format() != self.format {
                return Err(StereoError::UnsupportedFormat(format!(
                    "draw target {id} is {:?}, pipelines target {:?}",
                    target.format(),
                    self.format
                )));
            }
        }
        self.draw_targets[Self::target_slot(buffer)] = texture;
        Ok(())
    }

    pub fn texture(&self, texture: TextureId) -> Option<&wgpu::Texture> {
        self.textures.get(texture.0).map(|entry| &entry.texture)
    }

    /// Submits recorded work to the queue.
    pub fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    /// Reads a texture back as tightly packed rows, top row first. Flushes
    /// pending work and blocks until the copy completes.
    pub fn read_texture(&mut self, texture: TextureId) -> Result<Vec<u8>, StereoError> {
        self.flush();
        let source = self.get(texture)?;
        let (width, height) = source.size();
        let bytes_per_pixel = source.format().block_copy_size(None).ok_or_else(|| {
            StereoError::UnsupportedFormat(format!("{:?} cannot be read back", source.format()))
        })?;
        let row_bytes = width * bytes_per_pixel;
        let padded_row_bytes = align_to(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("stereo readback"),
            size: u64::from(padded_row_bytes) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stereo readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            source.texture.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(height),
                },
            },
            source.texture.size(),
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = readback.slice(..);
        let (sender, receiver) = mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| StereoError::Readback(format!("device poll failed: {err}")))?;
        receiver
            .recv()
            .map_err(|_| StereoError::Readback("map callback never ran".into()))?
            .map_err(|err| StereoError::Readback(err.to_string()))?;

        let mapped = buffer_slice.get_mapped_range();
        let mut out = Vec::with_capacity(row_bytes as usize * height as usize);
        for row in 0..height as usize {
            let start = row * padded_row_bytes as usize;
            out.extend_from_slice(&mapped[start..start + row_bytes as usize]);
        }
        drop(mapped);
        readback.unmap();
        Ok(out)
    }

    fn target_slot(buffer: DrawBuffer) -> usize {
        match buffer {
            DrawBuffer::Back | DrawBuffer::BackLeft => 0,
            DrawBuffer::BackRight => 1,
        }
    }

    fn get(&self, texture: TextureId) -> Result<&GpuTexture, StereoError> {
        self.textures
            .get(texture.0)
            .ok_or(StereoError::UnknownTexture(texture))
    }

    fn draw_target(&self) -> Result<TextureId, StereoError> {
        self.draw_targets[Self::target_slot(self.state.draw_buffer)]
            .ok_or(StereoError::MissingDrawTarget(self.state.draw_buffer.name()))
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("stereo encoder"),
            })
        })
    }

    /// Records one viewport-restricted pass: a composition draw when `draw` is
    /// set, otherwise an opaque black fill.
    fn encode_pass(
        &mut self,
        region: Viewport,
        draw: Option<(ProgramId, &DrawParams)>,
    ) -> Result<(), StereoError> {
        let target_id = self.draw_target()?;
        let target = self.get(target_id)?;
        let (width, height) = target.size();
        let Some(rect) = to_pixel_rect(region, width, height) else {
            trace!(%region, "viewport outside the draw target; nothing drawn");
            return Ok(());
        };

        let bind_group = match draw {
            Some(_) => {
                let mut units =
                    [(&self.placeholder.view, &self.placeholder.sampler); TEXTURE_UNITS];
                for (unit, binding) in self.state.bindings.iter().enumerate() {
                    if let Some(texture) = binding {
                        let entry = self.get(*texture)?;
                        units[unit] = (&entry.view, &entry.sampler);
                    }
                }
                Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("composite texture bind group"),
                    layout: &self.layouts.texture_layout,
                    entries: &pipeline::texture_entries(&units),
                }))
            }
            None => None,
        };
        let pipeline = match draw {
            Some((program, _)) => {
                let Some(compiled) = self.programs.get(program.0) else {
                    return Err(StereoError::Unavailable {
                        log: format!("{program} was destroyed"),
                    });
                };
                compiled.pipeline.clone()
            }
            None => self.fill_pipeline.clone(),
        };
        let target_view = self.get(target_id)?.view.clone();

        let staging = draw.map(|(_, params)| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("uniform staging"),
                    contents: bytemuck::bytes_of(&CompositeUniforms::from(params)),
                    usage: wgpu::BufferUsages::COPY_SRC,
                })
        });
        let uniform_buffer = self.uniform_buffer.clone();
        let uniform_bind_group = self.uniform_bind_group.clone();
        let encoder = self.encoder();
        if let Some(staging) = &staging {
            encoder.copy_buffer_to_buffer(staging, 0, &uniform_buffer, 0, CompositeUniforms::SIZE);
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("stereo composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        let [x, y, viewport_width, viewport_height] = viewport_bounds(region, height);
        render_pass.set_viewport(x, y, viewport_width, viewport_height, 0.0, 1.0);
        render_pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
        render_pass.set_pipeline(&pipeline);
        if let Some(bind_group) = &bind_group {
            render_pass.set_bind_group(0, &uniform_bind_group, &[]);
            render_pass.set_bind_group(1, bind_group, &[]);
        }
        render_pass.draw(0..3, 0..1);
        Ok(())
    }
}

impl Backend for WgpuBackend {
    fn state(&self) -> RenderState {
        self.state
    }

    fn restore(&mut self, state: &RenderState) {
        self.state = *state;
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
    }

    fn set_draw_buffer(&mut self, buffer: DrawBuffer) {
        self.state.draw_buffer = buffer;
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.state.program = program;
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        self.state.active_unit = unit;
        if let Some(slot) = self.state.bindings.get_mut(unit as usize) {
            *slot = texture;
        }
    }

    fn create_view_texture(&mut self, width: u32, height: u32) -> Result<TextureId, StereoError> {
        let texture = textures::create_view_texture(
            &self.device,
            self.format,
            width,
            height,
            &self.view_sampler,
        )?;
        Ok(TextureId(self.textures.insert(texture)))
    }

    fn create_mask_texture(&mut self, pattern: MaskPattern) -> Result<TextureId, StereoError> {
        let texture =
            textures::create_mask_texture(&self.device, &self.queue, pattern, &self.mask_sampler)?;
        Ok(TextureId(self.textures.insert(texture)))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        let Some(entry) = self.textures.remove(texture.0) else {
            return;
        };
        if self.read_target == Some(texture) {
            self.read_target = None;
        }
        for target in &mut self.draw_targets {
            if *target == Some(texture) {
                *target = None;
            }
        }
        if entry.owned {
            // Pending commands may still reference it.
            self.flush();
            entry.texture.destroy();
        }
    }

    fn copy_read_target(
        &mut self,
        texture: TextureId,
        region: Viewport,
    ) -> Result<(), StereoError> {
        let source_id = self.read_target.ok_or(StereoError::MissingReadTarget)?;
        let source = self.get(source_id)?;
        let destination = self.get(texture)?;
        if !same_family(source.format(), destination.format()) {
            return Err(StereoError::UnsupportedFormat(format!(
                "cannot copy {:?} into {:?}",
                source.format(),
                destination.format()
            )));
        }

        let (width, height) = source.size();
        let Some(rect) = to_pixel_rect(region, width, height) else {
            return Ok(());
        };
        // Destination row 0 is the top of `region`.
        let region_top = i64::from(height) - (i64::from(region.y) + i64::from(region.height));
        let destination_origin = wgpu::Origin3d {
            x: (i64::from(rect.x) - i64::from(region.x)) as u32,
            y: (i64::from(rect.y) - region_top) as u32,
            z: 0,
        };
        let source_texture = source.texture.clone();
        let destination_texture = destination.texture.clone();

        self.encoder().copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &source_texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.x,
                    y: rect.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &destination_texture,
                mip_level: 0,
                origin: destination_origin,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: rect.width,
                height: rect.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn compile_program(
        &mut self,
        label: &str,
        source: &str,
    ) -> Result<CompiledProgram, StereoError> {
        let (compiled, diagnostic) =
            pipeline::compile_composite(&self.device, &self.layouts, self.format, label, source)?;
        let id = ProgramId(self.programs.insert(compiled));
        Ok(CompiledProgram { id, diagnostic })
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if let Some(compiled) = self.programs.remove(program.0) {
            trace!(label = %compiled.label, "dropped composition pipeline");
        }
    }

    fn draw(&mut self, params: &DrawParams) -> Result<(), StereoError> {
        let program = self.state.program.ok_or(StereoError::MissingProgram)?;
        self.encode_pass(self.state.viewport, Some((program, params)))
    }

    fn clear(&mut self, region: Viewport) -> Result<(), StereoError> {
        self.encode_pass(region, None)
    }

    fn write_row(&mut self, row: u32, pixels: &[u32]) -> Result<(), StereoError> {
        let target_id = self.draw_target()?;
        let target = self.get(target_id)?;
        if !target.texture.usage().contains(wgpu::TextureUsages::COPY_DST) {
            return Err(StereoError::UnsupportedFormat(format!(
                "draw target {target_id} lacks COPY_DST usage"
            )));
        }
        let (width, height) = target.size();
        if row >= height || pixels.is_empty() {
            return Ok(());
        }
        let count = pixels.len().min(width as usize);
        let format = target.format();
        let texture = target.texture.clone();

        let mut bytes = std::mem::take(&mut self.row_bytes);
        textures::pack_row(format, &pixels[..count], &mut bytes)?;
        let padded = align_to(bytes.len() as u32, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) as usize;
        bytes.resize(padded, 0);
        let staging = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("sync marker row"),
                contents: &bytes,
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        self.row_bytes = bytes;

        self.encoder().copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded as u32),
                    rows_per_image: Some(1),
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: height - 1 - row,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: count as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        self.flush();
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("format", &self.format)
            .field("textures", &self.textures.len())
            .field("programs", &self.programs.len())
            .field("read_target", &self.read_target)
            .field("draw_targets", &self.draw_targets)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
