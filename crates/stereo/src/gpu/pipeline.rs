use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::backend::TEXTURE_UNITS;
use crate::error::StereoError;

/// Fullscreen triangle. `v_uv` is in texture space: (0, 0) is the top-left
/// texel of the bound views.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    vec2 pos = positions[uint(gl_VertexIndex)];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const FILL_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(0.0, 0.0, 0.0, 1.0);
}
";

/// Layouts and modules shared by every composition program.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub composite_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite texture layout"),
            entries: &texture_layout_entries(),
        });
        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("composite pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fullscreen triangle vertex"),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
                stage: ShaderStage::Vertex,
                defines: &[],
            },
        });

        Self {
            uniform_layout,
            texture_layout,
            composite_layout,
            vertex_module,
        }
    }
}

/// Texture and sampler pairs for the left, right, and mask units.
fn texture_layout_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(TEXTURE_UNITS * 2);
    for unit in 0..TEXTURE_UNITS as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: unit * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: unit * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

pub(crate) fn texture_entries<'a>(
    units: &[(&'a wgpu::TextureView, &'a wgpu::Sampler); TEXTURE_UNITS],
) -> Vec<wgpu::BindGroupEntry<'a>> {
    let mut entries = Vec::with_capacity(TEXTURE_UNITS * 2);
    for (unit, (view, sampler)) in units.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: (unit as u32) * 2,
            resource: wgpu::BindingResource::TextureView(view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: (unit as u32) * 2 + 1,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
    }
    entries
}

fn render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

/// Pipeline that paints its viewport opaque black; used for clears so that
/// they respect the scissor like every other draw.
pub(crate) fn fill_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("fill pipeline layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fill fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(FILL_SHADER_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    render_pipeline(
        device,
        "fill pipeline",
        &layout,
        &layouts.vertex_module,
        &module,
        format,
    )
}

/// A compiled composition program.
pub(crate) struct CompositePipeline {
    pub label: String,
    pub pipeline: wgpu::RenderPipeline,
}

/// Builds a composition program from fragment source. Front-end errors come
/// back as compile failures; pipeline creation errors as link failures.
/// Warnings are returned alongside the pipeline.
pub(crate) fn compile_composite(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    format: wgpu::TextureFormat,
    label: &str,
    source: &str,
) -> Result<(CompositePipeline, Option<String>), StereoError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(StereoError::ShaderCompile {
            log: error.to_string(),
        });
    }

    let info = pollster::block_on(fragment_module.get_compilation_info());
    let warnings: Vec<String> = info
        .messages
        .iter()
        .filter(|message| message.message_type == wgpu::CompilationMessageType::Warning)
        .map(|message| message.message.clone())
        .collect();

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = render_pipeline(
        device,
        label,
        &layouts.composite_layout,
        &layouts.vertex_module,
        &fragment_module,
        format,
    );
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(StereoError::ShaderLink {
            log: error.to_string(),
        });
    }

    let diagnostic = (!warnings.is_empty()).then(|| warnings.join("\n"));
    Ok((
        CompositePipeline {
            label: label.to_owned(),
            pipeline,
        },
        diagnostic,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_a_texture_and_sampler_per_unit() {
        let entries = texture_layout_entries();
        assert_eq!(entries.len(), TEXTURE_UNITS * 2);
        let bindings: Vec<u32> = entries.iter().map(|entry| entry.binding).collect();
        assert_eq!(bindings, vec![0, 1, 2, 3, 4, 5]);
        assert!(matches!(
            entries[5].ty,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
        ));
    }

    #[test]
    fn builtin_shaders_parse() {
        let mut frontend = wgpu::naga::front::glsl::Frontend::default();
        for (stage, source) in [
            (ShaderStage::Vertex, VERTEX_SHADER_GLSL),
            (ShaderStage::Fragment, FILL_SHADER_GLSL),
        ] {
            let options = wgpu::naga::front::glsl::Options::from(stage);
            assert!(frontend.parse(&options, source).is_ok(), "{stage:?}");
        }
    }
}
