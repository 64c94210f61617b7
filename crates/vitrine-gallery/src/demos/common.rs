//! GPU plumbing shared by the demos.

use std::cell::RefCell;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use vitrine_engine::device::{GpuContext, GpuInit, SurfaceErrorAction};
use vitrine_engine::renderer::{RendererCtx, RendererError};
use winit::window::Window;

// ── context ───────────────────────────────────────────────────────────────

/// Acquires a GPU context for `window` at the surface's current backing size.
pub(crate) async fn acquire_gpu(
    window: &Arc<Window>,
    init: &GpuInit,
    cx: &RendererCtx,
) -> Result<GpuContext, RendererError> {
    GpuContext::acquire(Arc::clone(window), cx.surface.backing_size(), init.clone()).await
}

/// Records one clear-then-draw pass into the next swapchain image and presents it.
///
/// Surface errors are recovered where possible and the frame is skipped.
pub(crate) fn draw_frame(
    gpu: &RefCell<GpuContext>,
    label: &str,
    clear: wgpu::Color,
    record: impl FnOnce(&mut wgpu::RenderPass<'_>),
) {
    let acquired = gpu.borrow().begin_frame();
    let mut frame = match acquired {
        Ok(frame) => frame,
        Err(err) => {
            if gpu.borrow_mut().handle_surface_error(err) == SurfaceErrorAction::Fatal {
                log::error!("{label}: surface lost beyond recovery");
            }
            return;
        }
    };

    {
        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        record(&mut rpass);
    }

    gpu.borrow().submit(frame);
}

// ── pipeline ──────────────────────────────────────────────────────────────

/// Straight-alpha "over" blending.
pub(crate) fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Triangle-list pipeline over one `vec2<f32>` position stream.
///
/// The layout is derived from the shader; fetch it back with
/// `get_bind_group_layout(0)`. Validation failures while compiling the module
/// surface as [`RendererError::ShaderCompile`], and while building the
/// pipeline as [`RendererError::ProgramLink`].
pub(crate) async fn triangle_pipeline(
    gpu: &GpuContext,
    label: &str,
    shader_src: &str,
) -> Result<wgpu::RenderPipeline, RendererError> {
    let device = gpu.device();

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });
    shader_compiled(scope.pop().await)?;

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: None,

        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Position::layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: gpu.surface_format(),
                blend: Some(alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

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
        multiview_mask: None,
        cache: None,
    });
    pipeline_linked(scope.pop().await)?;

    Ok(pipeline)
}

fn shader_compiled(captured: Option<wgpu::Error>) -> Result<(), RendererError> {
    match captured {
        Some(err) => Err(RendererError::ShaderCompile(err.to_string())),
        None => Ok(()),
    }
}

fn pipeline_linked(captured: Option<wgpu::Error>) -> Result<(), RendererError> {
    match captured {
        Some(err) => Err(RendererError::ProgramLink(err.to_string())),
        None => Ok(()),
    }
}

pub(crate) fn create_buffer(
    gpu: &GpuContext,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    gpu.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

// ── vertex and uniform types ──────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct Position {
    pub pos: [f32; 2],
}

impl Position {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Position>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct ResolutionUniform {
    pub resolution: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

impl ResolutionUniform {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width.max(1) as f32, height.max(1) as f32],
            _pad: [0.0; 2],
        }
    }
}

// ── color ─────────────────────────────────────────────────────────────────

pub(crate) type Rgba = [f32; 4];

/// Parses `#rrggbb` or `#rrggbbaa` into straight-alpha floats.
pub(crate) fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let digits = hex.strip_prefix('#')?;
    if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
        return None;
    }

    let mut rgba = [1.0; 4];
    for (i, chunk) in digits.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).ok()?;
        rgba[i] = f32::from(u8::from_str_radix(pair, 16).ok()?) / 255.0;
    }
    Some(rgba)
}

/// Uniformly random color with the given alpha.
pub(crate) fn random_color(rng: &mut impl rand::Rng, alpha: f32) -> Rgba {
    [
        rng.random_range(0.0f32..=1.0),
        rng.random_range(0.0f32..=1.0),
        rng.random_range(0.0f32..=1.0),
        alpha,
    ]
}
