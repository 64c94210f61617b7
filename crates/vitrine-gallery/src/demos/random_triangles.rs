//! Instanced triangles with random scale, offset and vertex colors.
//!
//! All per-instance data derives from the `count` signal and the surface
//! size; effects upload each derivation when it changes.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rand::Rng;
use vitrine_engine::device::{GpuContext, GpuInit};
use vitrine_engine::panel::{BindingParams, Panel, bind};
use vitrine_engine::reactive::{Computed, Effect, Runtime, Signal};
use vitrine_engine::renderer::{RenderCallback, RendererCtx, RendererError, RendererHooks};
use vitrine_engine::surface::SurfaceSize;
use winit::window::Window;

use super::common::{
    ResolutionUniform, acquire_gpu, create_buffer, draw_frame, random_color, triangle_pipeline,
};

/// Upper bound on instances; buffers are sized for it.
pub const COUNT_MAX: u32 = 100;
pub const COUNT_DEFAULT: u32 = 10;

const ALPHA: f32 = 0.5;

/// Reactive description of the triangle field.
pub struct TriangleField {
    pub count: Signal<u32>,
    /// Base triangle, centred on the origin, in pixels.
    pub positions: Computed<Vec<f32>>,
    /// One scale factor per instance.
    pub scalings: Computed<Vec<f32>>,
    /// One `(x, y)` pixel offset per instance.
    pub offsets: Computed<Vec<f32>>,
    /// One RGBA color per vertex, three vertices per instance.
    pub colors: Computed<Vec<f32>>,
}

impl TriangleField {
    pub fn new(cx: &RendererCtx) -> Self {
        let rt = &cx.runtime;
        let count = rt.signal(COUNT_DEFAULT);
        let instances = {
            let count = count.clone();
            move || count.get().min(COUNT_MAX) as usize
        };

        let positions = rt.computed({
            let (width, height) = (cx.width.clone(), cx.height.clone());
            move || {
                let (w, h) = (width.get() as f32, height.get() as f32);
                vec![-w / 10.0, h / 10.0, w / 10.0, h / 10.0, 0.0, -h / 10.0]
            }
        });

        let scalings = rt.computed({
            let instances = instances.clone();
            move || {
                let mut rng = rand::rng();
                (0..instances())
                    .map(|_| rng.random_range(0.5f32..2.0))
                    .collect::<Vec<f32>>()
            }
        });

        let offsets = rt.computed({
            let instances = instances.clone();
            let (width, height) = (cx.width.clone(), cx.height.clone());
            move || {
                let (w, h) = (width.get() as f32, height.get() as f32);
                let mut rng = rand::rng();
                (0..instances())
                    .flat_map(|_| {
                        [
                            rng.random_range(-0.3f32..=0.3) * w,
                            rng.random_range(-0.3f32..=0.3) * h,
                        ]
                    })
                    .collect::<Vec<f32>>()
            }
        });

        let colors = rt.computed(move || {
            let mut rng = rand::rng();
            (0..instances() * 3)
                .flat_map(|_| random_color(&mut rng, ALPHA))
                .collect::<Vec<f32>>()
        });

        Self {
            count,
            positions,
            scalings,
            offsets,
            colors,
        }
    }

    /// Instances to draw this frame, without tracking.
    pub fn instance_count(&self) -> u32 {
        self.count.peek().min(COUNT_MAX)
    }
}

/// Uploads `source` into `buffer` now and whenever it changes.
fn upload(
    rt: &Runtime,
    gpu: &Rc<RefCell<GpuContext>>,
    buffer: wgpu::Buffer,
    source: Computed<Vec<f32>>,
) -> Effect {
    let gpu = Rc::clone(gpu);
    rt.effect(move || {
        let written = source.try_with(|data| {
            gpu.borrow()
                .queue()
                .write_buffer(&buffer, 0, bytemuck::cast_slice(data));
        });
        if let Err(err) = written {
            log::error!("skipped upload: {err}");
        }
    })
}

pub struct RandomTriangles {
    window: Arc<Window>,
    init: GpuInit,
    field: Rc<TriangleField>,
}

impl RandomTriangles {
    pub fn new(window: Arc<Window>, init: GpuInit, cx: &RendererCtx) -> Self {
        Self {
            window,
            init,
            field: Rc::new(TriangleField::new(cx)),
        }
    }
}

impl RendererHooks for RandomTriangles {
    type Context = GpuContext;

    async fn acquire_context(&mut self, cx: &RendererCtx) -> Result<GpuContext, RendererError> {
        acquire_gpu(&self.window, &self.init, cx).await
    }

    fn setup_panel_controls(&mut self, panel: &Panel, _cx: &RendererCtx) {
        let folder = panel.add_folder("Triangles");
        bind(
            &folder,
            &self.field.count,
            BindingParams::new()
                .label("count")
                .range(1.0, f64::from(COUNT_MAX))
                .step(1.0),
        );
    }

    async fn setup_render(
        &mut self,
        gpu: GpuContext,
        cx: &RendererCtx,
    ) -> Result<RenderCallback, RendererError> {
        let pipeline = triangle_pipeline(
            &gpu,
            "random triangles pipeline",
            include_str!("shaders/random_triangles.wgsl"),
        )
        .await?;

        let f32_size = std::mem::size_of::<f32>() as u64;
        let max = u64::from(COUNT_MAX);
        let position_vbo = create_buffer(
            &gpu,
            "random triangles positions",
            6 * f32_size,
            wgpu::BufferUsages::VERTEX,
        );
        let scaling_sbo = create_buffer(
            &gpu,
            "random triangles scalings",
            max * f32_size,
            wgpu::BufferUsages::STORAGE,
        );
        let offset_sbo = create_buffer(
            &gpu,
            "random triangles offsets",
            max * 2 * f32_size,
            wgpu::BufferUsages::STORAGE,
        );
        let color_sbo = create_buffer(
            &gpu,
            "random triangles colors",
            max * 3 * 4 * f32_size,
            wgpu::BufferUsages::STORAGE,
        );
        let resolution_ubo = create_buffer(
            &gpu,
            "random triangles resolution",
            std::mem::size_of::<ResolutionUniform>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );

        let bind_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("random triangles bind group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: scaling_sbo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: offset_sbo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: color_sbo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: resolution_ubo.as_entire_binding(),
                },
            ],
        });

        let gpu = Rc::new(RefCell::new(gpu));
        let rt = &cx.runtime;
        let field = &self.field;

        // Resize first so uploads land in a configured surface.
        let resize = rt.effect({
            let (width, height) = (cx.width.clone(), cx.height.clone());
            let gpu = Rc::clone(&gpu);
            move || {
                let (w, h) = (width.get(), height.get());
                let mut gpu = gpu.borrow_mut();
                gpu.resize(SurfaceSize::new(w, h));
                let uniform = ResolutionUniform::new(w, h);
                gpu.queue().write_buffer(&resolution_ubo, 0, bytemuck::bytes_of(&uniform));
            }
        });

        let effects = vec![
            resize,
            upload(rt, &gpu, position_vbo.clone(), field.positions.clone()),
            upload(rt, &gpu, scaling_sbo, field.scalings.clone()),
            upload(rt, &gpu, offset_sbo, field.offsets.clone()),
            upload(rt, &gpu, color_sbo, field.colors.clone()),
        ];

        let frame = FieldFrame {
            gpu,
            pipeline,
            bind_group,
            position_vbo,
            field: Rc::clone(field),
            _effects: effects,
        };
        Ok(Box::new(move || frame.draw()))
    }
}

struct FieldFrame {
    gpu: Rc<RefCell<GpuContext>>,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    position_vbo: wgpu::Buffer,
    field: Rc<TriangleField>,
    _effects: Vec<Effect>,
}

impl FieldFrame {
    fn draw(&self) {
        let instances = self.field.instance_count();
        draw_frame(&self.gpu, "random triangles pass", wgpu::Color::TRANSPARENT, |rpass| {
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.position_vbo.slice(..));
            rpass.draw(0..3, 0..instances);
        });
    }
}
