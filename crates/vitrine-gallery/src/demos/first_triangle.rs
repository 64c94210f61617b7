//! One pixel-space triangle whose geometry and colors live in a keyed store.
//!
//! The resize effect writes `positions`; editing a `colorN` key rebuilds
//! `colors`; watchers on `positions` and `colors` upload to the GPU.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use vitrine_engine::device::{GpuContext, GpuInit};
use vitrine_engine::panel::{Binding, BindingParams, ControlValue, Panel, Section};
use vitrine_engine::reactive::Effect;
use vitrine_engine::renderer::{RenderCallback, RendererCtx, RendererError, RendererHooks};
use vitrine_engine::store::{Store, StoreError, StoreState, Subscription};
use vitrine_engine::surface::SurfaceSize;
use winit::window::Window;

use super::common::{
    ResolutionUniform, acquire_gpu, create_buffer, draw_frame, parse_hex_color, triangle_pipeline,
};

pub const COLOR_KEYS: [&str; 3] = ["color1", "color2", "color3"];

const PALETTE: [(&str, &str); 6] = [
    ("red", "#ff000080"),
    ("green", "#00ff0080"),
    ("blue", "#0000ff80"),
    ("yellow", "#ffff0080"),
    ("magenta", "#ff00ff80"),
    ("cyan", "#00ffff80"),
];

const FALLBACK_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Debug, Clone, PartialEq)]
pub enum TriangleValue {
    Floats(Vec<f32>),
    Color(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriangleState {
    /// Three `(x, y)` pairs in pixels, origin top-left.
    pub positions: [f32; 6],
    pub color1: String,
    pub color2: String,
    pub color3: String,
    /// Three RGBA colors derived from `color1..3`.
    pub colors: [f32; 12],
}

impl Default for TriangleState {
    fn default() -> Self {
        Self {
            positions: [0.0; 6],
            color1: PALETTE[0].1.to_owned(),
            color2: PALETTE[1].1.to_owned(),
            color3: PALETTE[2].1.to_owned(),
            colors: [0.0; 12],
        }
    }
}

impl TriangleState {
    pub fn color(&self, key: &str) -> Option<&str> {
        match key {
            "color1" => Some(&self.color1),
            "color2" => Some(&self.color2),
            "color3" => Some(&self.color3),
            _ => None,
        }
    }

    /// RGBA floats for `color1..3`. Unparseable colors fall back to opaque white.
    pub fn derive_colors(&self) -> [f32; 12] {
        let mut out = [0.0; 12];
        for (i, hex) in [&self.color1, &self.color2, &self.color3].into_iter().enumerate() {
            let rgba = parse_hex_color(hex).unwrap_or_else(|| {
                log::warn!("invalid color `{hex}`, using white");
                FALLBACK_COLOR
            });
            out[i * 4..i * 4 + 4].copy_from_slice(&rgba);
        }
        out
    }
}

fn mismatch(key: &str, expected: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        key: key.to_owned(),
        expected,
    }
}

fn floats<const N: usize>(key: &str, value: TriangleValue) -> Result<[f32; N], StoreError> {
    match value {
        TriangleValue::Floats(v) => <[f32; N]>::try_from(v).map_err(|_| mismatch(key, "fixed-length float")),
        TriangleValue::Color(_) => Err(mismatch(key, "float")),
    }
}

impl StoreState for TriangleState {
    type Value = TriangleValue;

    fn get(&self, key: &str) -> Option<TriangleValue> {
        match key {
            "positions" => Some(TriangleValue::Floats(self.positions.to_vec())),
            "colors" => Some(TriangleValue::Floats(self.colors.to_vec())),
            _ => self.color(key).map(|c| TriangleValue::Color(c.to_owned())),
        }
    }

    fn set(&mut self, key: &str, value: TriangleValue) -> Result<(), StoreError> {
        let slot = match key {
            "positions" => return floats(key, value).map(|v| self.positions = v),
            "colors" => return floats(key, value).map(|v| self.colors = v),
            "color1" => &mut self.color1,
            "color2" => &mut self.color2,
            "color3" => &mut self.color3,
            _ => return Err(StoreError::UnknownKey(key.to_owned())),
        };
        match value {
            TriangleValue::Color(c) => {
                *slot = c;
                Ok(())
            }
            TriangleValue::Floats(_) => Err(mismatch(key, "color")),
        }
    }
}

/// Vertices spanning the lower 80% of a `width`×`height` surface, apex up.
pub fn triangle_positions(width: u32, height: u32) -> [f32; 6] {
    let (w, h) = (width as f32, height as f32);
    [w / 10.0, h * 9.0 / 10.0, w * 9.0 / 10.0, h * 9.0 / 10.0, w / 2.0, h / 10.0]
}

/// Keeps `colors` in sync with `color1..3`, starting now.
pub(crate) fn derive_colors(store: &Store<TriangleState>) -> Subscription<TriangleState> {
    let target = store.clone();
    store.subscribe(
        &COLOR_KEYS,
        move |state: &TriangleState| {
            let colors = TriangleValue::Floats(state.derive_colors().to_vec());
            if let Err(err) = target.set("colors", colors) {
                log::warn!("failed to derive colors: {err}");
            }
        },
        true,
    )
}

/// Option-list control for one color key, kept in sync with the store both ways.
fn bind_color(section: &Section, store: &Store<TriangleState>, key: &'static str) -> Binding {
    let current = match store.get(key) {
        Some(TriangleValue::Color(c)) => c,
        _ => PALETTE[0].1.to_owned(),
    };
    let params = PALETTE.iter().fold(BindingParams::new().label(key), |params, (name, hex)| {
        params.option(*name, ControlValue::Text((*hex).to_owned()))
    });
    let binding = section.add_binding(ControlValue::Text(current), params);

    binding.on_change({
        let store = store.clone();
        move |value| {
            let Some(hex) = value.as_text() else { return };
            if let Err(err) = store.set(key, TriangleValue::Color(hex.to_owned())) {
                log::warn!("color `{key}` rejected: {err}");
            }
        }
    });

    let mirror = binding.downgrade();
    let sync = store.subscribe(
        &[key],
        move |state: &TriangleState| {
            if let (Some(binding), Some(color)) = (mirror.upgrade(), state.color(key)) {
                binding.set_value(ControlValue::Text(color.to_owned()));
            }
        },
        false,
    );
    binding.attach(Box::new(sync));
    binding
}

pub struct FirstTriangle {
    window: Arc<Window>,
    init: GpuInit,
    store: Store<TriangleState>,
}

impl FirstTriangle {
    pub fn new(window: Arc<Window>, init: GpuInit) -> Self {
        Self {
            window,
            init,
            store: Store::new(TriangleState::default()),
        }
    }
}

impl RendererHooks for FirstTriangle {
    type Context = GpuContext;

    async fn acquire_context(&mut self, cx: &RendererCtx) -> Result<GpuContext, RendererError> {
        acquire_gpu(&self.window, &self.init, cx).await
    }

    fn setup_panel_controls(&mut self, panel: &Panel, _cx: &RendererCtx) {
        let folder = panel.add_folder("Colors");
        for key in COLOR_KEYS {
            bind_color(&folder, &self.store, key);
        }
    }

    async fn setup_render(
        &mut self,
        gpu: GpuContext,
        cx: &RendererCtx,
    ) -> Result<RenderCallback, RendererError> {
        let pipeline = triangle_pipeline(
            &gpu,
            "first triangle pipeline",
            include_str!("shaders/first_triangle.wgsl"),
        )
        .await?;

        let position_vbo = create_buffer(
            &gpu,
            "first triangle positions",
            std::mem::size_of::<[f32; 6]>() as u64,
            wgpu::BufferUsages::VERTEX,
        );
        let color_sbo = create_buffer(
            &gpu,
            "first triangle colors",
            std::mem::size_of::<[f32; 12]>() as u64,
            wgpu::BufferUsages::STORAGE,
        );
        let resolution_ubo = create_buffer(
            &gpu,
            "first triangle resolution",
            std::mem::size_of::<ResolutionUniform>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );

        let bind_group = gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("first triangle bind group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: color_sbo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: resolution_ubo.as_entire_binding(),
                },
            ],
        });

        let gpu = Rc::new(RefCell::new(gpu));

        let upload_positions = self.store.subscribe(
            &["positions"],
            {
                let gpu = Rc::clone(&gpu);
                let vbo = position_vbo.clone();
                move |state: &TriangleState| {
                    gpu.borrow()
                        .queue()
                        .write_buffer(&vbo, 0, bytemuck::cast_slice(&state.positions));
                }
            },
            true,
        );
        let upload_colors = self.store.subscribe(
            &["colors"],
            {
                let gpu = Rc::clone(&gpu);
                move |state: &TriangleState| {
                    gpu.borrow()
                        .queue()
                        .write_buffer(&color_sbo, 0, bytemuck::cast_slice(&state.colors));
                }
            },
            true,
        );
        let colors = derive_colors(&self.store);

        let resize = cx.runtime.effect({
            let (width, height) = (cx.width.clone(), cx.height.clone());
            let gpu = Rc::clone(&gpu);
            let store = self.store.clone();
            move || {
                let (w, h) = (width.get(), height.get());
                {
                    let mut gpu = gpu.borrow_mut();
                    gpu.resize(SurfaceSize::new(w, h));
                    let uniform = ResolutionUniform::new(w, h);
                    gpu.queue().write_buffer(&resolution_ubo, 0, bytemuck::bytes_of(&uniform));
                }
                let positions = TriangleValue::Floats(triangle_positions(w, h).to_vec());
                if let Err(err) = store.set("positions", positions) {
                    log::warn!("failed to place triangle: {err}");
                }
            }
        });

        let frame = TriangleFrame {
            gpu,
            pipeline,
            bind_group,
            position_vbo,
            _subscriptions: [upload_positions, upload_colors, colors],
            _resize: resize,
        };
        Ok(Box::new(move || frame.draw()))
    }
}

struct TriangleFrame {
    gpu: Rc<RefCell<GpuContext>>,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    position_vbo: wgpu::Buffer,
    _subscriptions: [Subscription<TriangleState>; 3],
    _resize: Effect,
}

impl TriangleFrame {
    fn draw(&self) {
        draw_frame(&self.gpu, "first triangle pass", wgpu::Color::WHITE, |rpass| {
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.position_vbo.slice(..));
            rpass.draw(0..3, 0..1);
        });
    }
}
