//! Frame composition.
//!
//! Every frame runs the fixed [`FRAME_STEPS`]: clear, draw the background
//! layer, draw the foreground layer on top of it, then advance both orbit
//! controllers. The steps go through a [`FrameExecutor`] so the sequence can
//! be driven without a GPU; [`GpuFrame`] is the executor that records real
//! render passes.
//!
//! # Key types
//!
//! - [`SceneRenderer`] owns pipelines and the GPU copies of both scenes
//! - [`RenderLoop`] counts frames and honours a [`StopHandle`]

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use wgpu::util::DeviceExt;

use crate::{
    camera::CameraResources,
    context::Context,
    data_structures::{
        geometry::{Geometry, LineGeometry},
        instance::Transform,
        material::{Material, Side},
        scene_graph::{NodeKind, Scene},
        texture::Texture,
    },
    pipelines::{line::mk_line_pipeline, mesh::MeshPipelines},
    viewport::{Layer, Stage, Viewport},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStep {
    Clear,
    Draw(Layer),
    AdvanceControls,
}

/// Background first, so the foreground always lands on top.
pub const FRAME_STEPS: [FrameStep; 4] = [
    FrameStep::Clear,
    FrameStep::Draw(Layer::Background),
    FrameStep::Draw(Layer::Foreground),
    FrameStep::AdvanceControls,
];

pub trait FrameExecutor {
    fn execute(&mut self, step: FrameStep) -> anyhow::Result<()>;
}

pub fn run_frame<E: FrameExecutor + ?Sized>(executor: &mut E) -> anyhow::Result<()> {
    for step in FRAME_STEPS {
        executor.execute(step)?;
    }
    Ok(())
}

/// Shared flag that ends a [`RenderLoop`] before its next frame.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The single "running" state of the demo. Frames never overlap: the next
/// one is only requested after the current one returns.
#[derive(Debug, Default)]
pub struct RenderLoop {
    frames: u64,
    stop: StopHandle,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs one frame unless stopped. Returns whether another frame should
    /// be scheduled.
    pub fn tick<E: FrameExecutor + ?Sized>(&mut self, executor: &mut E) -> anyhow::Result<bool> {
        if self.stop.is_stopped() {
            return Ok(false);
        }
        run_frame(executor)?;
        self.frames += 1;
        Ok(self.is_running())
    }
}

struct GpuMaterial {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    #[allow(unused)]
    map: Option<Texture>,
    version: u32,
    side: Side,
}

struct ModelBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

enum GpuNode {
    Mesh {
        vertex: wgpu::Buffer,
        index: wgpu::Buffer,
        index_count: u32,
        material: GpuMaterial,
        model: ModelBinding,
    },
    Lines {
        vertex: wgpu::Buffer,
        vertex_count: u32,
        model: ModelBinding,
    },
}

struct LayerResources {
    camera: CameraResources,
    environment: wgpu::Buffer,
    environment_group: wgpu::BindGroup,
    nodes: Vec<GpuNode>,
}

impl LayerResources {
    fn new(ctx: &Context, label: &str) -> Self {
        let camera = CameraResources::new(&ctx.device, &ctx.layouts.camera, label);
        let environment = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Environment Buffer")),
            contents: bytemuck::cast_slice(&[Scene::default().environment()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let environment_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.layouts.environment,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: environment.as_entire_binding(),
            }],
            label: Some(&format!("{label} environment_bind_group")),
        });
        Self {
            camera,
            environment,
            environment_group,
            nodes: Vec::new(),
        }
    }
}

/// Pipelines plus lazily created GPU resources for both layers.
pub struct SceneRenderer {
    mesh: MeshPipelines,
    line: wgpu::RenderPipeline,
    placeholder: Texture,
    background: LayerResources,
    foreground: LayerResources,
}

impl std::fmt::Debug for SceneRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("background_nodes", &self.background.nodes.len())
            .field("foreground_nodes", &self.foreground.nodes.len())
            .finish()
    }
}

impl SceneRenderer {
    pub fn new(ctx: &Context) -> Self {
        Self {
            mesh: MeshPipelines::new(&ctx.device, ctx.config.format, &ctx.layouts),
            line: mk_line_pipeline(&ctx.device, ctx.config.format, &ctx.layouts),
            placeholder: Texture::create_placeholder(&ctx.device, &ctx.queue),
            background: LayerResources::new(ctx, "background"),
            foreground: LayerResources::new(ctx, "foreground"),
        }
    }

    fn layer(&self, layer: Layer) -> &LayerResources {
        match layer {
            Layer::Background => &self.background,
            Layer::Foreground => &self.foreground,
        }
    }

    /// Uploads nodes added since the last call, re-uploads materials whose
    /// map changed, and writes this frame's uniforms.
    pub fn prepare(&mut self, ctx: &Context, layer: Layer, viewport: &Viewport) {
        let placeholder = &self.placeholder;
        let resources = match layer {
            Layer::Background => &mut self.background,
            Layer::Foreground => &mut self.foreground,
        };

        resources
            .camera
            .write(&ctx.queue, &viewport.camera, &viewport.projection);
        ctx.queue.write_buffer(
            &resources.environment,
            0,
            bytemuck::cast_slice(&[viewport.scene.environment()]),
        );

        for (id, node) in viewport.scene.nodes() {
            match resources.nodes.get_mut(id.index()) {
                None => {
                    log::debug!("Uploading {} to the {:?} layer", node.name, layer);
                    let gpu = match &node.kind {
                        NodeKind::Mesh { geometry, material } => {
                            upload_mesh(ctx, geometry, material, &node.transform, placeholder)
                        }
                        NodeKind::Axes { geometry } => upload_lines(ctx, geometry, &node.transform),
                    };
                    resources.nodes.push(gpu);
                }
                Some(GpuNode::Mesh {
                    material: gpu_material,
                    model,
                    ..
                }) => {
                    if let NodeKind::Mesh { material, .. } = &node.kind {
                        if material.map.version() != gpu_material.version {
                            *gpu_material = upload_material(ctx, material, placeholder);
                        } else {
                            ctx.queue.write_buffer(
                                &gpu_material.uniform,
                                0,
                                bytemuck::cast_slice(&[material.to_uniform()]),
                            );
                        }
                    }
                    write_model(ctx, model, &node.transform);
                }
                Some(GpuNode::Lines { model, .. }) => write_model(ctx, model, &node.transform),
            }
        }
    }

    pub fn draw(&self, layer: Layer, render_pass: &mut wgpu::RenderPass<'_>) {
        let resources = self.layer(layer);
        for node in &resources.nodes {
            match node {
                GpuNode::Mesh {
                    vertex,
                    index,
                    index_count,
                    material,
                    model,
                } => {
                    render_pass.set_pipeline(self.mesh.for_side(material.side));
                    render_pass.set_bind_group(0, &resources.camera.bind_group, &[]);
                    render_pass.set_bind_group(1, &resources.environment_group, &[]);
                    render_pass.set_bind_group(2, &material.bind_group, &[]);
                    render_pass.set_bind_group(3, &model.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, vertex.slice(..));
                    render_pass.set_index_buffer(index.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..*index_count, 0, 0..1);
                }
                GpuNode::Lines {
                    vertex,
                    vertex_count,
                    model,
                } => {
                    render_pass.set_pipeline(&self.line);
                    render_pass.set_bind_group(0, &resources.camera.bind_group, &[]);
                    render_pass.set_bind_group(1, &model.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, vertex.slice(..));
                    render_pass.draw(0..*vertex_count, 0..1);
                }
            }
        }
    }
}

fn upload_mesh(
    ctx: &Context,
    geometry: &Geometry,
    material: &Material,
    transform: &Transform,
    placeholder: &Texture,
) -> GpuNode {
    let vertex = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Vertex Buffer"),
        contents: bytemuck::cast_slice(&geometry.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh Index Buffer"),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuNode::Mesh {
        vertex,
        index,
        index_count: geometry.indices.len() as u32,
        material: upload_material(ctx, material, placeholder),
        model: create_model(ctx, transform),
    }
}

fn upload_lines(ctx: &Context, geometry: &LineGeometry, transform: &Transform) -> GpuNode {
    let vertex = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Line Vertex Buffer"),
        contents: bytemuck::cast_slice(&geometry.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    GpuNode::Lines {
        vertex,
        vertex_count: geometry.vertices.len() as u32,
        model: create_model(ctx, transform),
    }
}

fn upload_material(ctx: &Context, material: &Material, placeholder: &Texture) -> GpuMaterial {
    let map = material.map.data().map(|data| {
        let fitted = data.fit_within(ctx.max_texture_dimension());
        if let Some(fitted) = &fitted {
            log::info!(
                "Texture of {:?} exceeds the device limit, downscaled to {:?}",
                data.dimensions(),
                fitted.dimensions()
            );
        }
        Texture::from_data(
            &ctx.device,
            &ctx.queue,
            fitted.as_ref().unwrap_or(data),
            Some("material map"),
            material.wrapping,
        )
    });
    let texture = map.as_ref().unwrap_or(placeholder);
    let sampler = match &texture.sampler {
        Some(sampler) => sampler.clone(),
        None => crate::data_structures::texture::create_sampler(&ctx.device, material.wrapping),
    };

    let uniform = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material Buffer"),
        contents: bytemuck::cast_slice(&[material.to_uniform()]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &ctx.layouts.material,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
        label: Some("material_bind_group"),
    });

    GpuMaterial {
        uniform,
        bind_group,
        map,
        version: material.map.version(),
        side: material.side,
    }
}

fn create_model(ctx: &Context, transform: &Transform) -> ModelBinding {
    let buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Model Buffer"),
        contents: bytemuck::cast_slice(&[transform.to_raw()]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &ctx.layouts.model,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("model_bind_group"),
    });
    ModelBinding { buffer, bind_group }
}

fn write_model(ctx: &Context, model: &ModelBinding, transform: &Transform) {
    ctx.queue
        .write_buffer(&model.buffer, 0, bytemuck::cast_slice(&[transform.to_raw()]));
}

/// Records one frame's passes into a command encoder.
pub struct GpuFrame<'a> {
    ctx: &'a Context,
    renderer: &'a mut SceneRenderer,
    stage: &'a mut Stage,
    view: &'a wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

impl<'a> GpuFrame<'a> {
    pub fn new(
        ctx: &'a Context,
        renderer: &'a mut SceneRenderer,
        stage: &'a mut Stage,
        view: &'a wgpu::TextureView,
    ) -> Self {
        let encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        Self {
            ctx,
            renderer,
            stage,
            view,
            encoder,
        }
    }

    /// Submits the recorded passes.
    pub fn submit(self) {
        self.ctx.queue.submit(std::iter::once(self.encoder.finish()));
    }
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    depth_view: &wgpu::TextureView,
    label: &str,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        // every pass starts with a fresh depth buffer, so the foreground is
        // never hidden by background geometry
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
        multiview_mask: None,
    })
}

impl FrameExecutor for GpuFrame<'_> {
    fn execute(&mut self, step: FrameStep) -> anyhow::Result<()> {
        match step {
            FrameStep::Clear => {
                let clear = wgpu::LoadOp::Clear(self.ctx.clear_colour);
                begin_pass(
                    &mut self.encoder,
                    self.view,
                    self.ctx.depth_view(),
                    "Clear Pass",
                    clear,
                );
            }
            FrameStep::Draw(layer) => {
                self.renderer
                    .prepare(self.ctx, layer, self.stage.viewport(layer));
                let label = match layer {
                    Layer::Background => "Background Pass",
                    Layer::Foreground => "Foreground Pass",
                };
                let mut render_pass = begin_pass(
                    &mut self.encoder,
                    self.view,
                    self.ctx.depth_view(),
                    label,
                    wgpu::LoadOp::Load,
                );
                self.renderer.draw(layer, &mut render_pass);
            }
            FrameStep::AdvanceControls => self.stage.advance_controls(),
        }
        Ok(())
    }
}

/// Copies `texture` (RGBA8, `COPY_SRC`) back to the CPU.
#[cfg(all(feature = "integration-tests", not(target_arch = "wasm32")))]
pub async fn read_texture(ctx: &Context, texture: &wgpu::Texture) -> anyhow::Result<image::RgbaImage> {
    let width = texture.width();
    let height = texture.height();
    let unpadded = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded = unpadded.div_ceil(align) * align;

    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        size: (padded * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: Some("Readback Buffer"),
        mapped_at_creation: false,
    });
    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    ctx.queue.submit(std::iter::once(encoder.finish()));

    // The mapping has to be requested before polling, otherwise the
    // receiver never resolves.
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    ctx.device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: Some(std::time::Duration::from_secs(3)),
    })?;
    rx.receive()
        .await
        .ok_or_else(|| anyhow::anyhow!("readback channel closed"))??;

    let data = buffer_slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((unpadded * height) as usize);
    for row in data.chunks(padded as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..unpadded as usize]);
    }
    drop(data);
    output_buffer.unmap();
    image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow::anyhow!("readback size mismatch"))
}
