use crate::{
    data_structures::{
        geometry::{ModelVertex, Vertex},
        material::Side,
        texture::Texture,
    },
    pipelines::{Layouts, mk_render_pipeline},
};

/// One pipeline per face culling mode; shading differences live in the
/// material uniform.
#[derive(Debug)]
pub struct MeshPipelines {
    pub front: wgpu::RenderPipeline,
    pub double: wgpu::RenderPipeline,
}

impl MeshPipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat, layouts: &Layouts) -> Self {
        Self {
            front: mk_mesh_pipeline(device, color_format, layouts, Side::Front),
            double: mk_mesh_pipeline(device, color_format, layouts, Side::Double),
        }
    }

    pub fn for_side(&self, side: Side) -> &wgpu::RenderPipeline {
        match side {
            Side::Front => &self.front,
            Side::Double => &self.double,
        }
    }
}

pub fn mk_mesh_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &Layouts,
    side: Side,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: &[
            Some(&layouts.camera),
            Some(&layouts.environment),
            Some(&layouts.material),
            Some(&layouts.model),
        ],
        immediate_size: 0,
    });

    let (label, cull_mode) = match side {
        Side::Front => ("Mesh", Some(wgpu::Face::Back)),
        Side::Double => ("Double Sided Mesh", None),
    };
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(include_str!("mesh.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        color_format,
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc()],
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            ..Default::default()
        },
        shader,
    )
}
