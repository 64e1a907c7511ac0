use crate::{
    data_structures::{
        geometry::{LineVertex, Vertex},
        texture::Texture,
    },
    pipelines::{Layouts, mk_render_pipeline},
};

/// Unlit, vertex-coloured line lists (the axes helper).
pub fn mk_line_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    layouts: &Layouts,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Line Pipeline Layout"),
        bind_group_layouts: &[Some(&layouts.camera), Some(&layouts.model)],
        immediate_size: 0,
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Line"),
        source: wgpu::ShaderSource::Wgsl(include_str!("line.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        color_format,
        Some(Texture::DEPTH_FORMAT),
        &[LineVertex::desc()],
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            cull_mode: None,
            ..Default::default()
        },
        shader,
    )
}
