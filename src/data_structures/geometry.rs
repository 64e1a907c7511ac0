//! CPU-side geometry and the vertex layouts the pipelines consume.
//!
//! Builders follow the usual parametric conventions: spheres are generated
//! ring by ring from the north pole, planes lie in XY facing +Z, and every
//! triangle winds counter-clockwise when seen from its front side. Texture
//! coordinates use wgpu's convention (v grows downwards).

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex for LineVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Indexed triangle list.
#[derive(Clone, Debug, Default)]
pub struct Geometry {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Non-indexed line list: every two vertices form one segment.
#[derive(Clone, Debug, Default)]
pub struct LineGeometry {
    pub vertices: Vec<LineVertex>,
}

impl LineGeometry {
    pub fn segment_count(&self) -> usize {
        self.vertices.len() / 2
    }
}

pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let position = Vector3::new(
                -radius * (u * 2.0 * PI).cos() * (v * PI).sin(),
                radius * (v * PI).cos(),
                radius * (u * 2.0 * PI).sin() * (v * PI).sin(),
            );
            let normal = if position.magnitude2() > 0.0 {
                position.normalize()
            } else {
                Vector3::unit_y()
            };
            vertices.push(ModelVertex {
                position: position.into(),
                normal: normal.into(),
                tex_coords: [u, v],
            });
        }
    }

    let row = width_segments + 1;
    let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // the pole rows collapse into single triangles
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry { vertices, indices }
}

pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let grid_x = width_segments.max(1);
    let grid_y = height_segments.max(1);
    let segment_width = width / grid_x as f32;
    let segment_height = height / grid_y as f32;

    let mut vertices = Vec::with_capacity(((grid_x + 1) * (grid_y + 1)) as usize);
    for iy in 0..=grid_y {
        let y = iy as f32 * segment_height - height / 2.0;
        for ix in 0..=grid_x {
            let x = ix as f32 * segment_width - width / 2.0;
            vertices.push(ModelVertex {
                position: [x, -y, 0.0],
                normal: [0.0, 0.0, 1.0],
                tex_coords: [ix as f32 / grid_x as f32, iy as f32 / grid_y as f32],
            });
        }
    }

    let row = grid_x + 1;
    let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = ix + row * iy;
            let b = ix + row * (iy + 1);
            let c = (ix + 1) + row * (iy + 1);
            let d = (ix + 1) + row * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    Geometry { vertices, indices }
}

/// Axis-aligned box centred on the origin, one quad per face.
pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    let half = Vector3::new(width / 2.0, height / 2.0, depth / 2.0);
    // (normal, u axis, v axis) with u x v == normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u_axis, v_axis) in faces {
        let n = Vector3::from(normal);
        let u = Vector3::from(u_axis);
        let v = Vector3::from(v_axis);
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, 1.0), (-1.0, -1.0), (1.0, -1.0), (1.0, 1.0)] {
            let corner = n + u * su + v * sv;
            vertices.push(ModelVertex {
                position: [corner.x * half.x, corner.y * half.y, corner.z * half.z],
                normal,
                tex_coords: [(su + 1.0) / 2.0, (1.0 - sv) / 2.0],
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 3, base + 1, base + 2, base + 3]);
    }

    Geometry { vertices, indices }
}

/// Three segments from the origin: X red, Y green, Z blue.
pub fn axes(length: f32) -> LineGeometry {
    let axis = |dir: [f32; 3], color: [f32; 3]| {
        [
            LineVertex {
                position: [0.0; 3],
                color,
            },
            LineVertex {
                position: [dir[0] * length, dir[1] * length, dir[2] * length],
                color,
            },
        ]
    };
    let vertices = [
        axis([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
        axis([0.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
        axis([0.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    ]
    .concat();
    LineGeometry { vertices }
}
