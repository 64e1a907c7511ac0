//! Node transforms and their GPU representation.

use cgmath::{Matrix, One, SquareMatrix};

/// Position, rotation (as quaternion) and scale of a scene node.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    /// Identity transform (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_rotation(mut self, rotation: cgmath::Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> TransformRaw {
        let model = self.to_matrix();
        // inverse-transpose keeps normals perpendicular under non-uniform scale
        let normal = model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(cgmath::Matrix4::identity);
        TransformRaw {
            model: model.into(),
            normal: normal.into(),
        }
    }
}

/// `parent * child`: the child's transform expressed in the parent's space.
/// Exact as long as the parent's scale is uniform.
impl std::ops::Mul for &Transform {
    type Output = Transform;

    fn mul(self, child: &Transform) -> Transform {
        let scaled = cgmath::Vector3::new(
            child.position.x * self.scale.x,
            child.position.y * self.scale.y,
            child.position.z * self.scale.z,
        );
        Transform {
            position: self.position + self.rotation * scaled,
            rotation: self.rotation * child.rotation,
            scale: cgmath::Vector3::new(
                self.scale.x * child.scale.x,
                self.scale.y * child.scale.y,
                self.scale.z * child.scale.z,
            ),
        }
    }
}

impl From<cgmath::Vector3<f32>> for Transform {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The raw transform is what the vertex shader reads from the model uniform.
 * The normal matrix is stored as a full 4x4 to satisfy uniform alignment.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}
