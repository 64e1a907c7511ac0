//! Surface materials.
//!
//! A material starts without a texture and renders with its plain colour
//! until an asset load fills [`Material::map`]. Every fill bumps the slot's
//! version so the renderer knows to rebuild the GPU bind group.

use std::sync::Arc;

use cgmath::Vector3;

use crate::data_structures::texture::TextureData;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shading {
    /// Unlit: colour times map.
    Basic,
    /// Diffuse response to the scene's lights. `flat_shading` is kept on the
    /// material but has no visible effect under ambient-only lighting.
    Lambert { flat_shading: bool },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    #[default]
    Front,
    Double,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Wrapping {
    #[default]
    ClampToEdge,
    Repeat,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum TextureSlot {
    #[default]
    Unset,
    Loaded { data: Arc<TextureData>, version: u32 },
}

impl TextureSlot {
    /// `0` while unset, otherwise the number of times the slot was filled.
    pub fn version(&self) -> u32 {
        match self {
            TextureSlot::Unset => 0,
            TextureSlot::Loaded { version, .. } => *version,
        }
    }

    pub fn data(&self) -> Option<&Arc<TextureData>> {
        match self {
            TextureSlot::Unset => None,
            TextureSlot::Loaded { data, .. } => Some(data),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, TextureSlot::Loaded { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub shading: Shading,
    /// Linear-ish RGB in `0..=1`, see [`crate::config::rgb`].
    pub color: Vector3<f32>,
    pub side: Side,
    pub map: TextureSlot,
    pub wrapping: Wrapping,
    /// UV multiplier, only meaningful with [`Wrapping::Repeat`].
    pub repeat: [f32; 2],
    /// Whether the scene's fog applies to this material.
    pub fog: bool,
}

impl Material {
    pub fn basic(color: Vector3<f32>) -> Self {
        Self {
            shading: Shading::Basic,
            color,
            side: Side::Front,
            map: TextureSlot::Unset,
            wrapping: Wrapping::ClampToEdge,
            repeat: [1.0, 1.0],
            fog: true,
        }
    }

    pub fn lambert(color: Vector3<f32>) -> Self {
        Self {
            shading: Shading::Lambert {
                flat_shading: false,
            },
            ..Self::basic(color)
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_flat_shading(mut self, enabled: bool) -> Self {
        if let Shading::Lambert { flat_shading } = &mut self.shading {
            *flat_shading = enabled;
        }
        self
    }

    pub fn with_repeat(mut self, repeat: [f32; 2]) -> Self {
        self.wrapping = Wrapping::Repeat;
        self.repeat = repeat;
        self
    }

    pub fn with_map(mut self, data: Arc<TextureData>) -> Self {
        self.set_map(data);
        self
    }

    /// Replaces the texture and marks it for re-upload.
    pub fn set_map(&mut self, data: Arc<TextureData>) {
        let version = self.map.version() + 1;
        self.map = TextureSlot::Loaded { data, version };
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let (lambert, flat) = match self.shading {
            Shading::Basic => (0, 0),
            Shading::Lambert { flat_shading } => (1, flat_shading as u32),
        };
        MaterialUniform {
            color: [self.color.x, self.color.y, self.color.z, 1.0],
            repeat: self.repeat,
            lambert,
            flags: (self.map.is_loaded() as u32) * MaterialUniform::HAS_MAP
                | (self.fog as u32) * MaterialUniform::FOG
                | flat * MaterialUniform::FLAT_SHADING,
        }
    }
}

/// Layout must match `MaterialUniform` in `mesh.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub repeat: [f32; 2],
    pub lambert: u32,
    pub flags: u32,
}

impl MaterialUniform {
    pub const HAS_MAP: u32 = 1;
    pub const FOG: u32 = 1 << 1;
    pub const FLAT_SHADING: u32 = 1 << 2;
}
